//! Single-game state machine
//!
//! `Active -> Won | Lost`, no way back. The session knows nothing about the
//! ledger or other users; the registry owns both of those concerns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::board::{validate_mine_count, Board, Position, MAX_MINES, MIN_MINES};
use super::payout::PayoutModel;
use super::tile::TileKind;
use super::view::{BoardView, SessionView};
use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::UserId;

/// Limits a start request is checked against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    pub min_bet: u64,
    pub max_bet: u64,
    pub min_mines: u8,
    pub max_mines: u8,
    /// Safe reveals needed before a voluntary cash-out
    pub min_gems_to_cash_out: u8,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            min_bet: 1,
            max_bet: 1_000_000,
            min_mines: MIN_MINES,
            max_mines: MAX_MINES,
            min_gems_to_cash_out: 2,
        }
    }
}

impl From<&GameConfig> for GameRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            min_bet: config.min_bet,
            max_bet: config.max_bet,
            min_mines: config.min_mines,
            max_mines: config.max_mines,
            min_gems_to_cash_out: config.min_gems_to_cash_out,
        }
    }
}

impl GameRules {
    /// Check bet and mine count for a new game
    pub fn validate_start(&self, bet_amount: u64, mine_count: u8) -> Result<()> {
        if bet_amount < self.min_bet.max(1) {
            return Err(Error::InvalidConfiguration(format!(
                "amount must be at least {} Hiwa",
                self.min_bet.max(1)
            )));
        }
        if bet_amount > self.max_bet {
            return Err(Error::InvalidConfiguration(format!(
                "amount must be at most {} Hiwa",
                self.max_bet
            )));
        }
        if mine_count < self.min_mines || mine_count > self.max_mines {
            return Err(Error::InvalidConfiguration(format!(
                "number of mines must be between {} and {}",
                self.min_mines, self.max_mines
            )));
        }
        validate_mine_count(mine_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Won,
    Lost,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Active)
    }
}

/// What a single reveal turned up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealOutcome {
    /// Safe tile, game continues
    Gem,
    /// Bomb, game lost
    Bomb,
    /// Last safe tile; the game settled as won
    Cleared,
}

impl RevealOutcome {
    pub fn is_safe(&self) -> bool {
        !matches!(self, RevealOutcome::Bomb)
    }
}

/// One in-progress game owned by one user
#[derive(Debug, Clone)]
pub struct GameSession {
    user_id: UserId,
    bet_amount: u64,
    board: Board,
    gems_revealed: u8,
    multiplier: f64,
    state: SessionState,
    history: Vec<Position>,
    payout_model: PayoutModel,
    min_gems_to_cash_out: u8,
    started_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(
        user_id: UserId,
        bet_amount: u64,
        board: Board,
        payout_model: PayoutModel,
        rules: &GameRules,
    ) -> Result<Self> {
        if bet_amount == 0 {
            return Err(Error::InvalidConfiguration(
                "amount must be at least 1 Hiwa".to_string(),
            ));
        }

        let multiplier = payout_model.multiplier_after(board.mine_count(), 0);
        Ok(Self {
            user_id,
            bet_amount,
            board,
            gems_revealed: 0,
            multiplier,
            state: SessionState::Active,
            history: Vec::new(),
            payout_model,
            min_gems_to_cash_out: rules.min_gems_to_cash_out.max(1),
            started_at: Utc::now(),
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn bet_amount(&self) -> u64 {
        self.bet_amount
    }

    pub fn mine_count(&self) -> u8 {
        self.board.mine_count()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn gems_revealed(&self) -> u8 {
        self.gems_revealed
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Revealed positions in the order they were played
    pub fn history(&self) -> &[Position] {
        &self.history
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn min_gems_to_cash_out(&self) -> u8 {
        self.min_gems_to_cash_out
    }

    /// `floor(bet * multiplier)` at the current multiplier
    pub fn potential_payout(&self) -> u64 {
        PayoutModel::payout(self.bet_amount, self.multiplier)
    }

    pub fn can_cash_out(&self) -> bool {
        self.state == SessionState::Active && self.gems_revealed >= self.min_gems_to_cash_out
    }

    pub fn is_board_cleared(&self) -> bool {
        self.gems_revealed >= self.board.safe_tiles()
    }

    /// Reveal the tile at `position`
    ///
    /// Rejected moves leave the session untouched.
    pub fn reveal(&mut self, position: Position) -> Result<RevealOutcome> {
        if self.state != SessionState::Active {
            return Err(Error::InvalidMove("this game is already over".to_string()));
        }

        match self.board.reveal(position)? {
            TileKind::Bomb => {
                self.history.push(position);
                self.state = SessionState::Lost;
                Ok(RevealOutcome::Bomb)
            }
            TileKind::Gem => {
                self.history.push(position);
                self.gems_revealed += 1;
                self.multiplier = self
                    .payout_model
                    .multiplier_after(self.mine_count(), self.gems_revealed);

                if self.is_board_cleared() {
                    self.state = SessionState::Won;
                    return Ok(RevealOutcome::Cleared);
                }
                Ok(RevealOutcome::Gem)
            }
        }
    }

    /// Settle the game as won and return the payout
    pub fn cash_out(&mut self) -> Result<u64> {
        if self.state != SessionState::Active {
            return Err(Error::NoActiveGame);
        }
        if self.gems_revealed < self.min_gems_to_cash_out {
            return Err(Error::CashOutTooEarly {
                found: self.gems_revealed,
                required: self.min_gems_to_cash_out,
            });
        }

        self.state = SessionState::Won;
        Ok(self.potential_payout())
    }

    /// Snapshot for rendering an in-progress board
    pub fn view(&self) -> SessionView {
        SessionView {
            user_id: self.user_id,
            board: BoardView::from(&self.board),
            bet_amount: self.bet_amount,
            mine_count: self.mine_count(),
            gems_revealed: self.gems_revealed,
            multiplier: self.multiplier,
            potential_payout: self.potential_payout(),
            can_cash_out: self.can_cash_out(),
        }
    }

    /// The board with every tile face up
    pub fn final_board(&self) -> BoardView {
        let mut board = self.board.clone();
        board.reveal_all();
        BoardView::from(&board)
    }
}

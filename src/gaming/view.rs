//! Read-only snapshots handed to the chat layer

use serde::{Deserialize, Serialize};

use super::board::{Board, BOARD_SIZE};
use super::session::{GameSession, SessionState};
use super::tile::TileKind;
use crate::UserId;

/// A tile as the player sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileView {
    Hidden,
    Gem,
    Bomb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub rows: [[TileView; BOARD_SIZE]; BOARD_SIZE],
}

impl From<&Board> for BoardView {
    fn from(board: &Board) -> Self {
        let mut rows = [[TileView::Hidden; BOARD_SIZE]; BOARD_SIZE];
        for (position, tile) in board.iter() {
            if tile.is_revealed() {
                rows[position.row as usize][position.col as usize] = match tile.kind() {
                    TileKind::Gem => TileView::Gem,
                    TileKind::Bomb => TileView::Bomb,
                };
            }
        }
        Self { rows }
    }
}

impl BoardView {
    pub fn revealed_count(&self) -> usize {
        self.tiles().filter(|t| **t != TileView::Hidden).count()
    }

    pub fn bomb_count(&self) -> usize {
        self.tiles().filter(|t| **t == TileView::Bomb).count()
    }

    fn tiles(&self) -> impl Iterator<Item = &TileView> {
        self.rows.iter().flatten()
    }
}

/// State of an active game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub user_id: UserId,
    pub board: BoardView,
    pub bet_amount: u64,
    pub mine_count: u8,
    pub gems_revealed: u8,
    pub multiplier: f64,
    pub potential_payout: u64,
    pub can_cash_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
}

/// Final state of a finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalResult {
    pub user_id: UserId,
    pub outcome: Outcome,
    /// Fully revealed board
    pub board: BoardView,
    pub bet_amount: u64,
    pub mine_count: u8,
    pub gems_revealed: u8,
    pub multiplier: f64,
    /// Payout credited on a win, bet forfeited on a loss
    pub amount: u64,
    /// Balance after settlement, if the ledger could report it
    pub new_balance: Option<u64>,
}

impl TerminalResult {
    /// Build from a session in a terminal state
    pub(crate) fn from_session(session: &GameSession, new_balance: Option<u64>) -> Self {
        let (outcome, amount) = match session.state() {
            SessionState::Won => (Outcome::Won, session.potential_payout()),
            _ => (Outcome::Lost, session.bet_amount()),
        };

        Self {
            user_id: session.user_id(),
            outcome,
            board: session.final_board(),
            bet_amount: session.bet_amount(),
            mine_count: session.mine_count(),
            gems_revealed: session.gems_revealed(),
            multiplier: session.multiplier(),
            amount,
            new_balance,
        }
    }
}

/// Result of a reveal: the game either goes on or it is over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveResult {
    Continue(SessionView),
    Finished(TerminalResult),
}

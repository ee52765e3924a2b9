//! Engine facade used by the chat layer

use std::sync::Arc;

use tracing::instrument;

use super::board::BoardGenerator;
use super::payout::PayoutModel;
use super::registry::{RegistryStats, SessionOp, SessionRegistry};
use super::session::GameRules;
use super::view::{MoveResult, SessionView, TerminalResult};
use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::token::LedgerGateway;
use crate::UserId;

/// Start, reveal and cash out Mines games against a ledger
#[derive(Clone)]
pub struct MinesEngine {
    registry: Arc<SessionRegistry>,
}

impl MinesEngine {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        generator: BoardGenerator,
        payout_model: PayoutModel,
        rules: GameRules,
    ) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(ledger, generator, payout_model, rules)),
        }
    }

    /// Build from the `[game]` config section
    pub fn from_config(config: &GameConfig, ledger: Arc<dyn LedgerGateway>) -> Result<Self> {
        let payout_model = PayoutModel::new(config.house_edge)?;
        Ok(Self::new(
            ledger,
            BoardGenerator::new(config.rng_seed),
            payout_model,
            GameRules::from(config),
        ))
    }

    #[instrument(skip(self))]
    pub async fn start_game(&self, user_id: UserId, bet_amount: u64, mine_count: u8) -> Result<SessionView> {
        self.registry.start(user_id, bet_amount, mine_count).await
    }

    /// Reveal a tile; a bomb or the last gem ends the game
    #[instrument(skip(self))]
    pub async fn reveal_tile(&self, user_id: UserId, row: usize, col: usize) -> Result<MoveResult> {
        self.registry
            .apply(user_id, SessionOp::Reveal { row, col })
            .await
    }

    #[instrument(skip(self))]
    pub async fn cash_out(&self, user_id: UserId) -> Result<TerminalResult> {
        match self.registry.apply(user_id, SessionOp::CashOut).await? {
            MoveResult::Finished(result) => Ok(result),
            MoveResult::Continue(_) => Err(Error::InvalidMove(
                "cash-out left the game running".to_string(),
            )),
        }
    }

    pub async fn current_game(&self, user_id: UserId) -> Result<SessionView> {
        self.registry.get(user_id).await
    }

    pub async fn balance(&self, user_id: UserId) -> Result<u64> {
        self.registry.ledger().get_balance(user_id).await
    }

    pub fn has_active_game(&self, user_id: UserId) -> bool {
        self.registry.has_active(user_id)
    }

    /// Drop all in-flight games without settling them
    pub async fn clear_sessions(&self) -> usize {
        self.registry.clear().await
    }

    pub fn rules(&self) -> &GameRules {
        self.registry.rules()
    }

    pub fn payout_model(&self) -> &PayoutModel {
        self.registry.payout_model()
    }

    pub fn active_games(&self) -> usize {
        self.registry.active_count()
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}

//! Hiwa Mines - a tile-reveal wagering engine
//!
//! The crate is split the way the bot is operated:
//! - gaming: board generation, payout math, the session state machine and
//!   the per-user session registry
//! - token: the Hiwa ledger gateway and the reference account store
//! - ui: chat command parsing, dispatch and board rendering
//! - config / logging / error: the ambient stack shared by all of the above

pub mod config;
pub mod error;
pub mod gaming;
pub mod logging;
pub mod token;
pub mod ui;

/// Chat-platform user identifier
pub type UserId = i64;

// Re-export commonly used types for easy access
pub use config::Config;
pub use error::{Error, Result};
pub use gaming::{
    BoardGenerator, GameRules, GameSession, MinesEngine, PayoutModel, SessionRegistry,
    SessionState, SessionView, TerminalResult,
};
pub use token::{LedgerGateway, MemoryLedger};
pub use ui::{ChatCommand, ChatService};

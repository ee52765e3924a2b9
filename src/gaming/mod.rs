//! Mines gaming core
//!
//! Leaf-first:
//! - `tile` / `board`: the 5×5 grid and its random generator
//! - `payout`: multiplier math with the house edge
//! - `session`: the single-game `Active -> Won | Lost` state machine
//! - `registry`: one session per user, serialized per user, settled against
//!   the ledger
//! - `engine`: the facade the chat layer talks to

pub mod board;
pub mod engine;
pub mod payout;
pub mod registry;
pub mod session;
pub mod tile;
pub mod view;

pub use board::{Board, BoardGenerator, Position, BOARD_SIZE, MAX_MINES, MIN_MINES, TILE_COUNT};
pub use engine::MinesEngine;
pub use payout::{PayoutModel, DEFAULT_HOUSE_EDGE};
pub use registry::{RegistryStats, SessionOp, SessionRegistry};
pub use session::{GameRules, GameSession, RevealOutcome, SessionState};
pub use tile::{Tile, TileKind};
pub use view::{BoardView, MoveResult, Outcome, SessionView, TerminalResult, TileView};

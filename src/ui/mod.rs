//! Chat surface for the Mines bot
//!
//! - `chat`: command parsing and dispatch to the engine and the ledger
//! - `render`: boards, headers and summaries as plain text

pub mod chat;
pub mod render;

pub use chat::{ChatCommand, ChatService, ChatUser, Outgoing};

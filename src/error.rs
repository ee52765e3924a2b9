//! Error types and handling for the Mines engine

use std::time::Duration;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for logging and reply routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Game rule violations (bad move, no game, too early)
    Gaming,
    /// User input validation errors
    Validation,
    /// Ledger and persistence errors
    Storage,
    /// Configuration and setup errors
    Configuration,
    /// Internal system errors
    Internal,
}

/// Engine error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("You already have an active game! Finish it first.")]
    AlreadyActive,

    #[error("Insufficient balance: {required} Hiwa required, {available} Hiwa available")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("No active game! Use /mine to start")]
    NoActiveGame,

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("You need at least {required} gems to cash out ({found} found)")]
    CashOutTooEarly { found: u8, required: u8 },

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Bonus already claimed, next available in {}", format_remaining(.remaining))]
    BonusCooldown { remaining: Duration },

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Category used for log levels and reply routing
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadyActive
            | Self::NoActiveGame
            | Self::InvalidMove(_)
            | Self::CashOutTooEarly { .. }
            | Self::BonusCooldown { .. } => ErrorCategory::Gaming,
            Self::InvalidConfiguration(_)
            | Self::InsufficientBalance { .. }
            | Self::UserNotFound(_)
            | Self::InvalidTransfer(_)
            | Self::PermissionDenied(_)
            | Self::InvalidCommand(_) => ErrorCategory::Validation,
            Self::LedgerUnavailable(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorCategory::Storage
            }
            Self::Config(_) => ErrorCategory::Configuration,
            Self::ArithmeticOverflow(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the message can be shown to the user verbatim
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Gaming | ErrorCategory::Validation
        )
    }
}

fn format_remaining(remaining: &Duration) -> String {
    let total = remaining.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", err))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(format!("Failed to serialize config: {}", err))
    }
}

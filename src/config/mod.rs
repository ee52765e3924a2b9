//! Configuration management for the Mines engine
//!
//! This module provides centralized configuration with:
//! - Environment-based loading (development, testing, production)
//! - Environment variable overrides
//! - Runtime validation

use crate::error::{Error, Result};
use crate::gaming::{MAX_MINES, MIN_MINES};
use crate::UserId;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Users allowed to run admin commands
    #[serde(default)]
    pub admins: Vec<UserId>,
    pub app: AppConfig,
    pub logging: LoggingConfig,
    pub game: GameConfig,
    pub ledger: LedgerConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Full,
}

/// Game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub min_bet: u64,
    pub max_bet: u64,
    pub min_mines: u8,
    pub max_mines: u8,
    pub min_gems_to_cash_out: u8,
    /// House edge; the multiplier is scaled by `1 - house_edge`
    pub house_edge: f64,
    /// Fixed seed for reproducible boards, entropy when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Ledger store and bonus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Snapshot file relative to `app.data_dir`; in-memory only when unset
    #[serde(default)]
    pub store_file: Option<PathBuf>,
    pub welcome_grant: u64,
    pub daily_bonus: u64,
    #[serde(with = "humantime_serde")]
    pub daily_cooldown: Duration,
    pub weekly_bonus: u64,
    #[serde(with = "humantime_serde")]
    pub weekly_cooldown: Duration,
    pub leaderboard_size: usize,
}

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let environment = Self::environment_from_env();

        let config_path = Self::get_config_path(&environment);
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default_for_environment(environment)
        };

        config.override_from_env()?;
        config.validate()?;

        Ok(config)
    }

    fn environment_from_env() -> Environment {
        let env = env::var("MINES_ENV").unwrap_or_else(|_| "development".to_string());
        match env.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "testing" | "test" => Environment::Testing,
            _ => Environment::Development,
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Get configuration file path based on environment
    fn get_config_path(environment: &Environment) -> PathBuf {
        let base_path = env::var("MINES_CONFIG_PATH").unwrap_or_else(|_| "config".to_string());

        let filename = match environment {
            Environment::Production => "production.toml",
            Environment::Testing => "testing.toml",
            Environment::Development => "development.toml",
        };

        PathBuf::from(base_path).join(filename)
    }

    /// Override configuration with environment variables
    fn override_from_env(&mut self) -> Result<()> {
        if let Ok(val) = env::var("MINES_DATA_DIR") {
            self.app.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = env::var("MINES_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = env::var("MINES_HOUSE_EDGE") {
            self.game.house_edge = val
                .parse()
                .map_err(|_| Error::Config("Invalid house edge".to_string()))?;
        }

        if let Ok(val) = env::var("MINES_RNG_SEED") {
            self.game.rng_seed = Some(
                val.parse()
                    .map_err(|_| Error::Config("Invalid RNG seed".to_string()))?,
            );
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.game.min_bet < 1 {
            return Err(Error::Config("Min bet must be >= 1".to_string()));
        }

        if self.game.min_bet > self.game.max_bet {
            return Err(Error::Config("Min bet cannot exceed max bet".to_string()));
        }

        if self.game.min_mines < MIN_MINES || self.game.max_mines > MAX_MINES {
            return Err(Error::Config(format!(
                "Mine range must stay within {}..={}",
                MIN_MINES, MAX_MINES
            )));
        }

        if self.game.min_mines > self.game.max_mines {
            return Err(Error::Config("Min mines cannot exceed max mines".to_string()));
        }

        if self.game.min_gems_to_cash_out == 0 {
            return Err(Error::Config("Cash-out minimum must be >= 1 gem".to_string()));
        }

        if !(0.0..0.1).contains(&self.game.house_edge) {
            return Err(Error::Config(
                "House edge must be between 0 and 10%".to_string(),
            ));
        }

        if self.ledger.daily_cooldown.is_zero() || self.ledger.weekly_cooldown.is_zero() {
            return Err(Error::Config("Bonus cooldowns must be > 0".to_string()));
        }

        if self.ledger.leaderboard_size == 0 {
            return Err(Error::Config("Leaderboard size must be > 0".to_string()));
        }

        Ok(())
    }

    /// Resolved path of the ledger snapshot, if persistence is enabled
    pub fn ledger_path(&self) -> Option<PathBuf> {
        self.ledger
            .store_file
            .as_ref()
            .map(|file| self.app.data_dir.join(file))
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;

        fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Generate default configuration for an environment
    pub fn default_for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production_defaults(),
            Environment::Testing => Self::testing_defaults(),
            Environment::Development => Self::development_defaults(),
        }
    }

    fn production_defaults() -> Self {
        Config {
            admins: Vec::new(),
            app: AppConfig {
                name: "Hiwa Mines".to_string(),
                environment: Environment::Production,
                data_dir: PathBuf::from("/var/lib/hiwa-mines"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Full,
            },
            game: GameConfig {
                min_bet: 1,
                max_bet: 1_000_000,
                min_mines: MIN_MINES,
                max_mines: MAX_MINES,
                min_gems_to_cash_out: 2,
                house_edge: 0.03,
                rng_seed: None,
            },
            ledger: LedgerConfig {
                store_file: Some(PathBuf::from("users.json")),
                welcome_grant: 100,
                daily_bonus: 50,
                daily_cooldown: Duration::from_secs(24 * 60 * 60),
                weekly_bonus: 200,
                weekly_cooldown: Duration::from_secs(7 * 24 * 60 * 60),
                leaderboard_size: 10,
            },
        }
    }

    fn development_defaults() -> Self {
        let mut config = Self::production_defaults();
        config.app.environment = Environment::Development;
        config.app.data_dir = PathBuf::from("./data");
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    fn testing_defaults() -> Self {
        let mut config = Self::development_defaults();
        config.app.environment = Environment::Testing;
        config.app.data_dir = PathBuf::from("./test_data");
        config.logging.format = LogFormat::Compact;
        config.game.rng_seed = Some(0x5EED);
        config.ledger.store_file = None;
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::development_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = Config::development_defaults();
        assert!(config.validate().is_ok());

        config.game.min_bet = 1000;
        config.game.max_bet = 100;
        assert!(config.validate().is_err());

        config = Config::development_defaults();
        config.game.min_mines = 2;
        assert!(config.validate().is_err());

        config = Config::development_defaults();
        config.game.min_mines = 10;
        config.game.max_mines = 5;
        assert!(config.validate().is_err());

        config = Config::development_defaults();
        config.game.house_edge = 0.2;
        assert!(config.validate().is_err());

        config = Config::development_defaults();
        config.ledger.daily_cooldown = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_defaults() {
        let dev = Config::development_defaults();
        assert_eq!(dev.app.environment, Environment::Development);
        assert_eq!(dev.logging.level, "debug");

        let prod = Config::production_defaults();
        assert_eq!(prod.app.environment, Environment::Production);
        assert_eq!(prod.ledger.welcome_grant, 100);
        assert_eq!(
            prod.ledger_path(),
            Some(PathBuf::from("/var/lib/hiwa-mines/users.json"))
        );

        let test = Config::testing_defaults();
        assert!(test.ledger_path().is_none());
        assert!(test.game.rng_seed.is_some());
    }

    #[test]
    fn test_toml_round_trip_with_durations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("development.toml");

        let mut config = Config::development_defaults();
        config.admins = vec![42];
        config.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("daily_cooldown = \"1day\""));

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.is_admin(42));
        assert!(!loaded.is_admin(7));
    }
}

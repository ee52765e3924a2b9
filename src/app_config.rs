//! Command-line interface definition and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface for the Hiwa Mines bot
#[derive(Parser)]
#[command(name = "hiwa-mines")]
#[command(about = "Mines tile-reveal game with a Hiwa ledger", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML config file; defaults to config/<environment>.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override `app.data_dir`
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Play over stdin: one `<user_id> [@username] /command` per line
    Console,

    /// Print the multiplier table for a mine count
    Odds {
        #[arg(long, default_value = "5")]
        mines: u8,
    },

    /// Show a user's balance
    Balance {
        #[arg(long)]
        user: i64,
    },

    /// Show the top balances
    Leaderboard {
        #[arg(long)]
        limit: Option<usize>,
    },
}

impl Commands {
    /// Whether the command needs the account store
    pub fn needs_ledger(&self) -> bool {
        !matches!(self, Commands::Odds { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Commands::Console => "console",
            Commands::Odds { .. } => "odds",
            Commands::Balance { .. } => "balance",
            Commands::Leaderboard { .. } => "leaderboard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["hiwa-mines", "odds", "--mines", "24"]).unwrap();
        assert!(matches!(cli.command, Commands::Odds { mines: 24 }));
        assert!(!cli.command.needs_ledger());

        let cli = Cli::try_parse_from(["hiwa-mines", "-v", "balance", "--user", "42"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.command.name(), "balance");

        assert!(Cli::try_parse_from(["hiwa-mines", "balance"]).is_err());
    }
}

use tracing::info;

use hiwa_mines::{logging, ChatService, Config, Result};

mod app_config;
mod commands;

use app_config::{Cli, Commands};
use commands as cmd;

#[tokio::main]
async fn main() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load_from_file(path)?;
            config.validate()?;
            config
        }
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.app.data_dir = dir;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    logging::init(&config.logging)?;
    info!(
        environment = ?config.app.environment,
        command = cli.command.name(),
        "Starting {}",
        config.app.name
    );

    if !cli.command.needs_ledger() {
        if let Commands::Odds { mines } = cli.command {
            cmd::odds_command(&config, mines)?;
        }
        return Ok(());
    }

    let leaderboard_size = config.ledger.leaderboard_size;
    let service = ChatService::from_config(config)?;

    match cli.command {
        Commands::Console => cmd::console_command(&service).await?,
        Commands::Balance { user } => cmd::balance_command(&service, user).await?,
        Commands::Leaderboard { limit } => {
            cmd::leaderboard_command(&service, limit.unwrap_or(leaderboard_size)).await?
        }
        Commands::Odds { .. } => {}
    }

    Ok(())
}

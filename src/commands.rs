//! Command implementations for the hiwa-mines binary

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use hiwa_mines::gaming::{PayoutModel, MAX_MINES, MIN_MINES};
use hiwa_mines::ui::{render, ChatService, ChatUser, Outgoing};
use hiwa_mines::{Config, Error, LedgerGateway, Result, UserId};

/// Split `<user_id> [@username] <command...>`
pub fn parse_console_line(line: &str) -> Option<(ChatUser, &str)> {
    let line = line.trim();
    let (id, rest) = line.split_once(char::is_whitespace)?;
    let id: UserId = id.parse().ok()?;
    let rest = rest.trim_start();

    let (username, text) = match rest.strip_prefix('@') {
        Some(named) => {
            let (name, text) = named.split_once(char::is_whitespace)?;
            (Some(name.to_string()), text.trim_start())
        }
        None => (None, rest),
    };

    let first_name = username.clone().unwrap_or_else(|| format!("User{}", id));
    Some((ChatUser::new(id, username, first_name), text))
}

fn format_delivery(message: &Outgoing) -> String {
    format!("[to {}]\n{}\n\n", message.chat_id, message.text)
}

/// Read commands from stdin and print every reply
///
/// A reply that cannot be written is logged and skipped.
pub async fn console_command(service: &ChatService) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!("Console ready, one `<user_id> [@username] /command` per line");

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let replies = match parse_console_line(trimmed) {
            Some((user, text)) => service.handle(&user, text).await,
            None => {
                warn!(line = trimmed, "Unparseable console line");
                vec![Outgoing::new(0, "Expected `<user_id> [@username] /command`")]
            }
        };

        for reply in &replies {
            if let Err(e) = stdout.write_all(format_delivery(reply).as_bytes()).await {
                warn!(chat_id = reply.chat_id, error = %e, "Failed to deliver reply");
            }
        }
        if let Err(e) = stdout.flush().await {
            warn!(error = %e, "Failed to flush console output");
        }
    }

    service.ledger().flush().await?;
    let stats = service.engine().stats();
    info!(
        games = stats.games_started,
        won = stats.games_won,
        lost = stats.games_lost,
        unsettled = service.engine().active_games(),
        "Console closed"
    );
    Ok(())
}

/// Print the multiplier for every reachable gem count
pub fn odds_command(config: &Config, mines: u8) -> Result<()> {
    if !(MIN_MINES..=MAX_MINES).contains(&mines) {
        return Err(Error::InvalidConfiguration(format!(
            "number of mines must be between {} and {}",
            MIN_MINES, MAX_MINES
        )));
    }
    let model = PayoutModel::new(config.game.house_edge)?;
    let table = model.table(mines)?;
    println!("{}", render::odds_table(mines, &table));
    Ok(())
}

pub async fn balance_command(service: &ChatService, user_id: UserId) -> Result<()> {
    let ledger = service.ledger();
    if !ledger.exists(user_id).await {
        return Err(Error::UserNotFound(user_id.to_string()));
    }
    let balance = ledger.get_balance(user_id).await?;
    println!("💰 User {}: {} Hiwa", user_id, balance);
    Ok(())
}

pub async fn leaderboard_command(service: &ChatService, limit: usize) -> Result<()> {
    let entries = service.ledger().leaderboard(limit).await;
    println!("{}", render::leaderboard(&entries));
    Ok(())
}

//! Chat commands and their dispatch
//!
//! The transport hands each incoming text line to `ChatService::handle` and
//! delivers whatever `Outgoing` messages come back. Most commands produce a
//! single reply to the sender; gifts also notify the recipient and broadcasts
//! fan out to every account.

use std::sync::Arc;

use tracing::{info, instrument};

use super::render;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::gaming::{MinesEngine, MoveResult};
use crate::logging::log_error;
use crate::token::{LedgerGateway, MemoryLedger};
use crate::UserId;

const MINE_USAGE: &str = "Usage: /mine <amount> <mines>\nExample: /mine 10 5";
const REVEAL_USAGE: &str = "Usage: /reveal <row> <col> (rows and columns 0-4)";
const GIFT_USAGE: &str = "Usage: /gift @username <amount>";
const SET_BALANCE_USAGE: &str = "Usage: /setbalance @username <amount>";
const BROADCAST_USAGE: &str = "Usage: /broadcast <message>";

const HELP_TEXT: &str = "\
🎮 Mines Game Bot Help 🎮

Basic Commands:
/start - Initialize your account
/help - Show this help message
/balance - Check your Hiwa balance
/mine <amount> <mines> - Start a new game (e.g. /mine 10 5)
/reveal <row> <col> - Reveal a tile (0-4)
/cashout - Cash out your current winnings
/daily - Claim daily bonus (24h cooldown)
/weekly - Claim weekly bonus (7d cooldown)
/leaderboard - Show top players
/gift @username <amount> - Send Hiwa to another player

Game Rules:
1. 5x5 grid with hidden gems (💎) and bombs (💣)
2. Choose how many bombs (3-24) when starting
3. Reveal tiles to find gems
4. Cash out after finding at least 2 gems
5. Hit a bomb and you lose your bet

Admin Commands:
/broadcast <message> - Send message to all users
/resetdata - Reset all user data
/setbalance @user <amount> - Set user balance";

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Help,
    Balance,
    Mine { amount: u64, mines: u8 },
    Reveal { row: usize, col: usize },
    CashOut,
    Daily,
    Weekly,
    Leaderboard,
    Gift { recipient: String, amount: u64 },
    SetBalance { username: String, amount: u64 },
    ResetData,
    Broadcast { message: String },
}

impl ChatCommand {
    /// Parse a `/command arg...` line
    ///
    /// A `@botname` suffix on the command is ignored. Malformed arguments fail
    /// with `InvalidCommand` carrying the usage text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split_whitespace();
        let head = parts
            .next()
            .ok_or_else(|| Error::InvalidCommand("Empty message. Try /help".to_string()))?;
        let name = head
            .strip_prefix('/')
            .ok_or_else(|| Error::InvalidCommand("Commands start with '/'. Try /help".to_string()))?;
        let name = name.split('@').next().unwrap_or(name).to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let command = match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "balance" => Self::Balance,
            "mine" => {
                let [amount, mines] = two_args(&args, MINE_USAGE)?;
                let invalid =
                    || Error::InvalidCommand("Please enter valid numbers for amount and mines.".to_string());
                let amount: i64 = amount.parse().map_err(|_| invalid())?;
                let mines: i64 = mines.parse().map_err(|_| invalid())?;
                if amount < 1 {
                    return Err(Error::InvalidCommand("Amount must be at least 1 Hiwa.".to_string()));
                }
                Self::Mine {
                    amount: amount as u64,
                    // Out-of-range counts are rejected by the game rules
                    mines: u8::try_from(mines).unwrap_or(u8::MAX),
                }
            }
            "reveal" => {
                let [row, col] = two_args(&args, REVEAL_USAGE)?;
                let usage = || Error::InvalidCommand(REVEAL_USAGE.to_string());
                Self::Reveal {
                    row: row.parse().map_err(|_| usage())?,
                    col: col.parse().map_err(|_| usage())?,
                }
            }
            "cashout" => Self::CashOut,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "leaderboard" => Self::Leaderboard,
            "gift" => {
                let [recipient, amount] = two_args(&args, GIFT_USAGE)?;
                let amount: i64 = amount
                    .parse()
                    .map_err(|_| Error::InvalidCommand(GIFT_USAGE.to_string()))?;
                if amount < 1 {
                    return Err(Error::InvalidCommand("Amount must be at least 1 Hiwa.".to_string()));
                }
                Self::Gift {
                    recipient: recipient.trim_start_matches('@').to_string(),
                    amount: amount as u64,
                }
            }
            "setbalance" => {
                let [username, amount] = two_args(&args, SET_BALANCE_USAGE)?;
                let amount: i64 = amount
                    .parse()
                    .map_err(|_| Error::InvalidCommand(SET_BALANCE_USAGE.to_string()))?;
                if amount < 0 {
                    return Err(Error::InvalidCommand("Balance cannot be negative.".to_string()));
                }
                Self::SetBalance {
                    username: username.trim_start_matches('@').to_string(),
                    amount: amount as u64,
                }
            }
            "resetdata" => Self::ResetData,
            "broadcast" => {
                if args.is_empty() {
                    return Err(Error::InvalidCommand(BROADCAST_USAGE.to_string()));
                }
                Self::Broadcast {
                    message: args.join(" "),
                }
            }
            other => {
                return Err(Error::InvalidCommand(format!(
                    "Unknown command /{}. Try /help",
                    other
                )))
            }
        };
        Ok(command)
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::SetBalance { .. } | Self::ResetData | Self::Broadcast { .. }
        )
    }

    fn needs_account(&self) -> bool {
        !matches!(self, Self::Start | Self::Help)
    }
}

fn two_args<'a>(args: &[&'a str], usage: &str) -> Result<[&'a str; 2]> {
    match args {
        [first, second, ..] => Ok([*first, *second]),
        _ => Err(Error::InvalidCommand(usage.to_string())),
    }
}

/// Who sent a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
}

impl ChatUser {
    pub fn new(id: UserId, username: Option<String>, first_name: impl Into<String>) -> Self {
        Self {
            id,
            username,
            first_name: first_name.into(),
        }
    }

    fn handle(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| self.first_name.clone())
    }
}

/// A message for the transport to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub chat_id: UserId,
    pub text: String,
}

impl Outgoing {
    pub fn new(chat_id: UserId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
        }
    }
}

/// Dispatches chat commands to the engine and the ledger
#[derive(Clone)]
pub struct ChatService {
    engine: MinesEngine,
    ledger: Arc<MemoryLedger>,
    config: Arc<Config>,
}

impl ChatService {
    pub fn new(engine: MinesEngine, ledger: Arc<MemoryLedger>, config: Arc<Config>) -> Self {
        Self {
            engine,
            ledger,
            config,
        }
    }

    /// Build the ledger and engine described by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let ledger = Arc::new(MemoryLedger::from_config(&config.ledger, config.ledger_path())?);
        let engine = MinesEngine::from_config(&config.game, ledger.clone())?;
        Ok(Self::new(engine, ledger, Arc::new(config)))
    }

    pub fn engine(&self) -> &MinesEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &Arc<MemoryLedger> {
        &self.ledger
    }

    /// Handle one incoming line; errors become reply text
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn handle(&self, user: &ChatUser, text: &str) -> Vec<Outgoing> {
        let result = match ChatCommand::parse(text) {
            Ok(command) => self.dispatch(user, command).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(messages) => messages,
            Err(e) => {
                log_error(text, &e);
                vec![Outgoing::new(user.id, render::error(&e))]
            }
        }
    }

    /// Run a parsed command
    pub async fn dispatch(&self, user: &ChatUser, command: ChatCommand) -> Result<Vec<Outgoing>> {
        if command.is_admin_only() && !self.config.is_admin(user.id) {
            return Err(Error::PermissionDenied(
                "This command is for admins only.".to_string(),
            ));
        }
        if command.needs_account() && !self.ledger.exists(user.id).await {
            return Err(Error::InvalidCommand(
                "Use /start to create your account first.".to_string(),
            ));
        }

        let reply = |text: String| -> Result<Vec<Outgoing>> { Ok(vec![Outgoing::new(user.id, text)]) };

        match command {
            ChatCommand::Start => reply(self.start(user).await?),
            ChatCommand::Help => reply(HELP_TEXT.to_string()),
            ChatCommand::Balance => {
                let balance = self.ledger.get_balance(user.id).await?;
                reply(format!("Your current balance: {} Hiwa", balance))
            }
            ChatCommand::Mine { amount, mines } => {
                let view = self.engine.start_game(user.id, amount, mines).await?;
                reply(render::session(&view))
            }
            ChatCommand::Reveal { row, col } => match self.engine.reveal_tile(user.id, row, col).await? {
                MoveResult::Continue(view) => reply(render::session(&view)),
                MoveResult::Finished(result) => reply(render::terminal(&result)),
            },
            ChatCommand::CashOut => {
                let result = self.engine.cash_out(user.id).await?;
                reply(render::terminal(&result))
            }
            ChatCommand::Daily => {
                let claim = self.ledger.claim_daily(user.id).await?;
                reply(format!(
                    "🎁 Daily Bonus Collected!\n\n+{} Hiwa added to your balance\nNew balance: {} Hiwa\n\nNext bonus available in 24 hours",
                    claim.amount, claim.new_balance
                ))
            }
            ChatCommand::Weekly => {
                let claim = self.ledger.claim_weekly(user.id).await?;
                reply(format!(
                    "🎁 Weekly Bonus Collected!\n\n+{} Hiwa added to your balance\nNew balance: {} Hiwa\n\nNext bonus available in 7 days",
                    claim.amount, claim.new_balance
                ))
            }
            ChatCommand::Leaderboard => {
                let entries = self
                    .ledger
                    .leaderboard(self.config.ledger.leaderboard_size)
                    .await;
                reply(render::leaderboard(&entries))
            }
            ChatCommand::Gift { recipient, amount } => {
                let receipt = self.ledger.gift(user.id, &recipient, amount).await?;
                Ok(vec![
                    Outgoing::new(
                        user.id,
                        format!(
                            "🎁 You gifted {} Hiwa to @{}!\nYour new balance: {} Hiwa",
                            amount, receipt.recipient_name, receipt.sender_balance
                        ),
                    ),
                    Outgoing::new(
                        receipt.recipient_id,
                        format!(
                            "🎁 You received {} Hiwa from @{}!\nNew balance: {} Hiwa",
                            amount,
                            user.handle(),
                            receipt.recipient_balance
                        ),
                    ),
                ])
            }
            ChatCommand::SetBalance { username, amount } => {
                let target = self
                    .ledger
                    .find_by_username(&username)
                    .await
                    .ok_or_else(|| Error::UserNotFound(format!("@{}", username)))?;
                self.ledger.set_balance(target, amount).await?;
                reply(format!("Set @{}'s balance to {} Hiwa.", username, amount))
            }
            ChatCommand::ResetData => {
                self.ledger.reset().await?;
                let cleared = self.engine.clear_sessions().await;
                info!(admin = user.id, cleared, "All user data reset");
                reply("All user data has been reset.".to_string())
            }
            ChatCommand::Broadcast { message } => {
                let users = self.ledger.all_users().await;
                let text = format!("📢 Admin Broadcast:\n\n{}", message);
                let mut out: Vec<Outgoing> = users
                    .iter()
                    .map(|id| Outgoing::new(*id, text.clone()))
                    .collect();
                out.push(Outgoing::new(
                    user.id,
                    format!("Broadcast queued for {} users.", users.len()),
                ));
                Ok(out)
            }
        }
    }

    async fn start(&self, user: &ChatUser) -> Result<String> {
        let (account, created) = self
            .ledger
            .register(user.id, Some(user.handle()))
            .await?;
        if created {
            Ok(format!(
                "Welcome to Mines Game, {}!\nYou've been given {} Hiwa to start playing.\nUse /help to learn how to play.",
                user.first_name, account.balance
            ))
        } else {
            Ok(format!(
                "Welcome back, {}!\nYour current balance: {} Hiwa\nUse /help to see available commands.",
                user.first_name, account.balance
            ))
        }
    }
}

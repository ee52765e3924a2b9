//! Hiwa ledger
//!
//! This module implements the balance side of the bot:
//! - `LedgerGateway`, the contract the game engine debits and credits through
//! - `MemoryLedger`, the reference account store with welcome grants,
//!   daily/weekly bonuses, gifts, the leaderboard and admin balance edits
//! - optional JSON persistence via `persistent_ledger`

pub mod persistent_ledger;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::UserId;
pub use persistent_ledger::LedgerSnapshot;

/// Atomic balance operations the game engine relies on
///
/// Every method is atomic with respect to the others for the same user.
/// Store outages surface as `Error::LedgerUnavailable`.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn get_balance(&self, user_id: UserId) -> Result<u64>;

    async fn has_sufficient_balance(&self, user_id: UserId, amount: u64) -> Result<bool> {
        Ok(self.get_balance(user_id).await? >= amount)
    }

    /// Remove `amount`, failing with `InsufficientBalance` rather than going negative.
    /// Returns the new balance.
    async fn debit(&self, user_id: UserId, amount: u64) -> Result<u64>;

    /// Add `amount` and return the new balance
    async fn credit(&self, user_id: UserId, amount: u64) -> Result<u64>;
}

/// Account information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub username: Option<String>,
    pub balance: u64,
    pub last_daily: Option<DateTime<Utc>>,
    pub last_weekly: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: UserId, username: Option<String>, balance: u64) -> Self {
        Self {
            user_id,
            username,
            balance,
            last_daily: None,
            last_weekly: None,
            created_at: Utc::now(),
        }
    }

    fn matches_username(&self, wanted: &str) -> bool {
        self.username
            .as_deref()
            .map(|name| name.eq_ignore_ascii_case(wanted))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusKind {
    Daily,
    Weekly,
}

/// Amount and cooldown for a bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusPolicy {
    pub amount: u64,
    pub cooldown: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusClaim {
    pub amount: u64,
    pub new_balance: u64,
    pub next_available: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftReceipt {
    pub recipient_id: UserId,
    pub recipient_name: String,
    pub amount: u64,
    pub sender_balance: u64,
    pub recipient_balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub username: Option<String>,
    pub balance: u64,
}

/// Ledger tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub welcome_grant: u64,
    pub daily: BonusPolicy,
    pub weekly: BonusPolicy,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            welcome_grant: 100,
            daily: BonusPolicy {
                amount: 50,
                cooldown: Duration::from_secs(24 * 60 * 60),
            },
            weekly: BonusPolicy {
                amount: 200,
                cooldown: Duration::from_secs(7 * 24 * 60 * 60),
            },
        }
    }
}

impl From<&LedgerConfig> for LedgerPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            welcome_grant: config.welcome_grant,
            daily: BonusPolicy {
                amount: config.daily_bonus,
                cooldown: config.daily_cooldown,
            },
            weekly: BonusPolicy {
                amount: config.weekly_bonus,
                cooldown: config.weekly_cooldown,
            },
        }
    }
}

type Accounts = HashMap<UserId, Account>;

/// In-process account store, optionally backed by a JSON snapshot
///
/// With a snapshot path every mutation is staged on a copy of the table,
/// written to disk, and only then committed, so a failed write changes nothing.
pub struct MemoryLedger {
    accounts: RwLock<Accounts>,
    policy: LedgerPolicy,
    store_path: Option<PathBuf>,
}

impl MemoryLedger {
    /// Volatile ledger with the given policy
    pub fn new(policy: LedgerPolicy) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            policy,
            store_path: None,
        }
    }

    /// Ledger persisted at `path`, loading any existing snapshot
    pub fn open(path: impl AsRef<Path>, policy: LedgerPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let accounts = match LedgerSnapshot::load(&path)? {
            Some(snapshot) => {
                info!(
                    "Loaded {} accounts from {}",
                    snapshot.accounts.len(),
                    path.display()
                );
                snapshot
                    .accounts
                    .into_iter()
                    .map(|a| (a.user_id, a))
                    .collect()
            }
            None => HashMap::new(),
        };

        Ok(Self {
            accounts: RwLock::new(accounts),
            policy,
            store_path: Some(path),
        })
    }

    /// Build from the `[ledger]` config section
    pub fn from_config(config: &LedgerConfig, path: Option<PathBuf>) -> Result<Self> {
        let policy = LedgerPolicy::from(config);
        match path {
            Some(path) => Self::open(path, policy),
            None => Ok(Self::new(policy)),
        }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    /// Apply `f` to the account table and persist the result before committing
    async fn mutate<T>(&self, f: impl FnOnce(&mut Accounts) -> Result<T>) -> Result<T> {
        let mut accounts = self.accounts.write().await;
        let Some(path) = &self.store_path else {
            return f(&mut *accounts);
        };

        let mut staged = (*accounts).clone();
        let out = f(&mut staged)?;
        LedgerSnapshot::new(staged.values())
            .save(path)
            .map_err(|e| {
                warn!("Failed to persist ledger to {}: {}", path.display(), e);
                Error::LedgerUnavailable(e.to_string())
            })?;
        *accounts = staged;
        Ok(out)
    }

    /// Create an account with the welcome grant
    ///
    /// Returns the account and whether it was newly created. An existing
    /// account only gets its username refreshed. A username belongs to the
    /// latest account registering it; any other holder loses it.
    pub async fn register(&self, user_id: UserId, username: Option<String>) -> Result<(Account, bool)> {
        let grant = self.policy.welcome_grant;
        let (account, created, displaced) = self
            .mutate(|accounts| {
                let mut displaced = Vec::new();
                if let Some(name) = username.as_deref() {
                    for other in accounts
                        .values_mut()
                        .filter(|a| a.user_id != user_id && a.matches_username(name))
                    {
                        other.username = None;
                        displaced.push(other.user_id);
                    }
                }

                if let Some(account) = accounts.get_mut(&user_id) {
                    if username.is_some() && account.username != username {
                        account.username = username;
                    }
                    return Ok((account.clone(), false, displaced));
                }
                let account = Account::new(user_id, username, grant);
                accounts.insert(user_id, account.clone());
                Ok((account, true, displaced))
            })
            .await?;

        for previous in displaced {
            warn!(
                user_id,
                previous,
                username = account.username.as_deref().unwrap_or_default(),
                "Username taken over from another account"
            );
        }
        if created {
            info!(user_id, grant, "Created account");
        }
        Ok((account, created))
    }

    pub async fn account(&self, user_id: UserId) -> Option<Account> {
        self.accounts.read().await.get(&user_id).cloned()
    }

    pub async fn exists(&self, user_id: UserId) -> bool {
        self.accounts.read().await.contains_key(&user_id)
    }

    /// Look up a user by name, ignoring case and a leading `@`
    pub async fn find_by_username(&self, username: &str) -> Option<UserId> {
        let wanted = username.trim_start_matches('@');
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.matches_username(wanted))
            .map(|a| a.user_id)
    }

    pub async fn claim_daily(&self, user_id: UserId) -> Result<BonusClaim> {
        self.claim_bonus_at(user_id, BonusKind::Daily, Utc::now()).await
    }

    pub async fn claim_weekly(&self, user_id: UserId) -> Result<BonusClaim> {
        self.claim_bonus_at(user_id, BonusKind::Weekly, Utc::now()).await
    }

    /// Claim a bonus as of `now`, failing with `BonusCooldown` inside the window
    pub async fn claim_bonus_at(
        &self,
        user_id: UserId,
        kind: BonusKind,
        now: DateTime<Utc>,
    ) -> Result<BonusClaim> {
        let policy = match kind {
            BonusKind::Daily => self.policy.daily,
            BonusKind::Weekly => self.policy.weekly,
        };
        let cooldown = chrono::Duration::from_std(policy.cooldown)
            .map_err(|e| Error::Config(format!("Bonus cooldown out of range: {}", e)))?;

        let claim = self
            .mutate(|accounts| {
                let account = accounts
                    .get_mut(&user_id)
                    .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

                let last = match kind {
                    BonusKind::Daily => &mut account.last_daily,
                    BonusKind::Weekly => &mut account.last_weekly,
                };
                if let Some(previous) = *last {
                    let next_available = previous + cooldown;
                    if now < next_available {
                        let remaining = (next_available - now).to_std().unwrap_or_default();
                        return Err(Error::BonusCooldown { remaining });
                    }
                }
                *last = Some(now);

                account.balance = account
                    .balance
                    .checked_add(policy.amount)
                    .ok_or_else(|| Error::ArithmeticOverflow("bonus credit".to_string()))?;

                Ok(BonusClaim {
                    amount: policy.amount,
                    new_balance: account.balance,
                    next_available: now + cooldown,
                })
            })
            .await?;

        info!(user_id, amount = claim.amount, ?kind, "Bonus claimed");
        Ok(claim)
    }

    /// Move `amount` from `sender` to the user named `recipient_name`
    pub async fn gift(&self, sender: UserId, recipient_name: &str, amount: u64) -> Result<GiftReceipt> {
        if amount < 1 {
            return Err(Error::InvalidTransfer(
                "amount must be at least 1 Hiwa".to_string(),
            ));
        }
        let wanted = recipient_name.trim_start_matches('@').to_string();

        let receipt = self
            .mutate(|accounts| {
                let recipient_id = accounts
                    .values()
                    .find(|a| a.matches_username(&wanted))
                    .map(|a| a.user_id)
                    .ok_or_else(|| Error::UserNotFound(format!("@{}", wanted)))?;

                if recipient_id == sender {
                    return Err(Error::InvalidTransfer("you can't gift yourself".to_string()));
                }

                let sender_account = accounts
                    .get_mut(&sender)
                    .ok_or_else(|| Error::UserNotFound(sender.to_string()))?;
                if sender_account.balance < amount {
                    return Err(Error::InsufficientBalance {
                        required: amount,
                        available: sender_account.balance,
                    });
                }
                sender_account.balance -= amount;
                let sender_balance = sender_account.balance;

                let recipient = accounts
                    .get_mut(&recipient_id)
                    .ok_or_else(|| Error::UserNotFound(recipient_id.to_string()))?;
                recipient.balance = recipient
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| Error::ArithmeticOverflow("gift credit".to_string()))?;

                Ok(GiftReceipt {
                    recipient_id,
                    recipient_name: recipient.username.clone().unwrap_or(wanted),
                    amount,
                    sender_balance,
                    recipient_balance: recipient.balance,
                })
            })
            .await?;

        info!(
            sender,
            recipient = receipt.recipient_id,
            amount,
            "Gift transferred"
        );
        Ok(receipt)
    }

    /// Top `limit` accounts by balance, ties broken by user id
    pub async fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let accounts = self.accounts.read().await;
        let mut ranked: Vec<&Account> = accounts.values().collect();
        ranked.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.user_id.cmp(&b.user_id)));

        ranked
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, a)| LeaderboardEntry {
                rank: i + 1,
                user_id: a.user_id,
                username: a.username.clone(),
                balance: a.balance,
            })
            .collect()
    }

    /// Overwrite a balance (admin)
    pub async fn set_balance(&self, user_id: UserId, amount: u64) -> Result<()> {
        self.mutate(|accounts| {
            let account = accounts
                .get_mut(&user_id)
                .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
            account.balance = amount;
            Ok(())
        })
        .await?;
        info!(user_id, amount, "Balance set by admin");
        Ok(())
    }

    /// Drop every account (admin)
    pub async fn reset(&self) -> Result<()> {
        self.mutate(|accounts| {
            accounts.clear();
            Ok(())
        })
        .await?;
        warn!("Ledger reset, all accounts removed");
        Ok(())
    }

    /// Write the current table to the snapshot file, if there is one
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = &self.store_path else {
            return Ok(());
        };
        let accounts = self.accounts.read().await;
        LedgerSnapshot::new(accounts.values()).save(path)?;
        debug!("Flushed {} accounts to {}", accounts.len(), path.display());
        Ok(())
    }

    pub async fn all_users(&self) -> Vec<UserId> {
        self.accounts.read().await.keys().copied().collect()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn get_balance(&self, user_id: UserId) -> Result<u64> {
        Ok(self
            .accounts
            .read()
            .await
            .get(&user_id)
            .map(|a| a.balance)
            .unwrap_or(0))
    }

    async fn debit(&self, user_id: UserId, amount: u64) -> Result<u64> {
        let balance = self
            .mutate(|accounts| {
                let account = accounts.get_mut(&user_id).ok_or(Error::InsufficientBalance {
                    required: amount,
                    available: 0,
                })?;
                if account.balance < amount {
                    return Err(Error::InsufficientBalance {
                        required: amount,
                        available: account.balance,
                    });
                }
                account.balance -= amount;
                Ok(account.balance)
            })
            .await?;

        debug!(user_id, amount, balance, "Debited");
        Ok(balance)
    }

    async fn credit(&self, user_id: UserId, amount: u64) -> Result<u64> {
        let balance = self
            .mutate(|accounts| {
                let account = accounts
                    .entry(user_id)
                    .or_insert_with(|| Account::new(user_id, None, 0));
                account.balance = account
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| Error::ArithmeticOverflow("credit".to_string()))?;
                Ok(account.balance)
            })
            .await?;

        debug!(user_id, amount, balance, "Credited");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ledger_with(users: &[(UserId, &str)]) -> MemoryLedger {
        let ledger = MemoryLedger::new(LedgerPolicy::default());
        for (id, name) in users {
            ledger.register(*id, Some(name.to_string())).await.unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_register_grants_once() {
        let ledger = ledger_with(&[]).await;
        let (account, created) = ledger.register(1, Some("alice".into())).await.unwrap();
        assert!(created);
        assert_eq!(account.balance, 100);

        ledger.debit(1, 30).await.unwrap();
        let (account, created) = ledger.register(1, Some("alice2".into())).await.unwrap();
        assert!(!created);
        assert_eq!(account.balance, 70);
        assert_eq!(account.username.as_deref(), Some("alice2"));
    }

    #[tokio::test]
    async fn test_username_moves_to_latest_holder() {
        let ledger = ledger_with(&[(1, "alice"), (2, "bob")]).await;
        ledger.register(3, Some("Alice".into())).await.unwrap();

        assert_eq!(ledger.find_by_username("alice").await, Some(3));
        assert_eq!(ledger.account(1).await.unwrap().username, None);
        assert_eq!(ledger.account(1).await.unwrap().balance, 100);

        let receipt = ledger.gift(2, "@alice", 10).await.unwrap();
        assert_eq!(receipt.recipient_id, 3);

        // Re-registering the same account keeps its own name
        ledger.register(3, Some("Alice".into())).await.unwrap();
        assert_eq!(ledger.find_by_username("alice").await, Some(3));
    }

    #[tokio::test]
    async fn test_debit_never_goes_negative() {
        let ledger = ledger_with(&[(1, "alice")]).await;
        assert!(ledger.has_sufficient_balance(1, 100).await.unwrap());
        assert!(!ledger.has_sufficient_balance(1, 101).await.unwrap());

        assert!(matches!(
            ledger.debit(1, 101).await,
            Err(Error::InsufficientBalance { required: 101, available: 100 })
        ));
        assert_eq!(ledger.get_balance(1).await.unwrap(), 100);
        assert_eq!(ledger.debit(1, 100).await.unwrap(), 0);

        // Unknown users have nothing to spend
        assert!(matches!(
            ledger.debit(99, 1).await,
            Err(Error::InsufficientBalance { available: 0, .. })
        ));
        assert_eq!(ledger.get_balance(99).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_credit_creates_missing_account() {
        let ledger = ledger_with(&[]).await;
        assert_eq!(ledger.credit(5, 40).await.unwrap(), 40);
        assert!(ledger.exists(5).await);
    }

    #[tokio::test]
    async fn test_daily_bonus_cooldown() {
        let ledger = ledger_with(&[(1, "alice")]).await;
        let start = Utc::now();

        let claim = ledger.claim_bonus_at(1, BonusKind::Daily, start).await.unwrap();
        assert_eq!(claim.amount, 50);
        assert_eq!(claim.new_balance, 150);

        let later = start + chrono::Duration::hours(23);
        match ledger.claim_bonus_at(1, BonusKind::Daily, later).await {
            Err(Error::BonusCooldown { remaining }) => {
                assert_eq!(remaining, Duration::from_secs(3600));
            }
            other => panic!("expected cooldown, got {:?}", other),
        }

        // Weekly is tracked separately
        let weekly = ledger.claim_bonus_at(1, BonusKind::Weekly, later).await.unwrap();
        assert_eq!(weekly.new_balance, 350);

        let next_day = start + chrono::Duration::hours(24);
        assert!(ledger.claim_bonus_at(1, BonusKind::Daily, next_day).await.is_ok());
        assert!(ledger.claim_bonus_at(2, BonusKind::Daily, next_day).await.is_err());
    }

    #[tokio::test]
    async fn test_gift_rules() {
        let ledger = ledger_with(&[(1, "alice"), (2, "Bob")]).await;

        let receipt = ledger.gift(1, "@bob", 30).await.unwrap();
        assert_eq!(receipt.recipient_id, 2);
        assert_eq!(receipt.recipient_name, "Bob");
        assert_eq!(receipt.sender_balance, 70);
        assert_eq!(receipt.recipient_balance, 130);

        assert!(matches!(ledger.gift(1, "alice", 5).await, Err(Error::InvalidTransfer(_))));
        assert!(matches!(ledger.gift(1, "carol", 5).await, Err(Error::UserNotFound(_))));
        assert!(matches!(ledger.gift(1, "bob", 0).await, Err(Error::InvalidTransfer(_))));
        assert!(matches!(
            ledger.gift(1, "bob", 71).await,
            Err(Error::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.get_balance(1).await.unwrap(), 70);
        assert_eq!(ledger.get_balance(2).await.unwrap(), 130);
    }

    #[tokio::test]
    async fn test_leaderboard_order() {
        let ledger = ledger_with(&[(3, "c"), (1, "a"), (2, "b")]).await;
        ledger.credit(2, 50).await.unwrap();
        ledger.set_balance(3, 150).await.unwrap();

        let board = ledger.leaderboard(10).await;
        let ids: Vec<UserId> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(ledger.leaderboard(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_admin_operations() {
        let ledger = ledger_with(&[(1, "alice")]).await;
        assert_eq!(ledger.find_by_username("@ALICE").await, Some(1));
        assert!(ledger.set_balance(9, 10).await.is_err());

        ledger.reset().await.unwrap();
        assert_eq!(ledger.account_count().await, 0);
        assert!(ledger.all_users().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistent_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        {
            let ledger = MemoryLedger::open(&path, LedgerPolicy::default()).unwrap();
            ledger.register(1, Some("alice".into())).await.unwrap();
            ledger.debit(1, 25).await.unwrap();
        }

        let reopened = MemoryLedger::open(&path, LedgerPolicy::default()).unwrap();
        assert_eq!(reopened.get_balance(1).await.unwrap(), 75);
        assert_eq!(reopened.find_by_username("alice").await, Some(1));
    }

    #[tokio::test]
    async fn test_failed_write_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should be makes every save fail
        let path = dir.path().join("users.json");
        std::fs::create_dir_all(path.with_extension("json.tmp")).unwrap();

        let ledger = MemoryLedger::open(&path, LedgerPolicy::default()).unwrap();
        assert!(matches!(
            ledger.register(1, Some("alice".into())).await,
            Err(Error::LedgerUnavailable(_))
        ));
        assert!(!ledger.exists(1).await);
    }
}

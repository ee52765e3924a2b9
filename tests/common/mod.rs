//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hiwa_mines::gaming::{Board, BoardGenerator, GameRules, PayoutModel, Position};
use hiwa_mines::token::{LedgerPolicy, MemoryLedger};
use hiwa_mines::{Error, LedgerGateway, MinesEngine, Result, UserId};

pub const SEED: u64 = 0x5EED;
pub const STARTING_BALANCE: u64 = 100;

/// Ledger wrapper that can fail or stall on demand and counts calls
pub struct FlakyLedger {
    pub inner: MemoryLedger,
    fail_debit: AtomicBool,
    fail_credit: AtomicBool,
    fail_reads: AtomicBool,
    delay_ms: AtomicU64,
    pub debit_calls: AtomicU64,
    pub credit_calls: AtomicU64,
    pub credits_applied: AtomicU64,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self {
            inner: MemoryLedger::new(LedgerPolicy::default()),
            fail_debit: AtomicBool::new(false),
            fail_credit: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            debit_calls: AtomicU64::new(0),
            credit_calls: AtomicU64::new(0),
            credits_applied: AtomicU64::new(0),
        }
    }

    pub fn fail_debits(&self, fail: bool) {
        self.fail_debit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_credits(&self, fail: bool) {
        self.fail_credit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Stall every mutation, widening race windows
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn stall(&self) {
        let ms = self.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl LedgerGateway for FlakyLedger {
    async fn get_balance(&self, user_id: UserId) -> Result<u64> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::LedgerUnavailable("read refused".to_string()));
        }
        self.inner.get_balance(user_id).await
    }

    async fn debit(&self, user_id: UserId, amount: u64) -> Result<u64> {
        self.debit_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        if self.fail_debit.load(Ordering::SeqCst) {
            return Err(Error::LedgerUnavailable("debit refused".to_string()));
        }
        self.inner.debit(user_id, amount).await
    }

    async fn credit(&self, user_id: UserId, amount: u64) -> Result<u64> {
        self.credit_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        if self.fail_credit.load(Ordering::SeqCst) {
            return Err(Error::LedgerUnavailable("credit refused".to_string()));
        }
        let balance = self.inner.credit(user_id, amount).await?;
        self.credits_applied.fetch_add(1, Ordering::SeqCst);
        Ok(balance)
    }
}

/// Engine over a flaky ledger with `users` already funded
pub async fn flaky_engine(seed: u64, users: &[UserId]) -> (MinesEngine, Arc<FlakyLedger>) {
    let ledger = Arc::new(FlakyLedger::new());
    for &user in users {
        ledger
            .inner
            .register(user, Some(format!("player{}", user)))
            .await
            .unwrap();
    }
    let engine = MinesEngine::new(
        ledger.clone(),
        BoardGenerator::seeded(seed),
        PayoutModel::default(),
        GameRules::default(),
    );
    (engine, ledger)
}

/// Engine over a plain in-memory ledger with `users` already funded
pub async fn seeded_engine(seed: u64, users: &[UserId]) -> (MinesEngine, Arc<MemoryLedger>) {
    let ledger = Arc::new(MemoryLedger::new(LedgerPolicy::default()));
    for &user in users {
        ledger
            .register(user, Some(format!("player{}", user)))
            .await
            .unwrap();
    }
    let engine = MinesEngine::new(
        ledger.clone(),
        BoardGenerator::seeded(seed),
        PayoutModel::default(),
        GameRules::default(),
    );
    (engine, ledger)
}

/// The board a fresh engine seeded with `seed` deals first
pub fn first_board(seed: u64, mines: u8) -> Board {
    BoardGenerator::seeded(seed).generate(mines).unwrap()
}

pub fn gem_positions(board: &Board) -> Vec<Position> {
    board
        .iter()
        .filter(|(_, tile)| !tile.is_bomb())
        .map(|(position, _)| position)
        .collect()
}

pub fn bomb_positions(board: &Board) -> Vec<Position> {
    board
        .iter()
        .filter(|(_, tile)| tile.is_bomb())
        .map(|(position, _)| position)
        .collect()
}

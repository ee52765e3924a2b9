//! Per-user session table
//!
//! Each user gets a slot holding at most one `GameSession`. The slot is a
//! `tokio::sync::Mutex`, which hands out the lock in FIFO order, so one user's
//! requests are applied in arrival order while other users never wait on it.
//! Ledger calls are made while the slot is held; that is what makes
//! debit-then-register and credit-then-remove atomic per user.
//!
//! A slot is only ever removed from the table by a holder of its lock, and a
//! start re-checks after locking that its slot is still the one in the table.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::board::{BoardGenerator, Position};
use super::payout::PayoutModel;
use super::session::{GameRules, GameSession, RevealOutcome, SessionState};
use super::view::{MoveResult, SessionView, TerminalResult};
use crate::error::{Error, Result};
use crate::token::LedgerGateway;
use crate::UserId;

#[derive(Default)]
struct SlotCell {
    session: Mutex<Option<GameSession>>,
    /// Mirrors `session.is_some()`; written only while `session` is locked
    occupied: AtomicBool,
}

type Slot = Arc<SlotCell>;

/// A request against a user's active session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOp {
    Reveal { row: usize, col: usize },
    CashOut,
}

/// Counters since the registry was built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub games_started: u64,
    pub games_won: u64,
    pub games_lost: u64,
    pub total_wagered: u64,
    pub total_paid_out: u64,
    /// Win credits that failed; the win stays registered for a retry
    pub failed_settlements: u64,
}

#[derive(Default)]
struct Counters {
    games_started: AtomicU64,
    games_won: AtomicU64,
    games_lost: AtomicU64,
    total_wagered: AtomicU64,
    total_paid_out: AtomicU64,
    failed_settlements: AtomicU64,
}

/// At most one session per user, mutated one request at a time
pub struct SessionRegistry {
    slots: DashMap<UserId, Slot>,
    ledger: Arc<dyn LedgerGateway>,
    generator: BoardGenerator,
    payout_model: PayoutModel,
    rules: GameRules,
    counters: Counters,
}

impl SessionRegistry {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        generator: BoardGenerator,
        payout_model: PayoutModel,
        rules: GameRules,
    ) -> Self {
        Self {
            slots: DashMap::new(),
            ledger,
            generator,
            payout_model,
            rules,
            counters: Counters::default(),
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn payout_model(&self) -> &PayoutModel {
        &self.payout_model
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerGateway> {
        &self.ledger
    }

    /// Debit the bet and register a fresh session
    ///
    /// Fails with `AlreadyActive` when the user already has a session and
    /// with `InsufficientBalance` when the debit is refused. In both cases
    /// nothing is registered and nothing is debited.
    pub async fn start(&self, user_id: UserId, bet_amount: u64, mine_count: u8) -> Result<SessionView> {
        self.rules.validate_start(bet_amount, mine_count)?;

        loop {
            let slot = self.slot(user_id);
            let result = {
                let mut guard = slot.session.lock().await;
                if self.is_current(user_id, &slot) {
                    let result = self
                        .start_locked(user_id, bet_amount, mine_count, &mut guard)
                        .await;
                    slot.occupied.store(guard.is_some(), Ordering::Release);
                    Some(result)
                } else {
                    None
                }
            };
            match result {
                Some(result) => {
                    self.release(user_id, slot);
                    return result;
                }
                None => debug!(user_id, "Slot cleared while waiting, retrying start"),
            }
        }
    }

    async fn start_locked(
        &self,
        user_id: UserId,
        bet_amount: u64,
        mine_count: u8,
        slot: &mut Option<GameSession>,
    ) -> Result<SessionView> {
        if slot.is_some() {
            return Err(Error::AlreadyActive);
        }

        let board = self.generator.generate(mine_count)?;
        let session = GameSession::new(user_id, bet_amount, board, self.payout_model, &self.rules)?;

        let balance = self.ledger.debit(user_id, bet_amount).await?;
        let view = session.view();
        *slot = Some(session);

        self.counters.games_started.fetch_add(1, Ordering::Relaxed);
        self.counters
            .total_wagered
            .fetch_add(bet_amount, Ordering::Relaxed);
        info!(user_id, bet_amount, mine_count, balance, "Game started");
        Ok(view)
    }

    /// Current view of the user's session
    pub async fn get(&self, user_id: UserId) -> Result<SessionView> {
        let slot = self.existing(user_id).ok_or(Error::NoActiveGame)?;
        let view = slot.session.lock().await.as_ref().map(GameSession::view);
        self.release(user_id, slot);
        view.ok_or(Error::NoActiveGame)
    }

    pub fn has_active(&self, user_id: UserId) -> bool {
        self.slots
            .get(&user_id)
            .map(|slot| slot.occupied.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Apply `op` to the user's session, settling it if it ends
    pub async fn apply(&self, user_id: UserId, op: SessionOp) -> Result<MoveResult> {
        let slot = self.existing(user_id).ok_or(Error::NoActiveGame)?;
        let result = {
            let mut guard = slot.session.lock().await;
            let result = self.apply_locked(user_id, op, &mut guard).await;
            slot.occupied.store(guard.is_some(), Ordering::Release);
            result
        };
        self.release(user_id, slot);
        result
    }

    async fn apply_locked(
        &self,
        user_id: UserId,
        op: SessionOp,
        slot: &mut Option<GameSession>,
    ) -> Result<MoveResult> {
        let session = slot.as_mut().ok_or(Error::NoActiveGame)?;

        match op {
            SessionOp::Reveal { row, col } => {
                let position = Position::new(row, col)?;
                let outcome = session.reveal(position)?;
                debug!(
                    user_id,
                    row,
                    col,
                    gems = session.gems_revealed(),
                    multiplier = session.multiplier(),
                    ?outcome,
                    "Tile revealed"
                );
                match outcome {
                    RevealOutcome::Gem => Ok(MoveResult::Continue(session.view())),
                    RevealOutcome::Bomb | RevealOutcome::Cleared => self.end(user_id, slot).await,
                }
            }
            SessionOp::CashOut => {
                // A Won session here is a win whose credit failed earlier
                if session.state() == SessionState::Active {
                    session.cash_out()?;
                }
                self.end(user_id, slot).await
            }
        }
    }

    /// Settle a terminal session and remove it
    ///
    /// A win is credited before removal. If the credit fails the session stays
    /// registered as `Won`, so the next cash-out retries the same credit and
    /// the payout lands exactly once.
    async fn end(&self, user_id: UserId, slot: &mut Option<GameSession>) -> Result<MoveResult> {
        let session = slot.as_ref().ok_or(Error::NoActiveGame)?;

        let result = match session.state() {
            SessionState::Active => {
                return Err(Error::InvalidMove("this game is still in progress".to_string()));
            }
            SessionState::Lost => {
                let new_balance = match self.ledger.get_balance(user_id).await {
                    Ok(balance) => Some(balance),
                    Err(e) => {
                        warn!(user_id, error = %e, "Could not read balance after loss");
                        None
                    }
                };
                self.counters.games_lost.fetch_add(1, Ordering::Relaxed);
                info!(
                    user_id,
                    bet_amount = session.bet_amount(),
                    gems = session.gems_revealed(),
                    "Game lost"
                );
                TerminalResult::from_session(session, new_balance)
            }
            SessionState::Won => {
                let payout = session.potential_payout();
                let new_balance = match self.ledger.credit(user_id, payout).await {
                    Ok(balance) => balance,
                    Err(e) => {
                        warn!(user_id, payout, error = %e, "Credit failed, win kept for retry");
                        self.counters
                            .failed_settlements
                            .fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                };
                self.counters.games_won.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .total_paid_out
                    .fetch_add(payout, Ordering::Relaxed);
                info!(
                    user_id,
                    payout,
                    multiplier = session.multiplier(),
                    new_balance,
                    "Game won"
                );
                TerminalResult::from_session(session, Some(new_balance))
            }
        };

        *slot = None;
        Ok(MoveResult::Finished(result))
    }

    /// Drop every session without settling; returns how many were dropped
    ///
    /// Each slot is locked before it is emptied, so a request already holding
    /// a slot finishes first and its session is counted and dropped here.
    pub async fn clear(&self) -> usize {
        let slots: Vec<(UserId, Slot)> = self
            .slots
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut dropped = 0;
        for (user_id, slot) in slots {
            let mut guard = slot.session.lock().await;
            if guard.take().is_some() {
                dropped += 1;
            }
            slot.occupied.store(false, Ordering::Release);
            self.slots
                .remove_if(&user_id, |_, current| Arc::ptr_eq(current, &slot));
        }

        if dropped > 0 {
            warn!(dropped, "Cleared active sessions");
        }
        dropped
    }

    /// Sessions currently registered, including wins awaiting their credit
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.occupied.load(Ordering::Acquire))
            .count()
    }

    pub fn stats(&self) -> RegistryStats {
        let c = &self.counters;
        RegistryStats {
            games_started: c.games_started.load(Ordering::Relaxed),
            games_won: c.games_won.load(Ordering::Relaxed),
            games_lost: c.games_lost.load(Ordering::Relaxed),
            total_wagered: c.total_wagered.load(Ordering::Relaxed),
            total_paid_out: c.total_paid_out.load(Ordering::Relaxed),
            failed_settlements: c.failed_settlements.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, user_id: UserId) -> Slot {
        self.slots.entry(user_id).or_default().clone()
    }

    fn is_current(&self, user_id: UserId, slot: &Slot) -> bool {
        self.slots
            .get(&user_id)
            .map_or(false, |current| Arc::ptr_eq(current.value(), slot))
    }

    fn existing(&self, user_id: UserId) -> Option<Slot> {
        self.slots.get(&user_id).map(|slot| Arc::clone(slot.value()))
    }

    /// Give back our handle and drop the slot if it is empty and unused
    fn release(&self, user_id: UserId, slot: Slot) {
        drop(slot);
        self.slots.remove_if(&user_id, |_, slot| {
            Arc::strong_count(slot) == 1 && !slot.occupied.load(Ordering::Acquire)
        });
    }
}

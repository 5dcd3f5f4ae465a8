use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerResult;
use super::snapshot;
use super::transaction::{Transaction, TransactionKind};
use super::user::User;

/// Source of `now()` timestamps. The store never reads the system clock
/// directly, so tests can pin time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Full store state: account records plus the chronological transaction
/// log. This is exactly what gets serialized on every flush.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LedgerState {
    #[serde(default)]
    pub users: BTreeMap<String, User>,

    /// Reserved for the presentation layer's inventory feature; carried
    /// through untouched so its snapshots survive a round-trip here.
    #[serde(default)]
    pub products: Vec<serde_json::Value>,

    /// Append order is chronological order.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Totals over the live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub user_count: usize,
    pub total_balance: Decimal,
    pub transaction_count: usize,
}

/// The authoritative account store.
///
/// One mutex guards the whole state and the flush that follows every
/// mutation, reads included, so concurrent handlers always observe a
/// consistent snapshot and two read-modify-writes can never interleave.
/// Coarse on purpose: write volume is per-user-action, not
/// per-millisecond.
///
/// Every mutating operation is atomic from the caller's side: either the
/// in-memory change and the durable flush both happen, or the change is
/// rolled back and the I/O error returned.
pub struct Ledger {
    state: Mutex<LedgerState>,
    path: PathBuf,
    clock: Box<dyn Clock>,
}

impl Ledger {
    /// Opens the ledger backed by the snapshot at `path`. A missing file
    /// means a fresh deployment: the ledger starts empty and immediately
    /// writes an initial snapshot. A file that exists but does not decode
    /// is a fatal `CorruptData` error.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        Self::open_with_clock(path, Box::new(SystemClock))
    }

    pub fn open_with_clock(path: impl AsRef<Path>, clock: Box<dyn Clock>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = snapshot::load_or_init(&path)?;
        Ok(Self {
            state: Mutex::new(state),
            path,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // A writer that panicked still rolled back or never flushed, so
        // the state behind a poisoned lock is usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the current state durably. Runs under the lock as the last
    /// step of every mutating operation.
    fn flush(&self, state: &LedgerState) -> LedgerResult<()> {
        let bytes = snapshot::encode(state)?;
        snapshot::write_atomic(&self.path, &bytes)
    }

    /// Registers a new user with a zero balance and both timestamps set
    /// to now. Idempotent: a second call with the same id returns
    /// `Ok(false)` and leaves the existing record (balance, `joined_at`)
    /// untouched.
    pub fn register_user(
        &self,
        id: &str,
        username: Option<&str>,
        display_name: &str,
    ) -> LedgerResult<bool> {
        let mut state = self.lock();
        if state.users.contains_key(id) {
            return Ok(false);
        }

        let user = User::new(id, username, display_name, self.clock.now());
        state.users.insert(id.to_owned(), user);
        if let Err(e) = self.flush(&state) {
            state.users.remove(id);
            return Err(e);
        }

        debug!("registered user {id}");
        Ok(true)
    }

    /// Adds `delta` (possibly negative, no floor) to the user's balance
    /// and refreshes `last_seen`. Returns `Ok(false)` without touching
    /// any state when the id is unknown.
    pub fn adjust_balance(&self, id: &str, delta: Decimal) -> LedgerResult<bool> {
        let mut state = self.lock();
        let (prev_balance, prev_last_seen) = match state.users.get_mut(id) {
            Some(user) => {
                let prev = (user.balance, user.last_seen);
                user.balance += delta;
                user.last_seen = self.clock.now();
                prev
            }
            None => {
                warn!("balance adjustment for unknown user {id}");
                return Ok(false);
            }
        };

        if let Err(e) = self.flush(&state) {
            if let Some(user) = state.users.get_mut(id) {
                user.balance = prev_balance;
                user.last_seen = prev_last_seen;
            }
            return Err(e);
        }
        Ok(true)
    }

    /// Appends a transaction to the log, stamped with the current time.
    /// The log accepts any `user_id`, known or not, and is not coupled to
    /// `adjust_balance`: a real deposit takes both calls.
    pub fn record_transaction(
        &self,
        user_id: &str,
        amount: Decimal,
        kind: TransactionKind,
    ) -> LedgerResult<Transaction> {
        let mut state = self.lock();
        let transaction = Transaction {
            user_id: user_id.to_owned(),
            amount,
            kind,
            timestamp: self.clock.now(),
        };

        state.transactions.push(transaction.clone());
        if let Err(e) = self.flush(&state) {
            state.transactions.pop();
            return Err(e);
        }
        Ok(transaction)
    }

    pub fn get_user(&self, id: &str) -> Option<User> {
        self.lock().users.get(id).cloned()
    }

    /// Snapshot copy of every user, in mapping order.
    pub fn list_users(&self) -> Vec<User> {
        self.lock().users.values().cloned().collect()
    }

    /// Totals recomputed by walking the live state on every call. O(n),
    /// which is a scaling limit, not a bug, at the expected size of a
    /// single deployment's user base.
    pub fn aggregate_stats(&self) -> Stats {
        let state = self.lock();
        Stats {
            user_count: state.users.len(),
            total_balance: state.users.values().map(|u| u.balance).sum(),
            transaction_count: state.transactions.len(),
        }
    }
}

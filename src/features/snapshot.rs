//! Snapshot persistence: the full-state JSON codec plus crash-safe file
//! I/O and startup recovery.
//!
//! The on-disk format is the compatibility contract with snapshots
//! written by the previous implementation: a single JSON object with
//! `users`, `products` and `transactions` at the top level.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use log::info;

use super::error::{LedgerError, LedgerResult};
use super::ledger::LedgerState;

/// Serializes the full store state. Deterministic: users live in a
/// `BTreeMap`, so key order is stable, and the log keeps append order.
/// Pretty-printed so the file stays inspectable by hand.
pub(crate) fn encode(state: &LedgerState) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec_pretty(state).map_err(LedgerError::CorruptData)
}

pub(crate) fn decode(bytes: &[u8]) -> LedgerResult<LedgerState> {
    serde_json::from_slice(bytes).map_err(LedgerError::CorruptData)
}

/// Writes `bytes` to a temporary sibling of `path` and renames it into
/// place, so a crash mid-write can never leave a truncated snapshot
/// behind the real filename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> LedgerResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Startup recovery. A missing snapshot is a fresh deployment: start
/// empty and write an initial snapshot so a valid file exists on disk
/// afterwards. A snapshot that exists but does not decode is fatal -
/// the ledger must not run on unknown state.
pub(crate) fn load_or_init(path: &Path) -> LedgerResult<LedgerState> {
    match fs::read(path) {
        Ok(bytes) => decode(&bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let state = LedgerState::default();
            write_atomic(path, &encode(&state)?)?;
            info!(
                "no snapshot at {}, initialized an empty ledger",
                path.display()
            );
            Ok(state)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::transaction::{Transaction, TransactionKind};
    use crate::features::user::User;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn sample_state() -> LedgerState {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let mut state = LedgerState::default();
        let mut user = User::new("42", Some("ana"), "Ana", now);
        user.balance = dec!(15.5);
        state.users.insert(user.id.clone(), user);
        state.transactions.push(Transaction {
            user_id: "42".to_owned(),
            amount: dec!(15.5),
            kind: TransactionKind::Deposit,
            timestamp: now,
        });
        state
    }

    #[test]
    fn test_round_trip_empty_state() {
        let state = LedgerState::default();
        let decoded = decode(&encode(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_round_trip_preserves_users_and_log() {
        let state = sample_state();
        let decoded = decode(&encode(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_round_trip_passes_products_through() {
        let mut state = sample_state();
        state.products = vec![serde_json::json!({"name": "sticker", "price": 3})];
        let decoded = decode(&encode(&state).unwrap()).unwrap();
        assert_eq!(decoded.products, state.products);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode(b"{not json");
        assert!(matches!(result, Err(LedgerError::CorruptData(_))));
    }

    #[test]
    fn test_decode_prior_version_snapshot() {
        // Field names and number shapes as written by the previous
        // implementation.
        let raw = r#"{
            "users": {
                "42": {
                    "id": "42",
                    "username": "ana",
                    "first_name": "Ana",
                    "balance": 15.5,
                    "joined_date": "2024-01-15T10:30:00Z",
                    "last_seen": "2024-01-15T10:30:00Z"
                }
            },
            "products": [],
            "transactions": [
                {"user_id": "42", "amount": 15.5, "type": "deposit", "date": "2024-01-15T10:31:00Z"}
            ]
        }"#;
        let state = decode(raw.as_bytes()).unwrap();
        let user = &state.users["42"];
        assert_eq!(user.display_name, "Ana");
        assert_eq!(user.balance, dec!(15.5));
        assert_eq!(state.transactions.len(), 1);
        assert_eq!(state.transactions[0].kind, TransactionKind::Deposit);
    }

    #[test]
    fn test_load_missing_file_initializes_and_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");

        let state = load_or_init(&path).unwrap();
        assert!(state.users.is_empty());
        assert!(state.transactions.is_empty());

        // A fresh deployment must leave a valid snapshot on disk.
        let reloaded = load_or_init(&path).unwrap();
        assert_eq!(reloaded, state);
    }

    #[test]
    fn test_load_corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, b"definitely not a ledger").unwrap();

        let result = load_or_init(&path);
        assert!(matches!(result, Err(LedgerError::CorruptData(_))));
    }

    #[test]
    fn test_write_atomic_replaces_and_removes_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, b"old contents").unwrap();

        write_atomic(&path, b"new contents").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new contents");
        assert!(!path.with_extension("tmp").exists());
    }
}

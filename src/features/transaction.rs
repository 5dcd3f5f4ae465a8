use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a logged monetary event represents.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A credit to the user's account.
    Deposit,

    /// A debit from the user's account.
    Withdrawal,

    /// A manual balance correction applied by an operator.
    Adjustment,
}

/// A logged monetary event. Entries are append-only: once recorded they
/// are never mutated or deleted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Weak reference: the user existed when the entry was recorded, but
    /// the log does not require it to resolve afterwards.
    pub user_id: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    #[serde(rename = "type")]
    pub kind: TransactionKind,

    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(TransactionKind::Deposit, "deposit")]
    #[test_case(TransactionKind::Withdrawal, "withdrawal")]
    #[test_case(TransactionKind::Adjustment, "adjustment")]
    fn test_kind_serializes_lowercase(kind: TransactionKind, expected: &str) {
        assert_eq!(serde_json::to_value(kind).unwrap(), expected);
    }

    #[test]
    fn test_kind_parses_from_snapshot_field() {
        let kind: TransactionKind = serde_json::from_str("\"withdrawal\"").unwrap();
        assert_eq!(kind, TransactionKind::Withdrawal);
    }
}

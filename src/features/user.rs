use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A registered account holder.
///
/// The serde renames keep the on-disk field names of snapshots written by
/// the previous implementation (`first_name`, `joined_date`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(rename = "first_name")]
    pub display_name: String,

    /// May go negative; the store enforces no floor. Callers that forbid
    /// overdrafts must check before adjusting.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,

    /// Set once at registration, never updated afterwards.
    #[serde(rename = "joined_date")]
    pub joined_at: DateTime<Utc>,

    pub last_seen: DateTime<Utc>,
}

impl User {
    pub(crate) fn new(
        id: &str,
        username: Option<&str>,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_owned(),
            username: username.map(str::to_owned),
            display_name: display_name.to_owned(),
            balance: dec!(0),
            joined_at: now,
            last_seen: now,
        }
    }
}

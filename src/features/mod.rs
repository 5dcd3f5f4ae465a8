mod error;
mod ledger;
mod snapshot;
mod transaction;
mod user;

pub use self::{
    error::{LedgerError, LedgerResult},
    ledger::{Clock, Ledger, LedgerState, Stats, SystemClock},
    transaction::{Transaction, TransactionKind},
    user::User,
};

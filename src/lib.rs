mod features;

pub use features::{
    Clock, Ledger, LedgerError, LedgerResult, LedgerState, Stats, SystemClock, Transaction,
    TransactionKind, User,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("snapshot bytes are not valid ledger data - {0}")]
    CorruptData(#[source] serde_json::Error),

    #[error("snapshot i/o failed - {0}")]
    Io(#[from] std::io::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

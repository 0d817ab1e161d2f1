use super::MemberId;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures reported back to the command layer.  None of these are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid amount {0}")]
    InvalidAmount(i64),

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },

    #[error("unknown identity `{0}`")]
    UnknownIdentity(String),

    #[error("{kind} `{value}` is not in the configured list")]
    InvalidSelection { kind: SelectionKind, value: String },

    #[error("`{member}` is archived with {balance} points")]
    Archived { member: MemberId, balance: u64 },

    #[error("sender and receiver are the same member")]
    SelfReferenceDenied,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Clan,
    EventType,
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SelectionKind::Clan => write!(f, "clan"),
            SelectionKind::EventType => write!(f, "event type"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not serialize `{path}`: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not write `{path}`: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

use thiserror::Error;

/// Failures of the pure squares engine. Nothing is applied when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquaresError {
    #[error("Total squares ({requested}) exceeds {capacity}!")]
    OverCapacity { requested: u64, capacity: usize },
    #[error("Please add at least one player with a name!")]
    NoParticipants,
    #[error("Labels must be a permutation of the digits 0-9")]
    InvalidLabels,
}

#[cfg(feature = "ssr")]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Connection(#[from] diesel::ConnectionError),
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
    #[error("Malformed pool record: {0}")]
    Record(#[from] serde_json::Error),
    #[error("Pool '{0}' not found")]
    NotFound(String),
    #[error("Pool '{0}' already exists")]
    AlreadyExists(String),
    #[error("Invalid pool key '{0}'")]
    InvalidKey(String),
    #[error("Unknown pool kind '{0}'")]
    UnknownKind(String),
}

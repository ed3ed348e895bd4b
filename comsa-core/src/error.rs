use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComsaError {
    #[error("metadata key not found: slot={slot} key={key}")]
    MetadataKeyNotFound { slot: String, key: String },

    #[error("metadata key is ambiguous: slot={slot} key={key} matches={matches}")]
    MetadataKeyAmbiguous {
        slot: String,
        key: String,
        matches: usize,
    },

    #[error("transaction reference count mismatch: declared={expected} recovered={actual}")]
    ReferenceCountMismatch { expected: usize, actual: usize },

    #[error("payload decode error: {0}")]
    PayloadDecode(String),

    #[error("no hash tag message found among {messages} messages")]
    HashTagMissing { messages: usize },

    #[error("hash tag mismatch: expected={expected} found={found}")]
    HashTagMismatch { expected: String, found: String },

    #[error("fragment gap at position {position}: found sequence index {found}")]
    FragmentGap { position: usize, found: u32 },

    #[error("content hash mismatch: declared={expected} actual={actual}")]
    ContentHashMismatch { expected: String, actual: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid metadata key: {0}")]
    KeyFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ComsaError>;

impl ComsaError {
    /// True for the absence sentinel that ends catalog pagination.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ComsaError::MetadataKeyNotFound { .. })
    }
}

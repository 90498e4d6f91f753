use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    /// A persisted record carried a role outside the known set. Treated as
    /// storage corruption or schema drift, never silently defaulted.
    #[error("Unknown message role: {0}")]
    UnknownRole(String),

    /// A tool call result record is missing the call id that correlates it
    /// with the provider.
    #[error("Tool call result for \"{0}\" is missing its call id")]
    MissingCallId(String),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

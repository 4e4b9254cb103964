use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Build was given zero documents; nothing must be persisted.
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("malformed index: {0}")]
    MalformedIndex(String),

    #[error("no index loaded")]
    IndexNotLoaded,

    #[error("unsupported tokenizer: {0}")]
    UnsupportedTokenizer(String),

    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        IndexError::MalformedIndex(msg.into())
    }
}

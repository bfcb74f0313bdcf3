use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// A source file that none of the candidate encodings decoded cleanly.
#[derive(Error, Debug, Clone)]
#[error("could not decode {} as any of {tried:?}", path.display())]
pub struct EncodingError {
    pub path: PathBuf,
    pub tried: Vec<&'static str>,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("index build failed: {0}")]
    IndexBuild(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("index not ready: no index generation has been built or loaded")]
    IndexNotReady,

    #[error("an index rebuild is already in progress")]
    RebuildInProgress,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("document {0} not found")]
    DocumentNotFound(DocId),

    #[error("snapshot corrupt: {0}")]
    CorruptSnapshot(String),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("snapshot metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

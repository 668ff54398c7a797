use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("catalog is empty, nothing to index")]
    EmptyCatalog,
    #[error("catalog content produced an empty vocabulary")]
    EmptyVocabulary,
    #[error("catalog record {position} has an empty title")]
    EmptyTitle { position: usize },
    #[error("duplicate title in catalog: {title}")]
    DuplicateTitle { title: String },
    #[error("invalid popularity {value} for {title}")]
    InvalidPopularity { title: String, value: f64 },
    #[error("unknown item: {title}")]
    UnknownItem { title: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("query log storage: {0}")]
    Storage(#[from] sled::Error),
    #[error("query log encoding: {0}")]
    Encode(#[from] bincode::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// A log record that could not be decoded during replay. Reported, never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLogEntry {
    pub key: Vec<u8>,
    pub reason: String,
}

impl std::fmt::Display for MalformedLogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed log entry {:02x?}: {}", self.key, self.reason)
    }
}

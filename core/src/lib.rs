//! Content-based movie retrieval: TF-IDF similarity blended with popularity,
//! age and genre eligibility, and feedback that survives restarts through a
//! replayed query log.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod index;
pub mod querylog;
pub mod ranker;
pub mod request;
pub mod tokenizer;

pub use catalog::{load_catalog, Catalog, CatalogRecord, Item, ItemId};
pub use config::{EngineConfig, IdfScheme, RankWeights};
pub use engine::{FeedbackReceipt, ItemSnapshot, Recommendation, Recommender};
pub use error::{EngineError, MalformedLogEntry};
pub use feedback::FeedbackEvent;
pub use index::{SparseVector, TermId, TextIndex};
pub use querylog::{EntryKind, LogEntry, QueryLog, ReplayReport};
pub use request::QueryRequest;

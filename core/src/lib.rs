//! Offline, batch-built text retrieval over a fixed document collection.
//!
//! Every structure is built once from the full document set and is immutable
//! afterwards; see [`engine::Engine`] for the query-facing operations.

pub mod boolean;
pub mod completion;
pub mod config;
pub mod dictionary;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod ngram;
pub mod persist;
pub mod ranking;
pub mod thesaurus;
pub mod tokenizer;
pub mod topics;

pub use config::{CollectionConfig, TextConfig};
pub use document::{Document, ProcessedDocument};
pub use engine::{Engine, EngineHandle};
pub use error::{Result, SiftError};
pub use index::{DocId, IndexBuilder, Posting, TermRecord, WeightedIndex};
pub use ngram::NgramIndex;
pub use ranking::ScoredDoc;
pub use thesaurus::{ExpandedQuery, SynonymPair, Thesaurus};

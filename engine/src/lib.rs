//! Chinese full-text retrieval: jieba-based tokenization with a corpus-mined
//! custom dictionary, an in-memory inverted index, and BM25 ranking.

pub mod assembler;
pub mod builder;
pub mod config;
pub mod dictionary;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod generation;
pub mod index;
pub mod lexicon;
pub mod persist;
pub mod scorer;
pub mod tokenizer;

pub use config::{Bm25Params, EngineConfig, RelevanceThresholds};
pub use engine::{Health, RebuildSummary, SearchEngine, SearchResponse};
pub use error::{EncodingError, EngineError, Result};
pub use index::{CorpusStatistics, DocId, Document, InvertedIndex, Posting, TermId};

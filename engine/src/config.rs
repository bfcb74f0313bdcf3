//! Engine configuration.
//!
//! Every section carries `#[serde(default)]`, so a JSON file only needs the
//! keys it wants to override.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub index_dir: PathBuf,
    pub bm25: Bm25Params,
    pub relevance: RelevanceThresholds,
    pub search: SearchConfig,
    pub dictionary: DictionaryConfig,
    pub tokenizer: TokenizerConfig,
    pub sources: SourceConfig,
    /// Number of entries in `CorpusStatistics::top_terms`.
    pub top_terms: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("./index"),
            bm25: Bm25Params::default(),
            relevance: RelevanceThresholds::default(),
            search: SearchConfig::default(),
            dictionary: DictionaryConfig::default(),
            tokenizer: TokenizerConfig::default(),
            sources: SourceConfig::default(),
            top_terms: 10,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.bm25.validate()?;
        self.relevance.validate()?;
        self.search.validate()?;
        if self.dictionary.max_term_chars < 2 {
            return Err(EngineError::InvalidConfig("dictionary.max_term_chars must be at least 2".into()));
        }
        if self.sources.extensions.is_empty() {
            return Err(EngineError::InvalidConfig("sources.extensions must not be empty".into()));
        }
        Ok(())
    }
}

/// BM25 free parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization strength.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.6 } }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(EngineError::InvalidConfig(format!("bm25.k1 must be >= 0, got {}", self.k1)));
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            return Err(EngineError::InvalidConfig(format!("bm25.b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

/// Score cut-offs for relevance labels. Corpus-scale dependent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceThresholds {
    /// Scores strictly above this are "high".
    pub high: f64,
    /// Scores at or above this (and not high) are "medium".
    pub medium: f64,
}

impl Default for RelevanceThresholds {
    fn default() -> Self { Self { high: 5.0, medium: 2.0 } }
}

impl RelevanceThresholds {
    pub fn validate(&self) -> Result<()> {
        if !self.high.is_finite() || !self.medium.is_finite() || self.medium < 0.0 || self.high < self.medium {
            return Err(EngineError::InvalidConfig(format!(
                "relevance thresholds must satisfy high >= medium >= 0, got high={} medium={}",
                self.high, self.medium
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    /// Hard cap; larger requests are clamped.
    pub max_limit: usize,
    /// Snippet length in characters.
    pub snippet_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self { Self { default_limit: 10, max_limit: 50, snippet_chars: 300 } }
}

impl SearchConfig {
    fn validate(&self) -> Result<()> {
        if self.max_limit == 0 || self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(EngineError::InvalidConfig("search limits must satisfy 0 < default_limit <= max_limit".into()));
        }
        if self.snippet_chars == 0 {
            return Err(EngineError::InvalidConfig("search.snippet_chars must be positive".into()));
        }
        Ok(())
    }
}

/// Thresholds for mining the custom dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Keep a candidate seen in at least this many documents.
    pub min_doc_freq: usize,
    /// Or one that occurs at least this often inside a single document.
    pub min_term_freq: usize,
    pub max_terms: usize,
    pub max_term_chars: usize,
    /// Also propose two adjacent multi-character segments joined together.
    /// Off by default.
    pub merge_adjacent: bool,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self { min_doc_freq: 2, min_term_freq: 3, max_terms: 1000, max_term_chars: 8, merge_adjacent: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// One stop word per line. Built-in list when absent.
    pub stopwords_file: Option<PathBuf>,
    /// One part-of-speech tag per line. Built-in list when absent.
    pub pos_tags_file: Option<PathBuf>,
    /// Minimum term length in characters.
    pub min_term_chars: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self { Self { stopwords_file: None, pos_tags_file: None, min_term_chars: 1 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub extensions: Vec<String>,
    pub max_doc_bytes: u64,
    /// Documents with fewer CJK ideographs are skipped.
    pub min_chinese_chars: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["txt".into(), "md".into()],
            max_doc_bytes: 10 * 1024 * 1024,
            min_chinese_chars: 5,
        }
    }
}

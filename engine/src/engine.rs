//! The query-facing facade.
//!
//! Readers clone the current `Arc<Generation>` under a read lock held only
//! for the clone; a rebuild constructs the next generation off to the side,
//! persists it, and publishes it with a single pointer swap. Rebuilds are
//! serialized by a separate mutex and a concurrent attempt is rejected.

use crate::assembler::{assemble, AssemblyContext, ResultRecord};
use crate::builder::{IndexBuilder, SkippedSource};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::generation::{DocumentInfo, Generation, QueryAnalysis, SimilarDocument, TermStats};
use crate::index::{CorpusStatistics, DocId};
use crate::lexicon::Lexicon;
use crate::persist::{load_snapshot, save_snapshot, IndexPaths};
use crate::scorer;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub ready: bool,
    pub documents_count: usize,
    pub vocabulary_size: usize,
    pub last_indexed: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub terms: Vec<String>,
    pub limit: usize,
    pub total_hits: usize,
    pub results: Vec<ResultRecord>,
    pub took_ms: u128,
    pub took_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebuildSummary {
    pub success: bool,
    pub documents_count: usize,
    pub vocabulary_size: usize,
    pub dictionary_size: usize,
    pub skipped: Vec<SkippedSource>,
    pub last_indexed: String,
}

pub struct SearchEngine {
    config: EngineConfig,
    lexicon: Arc<Lexicon>,
    paths: IndexPaths,
    current: RwLock<Option<Arc<Generation>>>,
    rebuild_lock: Mutex<()>,
}

impl SearchEngine {
    /// Validate the configuration and try to load the persisted snapshot.
    /// A missing or unreadable snapshot leaves the engine running but not
    /// ready; only configuration problems are errors.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let lexicon = Arc::new(Lexicon::from_config(&config.tokenizer)?);
        let paths = IndexPaths::new(&config.index_dir);
        let engine = Self { config, lexicon, paths, current: RwLock::new(None), rebuild_lock: Mutex::new(()) };
        engine.bootstrap();
        Ok(engine)
    }

    fn bootstrap(&self) {
        if !self.paths.exists() {
            tracing::info!(index = %self.paths.root.display(), "no snapshot found; engine not ready until a rebuild");
            return;
        }
        match load_snapshot(&self.paths) {
            Ok(snap) => {
                let generation = Generation::from_snapshot(snap, self.lexicon.clone(), self.config.top_terms);
                tracing::info!(
                    num_docs = generation.docs.len(),
                    num_terms = generation.stats.vocabulary_size,
                    "snapshot loaded"
                );
                self.publish(Arc::new(generation));
            }
            Err(err) => {
                tracing::warn!(index = %self.paths.root.display(), error = %err, "failed to load snapshot; engine not ready");
            }
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// The live generation, if any.
    pub fn current(&self) -> Option<Arc<Generation>> { self.current.read().clone() }

    pub fn generation(&self) -> Result<Arc<Generation>> { self.current().ok_or(EngineError::IndexNotReady) }

    fn publish(&self, generation: Arc<Generation>) { *self.current.write() = Some(generation); }

    pub fn health(&self) -> Health {
        match self.current() {
            Some(g) => Health {
                ready: true,
                documents_count: g.docs.len(),
                vocabulary_size: g.index.vocabulary_size(),
                last_indexed: Some(g.built_at.clone()),
            },
            None => Health { ready: false, documents_count: 0, vocabulary_size: 0, last_indexed: None },
        }
    }

    /// Rank documents for `query`. `limit` defaults to the configured default
    /// and is clamped to the configured cap; zero is rejected.
    pub fn search(&self, query: &str, limit: Option<usize>, include_snippets: bool) -> Result<SearchResponse> {
        let start = Instant::now();
        if query.trim().is_empty() {
            return Err(EngineError::InvalidQuery("query must not be empty".into()));
        }
        let limit = match limit {
            Some(0) => return Err(EngineError::InvalidQuery("limit must be at least 1".into())),
            Some(l) => l.min(self.config.search.max_limit),
            None => self.config.search.default_limit,
        };
        let g = self.generation()?;

        let terms = g.tokenizer.terms(query, true);
        let ranked = scorer::score(&terms, &g.index, &g.docs, &g.stats, self.config.bm25);
        let ctx = AssemblyContext {
            docs: &g.docs,
            texts: &g.texts,
            query_terms: &terms,
            thresholds: self.config.relevance,
            snippet_chars: self.config.search.snippet_chars,
        };
        let results = assemble(&ranked, limit, include_snippets, &ctx);

        let elapsed = start.elapsed();
        tracing::debug!(query, ?terms, hits = ranked.len(), took_ms = elapsed.as_millis() as u64, "search");
        Ok(SearchResponse {
            query: query.to_string(),
            terms,
            limit,
            total_hits: ranked.len(),
            results,
            took_ms: elapsed.as_millis(),
            took_s: elapsed.as_secs_f64(),
        })
    }

    pub fn stats(&self) -> Result<CorpusStatistics> { Ok(self.generation()?.stats.clone()) }

    /// Build a new generation from `root`, persist it, and swap it in. On any
    /// failure the previous generation stays live.
    pub fn rebuild_index<P: AsRef<Path>>(&self, root: P) -> Result<RebuildSummary> {
        let _guard = self.rebuild_lock.try_lock().ok_or(EngineError::RebuildInProgress)?;
        let root = root.as_ref();
        let start = Instant::now();

        let build = IndexBuilder::new(&self.config, self.lexicon.clone()).build(root)?;
        let skipped = build.skipped.clone();
        let generation = Generation::from_build(build, root.display().to_string());
        save_snapshot(&self.paths, &generation.to_snapshot())?;

        let summary = RebuildSummary {
            success: true,
            documents_count: generation.docs.len(),
            vocabulary_size: generation.index.vocabulary_size(),
            dictionary_size: generation.dictionary().len(),
            skipped,
            last_indexed: generation.built_at.clone(),
        };
        self.publish(Arc::new(generation));
        tracing::info!(
            num_docs = summary.documents_count,
            num_terms = summary.vocabulary_size,
            took_s = start.elapsed().as_secs_f64(),
            "generation published"
        );
        Ok(summary)
    }

    pub fn term_stats(&self, term: &str) -> Result<TermStats> {
        if term.trim().is_empty() {
            return Err(EngineError::InvalidQuery("term must not be empty".into()));
        }
        self.generation()?.term_stats(term)
    }

    pub fn similar(&self, doc_id: DocId, limit: usize) -> Result<Vec<SimilarDocument>> {
        self.generation()?.similar(doc_id, limit.min(self.config.search.max_limit))
    }

    pub fn document(&self, doc_id: DocId, include_content: bool) -> Result<DocumentInfo> {
        self.generation()?.document_info(doc_id, include_content)
    }

    pub fn analyze_query(&self, query: &str) -> Result<QueryAnalysis> {
        if query.trim().is_empty() {
            return Err(EngineError::InvalidQuery("query must not be empty".into()));
        }
        Ok(self.generation()?.analyze_query(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn engine_with_docs() -> (tempfile::TempDir, SearchEngine) {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("a.txt"), "猪肝制作方法：先浸泡再快炒。").unwrap();
        let config = EngineConfig { index_dir: dir.path().join("index"), ..Default::default() };
        let engine = SearchEngine::open(config).unwrap();
        (dir, engine)
    }

    #[test]
    fn second_rebuild_is_rejected_while_one_runs() {
        let (dir, engine) = engine_with_docs();
        let docs = dir.path().join("docs");
        {
            let _running = engine.rebuild_lock.lock();
            assert!(matches!(engine.rebuild_index(&docs), Err(EngineError::RebuildInProgress)));
            assert!(!engine.health().ready);
        }
        engine.rebuild_index(&docs).unwrap();
        assert!(engine.health().ready);
    }

    #[test]
    fn rejected_rebuild_leaves_live_generation() {
        let (dir, engine) = engine_with_docs();
        let docs = dir.path().join("docs");
        engine.rebuild_index(&docs).unwrap();
        let before = engine.health();
        let _running = engine.rebuild_lock.lock();
        assert!(matches!(engine.rebuild_index(&docs), Err(EngineError::RebuildInProgress)));
        assert_eq!(engine.health(), before);
        assert!(!engine.search("猪肝", None, false).unwrap().results.is_empty());
    }
}

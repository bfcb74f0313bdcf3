//! Index build: discover sources, decode, mine the dictionary, tokenize in
//! parallel, then merge postings serially in doc-id order.

use crate::config::{EngineConfig, SourceConfig};
use crate::dictionary::{extract_terms, CustomDictionary};
use crate::encoding::read_document;
use crate::error::{EngineError, Result};
use crate::index::{CorpusStatistics, DocId, Document, InvertedIndex};
use crate::lexicon::Lexicon;
use crate::tokenizer::{count_chinese_chars, Tokenizer};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub path: String,
    pub reason: String,
}

/// Result of one successful build, not yet published.
#[derive(Debug)]
pub struct BuildOutput {
    pub docs: Vec<Document>,
    pub index: InvertedIndex,
    pub stats: CorpusStatistics,
    pub dictionary: Arc<CustomDictionary>,
    pub tokenizer: Tokenizer,
    pub texts: Vec<String>,
    pub skipped: Vec<SkippedSource>,
}

struct Loaded {
    path: PathBuf,
    text: String,
    chinese_chars: usize,
}

/// Candidate files under `root`, sorted by name so a given listing always
/// yields the same doc ids.
pub fn discover_sources(root: &Path, cfg: &SourceConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(EngineError::IndexBuild(format!("document root {} is not a readable directory", root.display())));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let p = entry.path();
        if !entry.file_type().is_file() || !has_extension(p, &cfg.extensions) {
            continue;
        }
        match entry.metadata() {
            Ok(m) if m.len() > 0 && m.len() <= cfg.max_doc_bytes => files.push(p.to_path_buf()),
            Ok(m) => tracing::debug!(path = %p.display(), bytes = m.len(), "skipping empty or oversized file"),
            Err(err) => tracing::warn!(path = %p.display(), error = %err, "skipping file without metadata"),
        }
    }
    Ok(files)
}

fn has_extension(p: &Path, extensions: &[String]) -> bool {
    p.extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

pub struct IndexBuilder<'a> {
    config: &'a EngineConfig,
    lexicon: Arc<Lexicon>,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(config: &'a EngineConfig, lexicon: Arc<Lexicon>) -> Self {
        Self { config, lexicon }
    }

    /// Build a complete generation from the files under `root`. Unreadable or
    /// non-Chinese files are skipped; the build fails only if none remain.
    pub fn build(&self, root: &Path) -> Result<BuildOutput> {
        let files = discover_sources(root, &self.config.sources)?;
        tracing::info!(root = %root.display(), files = files.len(), "discovered sources");

        let min_chinese = self.config.sources.min_chinese_chars;
        let loaded: Vec<std::result::Result<Loaded, SkippedSource>> =
            files.par_iter().map(|p| load_source(p, min_chinese)).collect();
        let mut skipped = Vec::new();
        let mut accepted = Vec::new();
        for item in loaded {
            match item {
                Ok(l) => accepted.push(l),
                Err(s) => skipped.push(s),
            }
        }
        if accepted.is_empty() {
            return Err(EngineError::IndexBuild(format!("no usable documents under {}", root.display())));
        }

        let dictionary = Arc::new(extract_terms(
            &accepted.iter().map(|l| l.text.as_str()).collect::<Vec<_>>(),
            &self.lexicon,
            &self.config.dictionary,
        ));
        let tokenizer = Tokenizer::new(self.lexicon.clone(), dictionary.clone());
        let tokenized: Vec<Vec<String>> = accepted.par_iter().map(|l| tokenizer.terms(&l.text, false)).collect();

        // single accumulation point; doc ids are dense over accepted documents
        let mut index = InvertedIndex::new();
        let mut docs = Vec::with_capacity(accepted.len());
        let mut texts = Vec::with_capacity(accepted.len());
        for (source, terms) in accepted.into_iter().zip(tokenized) {
            if terms.is_empty() {
                skipped.push(SkippedSource { path: source.path.display().to_string(), reason: "no indexable terms".into() });
                continue;
            }
            let doc_id = docs.len() as DocId;
            index.add_document(doc_id, &frequencies(&terms));
            docs.push(Document {
                doc_id,
                path: source.path.display().to_string(),
                title: source.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                total_chars: source.text.chars().count(),
                chinese_chars: source.chinese_chars,
                terms,
            });
            texts.push(source.text);
        }
        for s in &skipped {
            tracing::warn!(path = %s.path, reason = %s.reason, "document skipped");
        }
        if docs.is_empty() {
            return Err(EngineError::IndexBuild(format!("no document under {} produced any terms", root.display())));
        }

        index.prune();
        let stats = CorpusStatistics::compute(&docs, &index, self.config.top_terms);
        tracing::info!(
            num_docs = docs.len(),
            num_terms = stats.vocabulary_size,
            skipped = skipped.len(),
            "index build complete"
        );
        Ok(BuildOutput { docs, index, stats, dictionary, tokenizer, texts, skipped })
    }
}

fn load_source(path: &Path, min_chinese: usize) -> std::result::Result<Loaded, SkippedSource> {
    let skip = |reason: String| SkippedSource { path: path.display().to_string(), reason };
    let decoded = read_document(path).map_err(|e| skip(e.to_string()))?;
    let chinese_chars = count_chinese_chars(&decoded.text);
    if chinese_chars < min_chinese {
        return Err(skip(format!("only {chinese_chars} chinese characters")));
    }
    Ok(Loaded { path: path.to_path_buf(), text: decoded.text, chinese_chars })
}

/// Term frequencies in first-occurrence order.
pub(crate) fn frequencies(terms: &[String]) -> Vec<(String, u32)> {
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<(String, u32)> = Vec::new();
    for t in terms {
        match slot.get(t.as_str()) {
            Some(&i) => out[i].1 += 1,
            None => {
                slot.insert(t.as_str(), out.len());
                out.push((t.clone(), 1));
            }
        }
    }
    out
}

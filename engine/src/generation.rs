//! One immutable, fully built index generation and its read-only queries.

use crate::builder::BuildOutput;
use crate::dictionary::CustomDictionary;
use crate::error::{EngineError, Result};
use crate::index::{CorpusStatistics, DocId, Document, InvertedIndex, Posting, TermCount};
use crate::lexicon::Lexicon;
use crate::persist::{MetaFile, Snapshot, FORMAT_VERSION};
use crate::scorer::idf;
use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

#[derive(Debug)]
pub struct Generation {
    pub docs: Vec<Document>,
    pub index: InvertedIndex,
    pub stats: CorpusStatistics,
    pub tokenizer: Tokenizer,
    pub texts: Vec<String>,
    pub built_at: String,
    pub source_root: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermStats {
    pub term: String,
    pub document_frequency: u32,
    pub total_frequency: u64,
    pub idf: f64,
    pub coverage: String,
    /// First postings, in doc-id order.
    pub documents: Vec<Posting>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarDocument {
    pub doc_id: DocId,
    pub similarity: f64,
    pub title: String,
    pub path: String,
    pub shared_terms: usize,
    pub total_terms: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub doc_id: DocId,
    pub title: String,
    pub path: String,
    pub length: usize,
    pub chinese_chars: usize,
    pub total_chars: usize,
    pub top_terms: Vec<TermCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Rare,
    Common,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermAnalysis {
    pub term: String,
    pub frequency: u64,
    pub document_coverage: u32,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    pub processed_terms: Vec<String>,
    pub term_count: usize,
    pub term_analysis: Vec<TermAnalysis>,
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into())
}

impl Generation {
    pub fn from_build(build: BuildOutput, source_root: String) -> Self {
        Self {
            docs: build.docs,
            index: build.index,
            stats: build.stats,
            tokenizer: build.tokenizer,
            texts: build.texts,
            built_at: now_rfc3339(),
            source_root,
        }
    }

    /// Rebuild the in-memory generation from a persisted snapshot; statistics
    /// are recomputed, never read back.
    pub fn from_snapshot(snap: Snapshot, lexicon: Arc<Lexicon>, top_terms: usize) -> Self {
        let stats = CorpusStatistics::compute(&snap.docs, &snap.index, top_terms);
        Self {
            tokenizer: Tokenizer::new(lexicon, Arc::new(snap.dictionary)),
            docs: snap.docs,
            index: snap.index,
            stats,
            texts: snap.texts,
            built_at: snap.meta.created_at,
            source_root: snap.meta.source_root,
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            docs: self.docs.clone(),
            index: self.index.clone(),
            dictionary: CustomDictionary::clone(self.dictionary()),
            texts: self.texts.clone(),
            meta: MetaFile {
                version: FORMAT_VERSION,
                num_docs: self.docs.len() as u32,
                vocabulary_size: self.index.vocabulary_size(),
                created_at: self.built_at.clone(),
                source_root: self.source_root.clone(),
            },
        }
    }

    pub fn dictionary(&self) -> &CustomDictionary { self.tokenizer.dictionary() }

    pub fn document(&self, doc_id: DocId) -> Result<&Document> {
        self.docs.get(doc_id as usize).ok_or(EngineError::DocumentNotFound(doc_id))
    }

    /// Statistics for the first term `raw` tokenizes to. Terms outside the
    /// vocabulary report zero frequencies.
    pub fn term_stats(&self, raw: &str) -> Result<TermStats> {
        let term = self
            .tokenizer
            .terms(raw, true)
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::InvalidQuery(format!("'{raw}' contains no searchable term")))?;
        let n = self.docs.len();
        let postings = self.index.postings(&term).unwrap_or(&[]);
        let df = postings.len() as u32;
        Ok(TermStats {
            idf: if df == 0 { 0.0 } else { idf(n, df) },
            coverage: format!("{df}/{n} documents"),
            document_frequency: df,
            total_frequency: self.index.total_frequency(&term),
            documents: postings.iter().take(5).copied().collect(),
            term,
        })
    }

    /// Documents ranked by Jaccard similarity of their term sets.
    pub fn similar(&self, doc_id: DocId, limit: usize) -> Result<Vec<SimilarDocument>> {
        let source: HashSet<&str> = self.document(doc_id)?.terms.iter().map(String::as_str).collect();
        let mut out: Vec<SimilarDocument> = self
            .docs
            .iter()
            .filter(|d| d.doc_id != doc_id)
            .filter_map(|d| {
                let other: HashSet<&str> = d.terms.iter().map(String::as_str).collect();
                let shared = source.intersection(&other).count();
                let union = source.union(&other).count();
                (union > 0).then(|| SimilarDocument {
                    doc_id: d.doc_id,
                    similarity: shared as f64 / union as f64,
                    title: d.title.clone(),
                    path: d.path.clone(),
                    shared_terms: shared,
                    total_terms: other.len(),
                })
            })
            .collect();
        out.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then_with(|| a.doc_id.cmp(&b.doc_id)));
        out.truncate(limit);
        Ok(out)
    }

    pub fn document_info(&self, doc_id: DocId, include_content: bool) -> Result<DocumentInfo> {
        let d = self.document(doc_id)?;
        Ok(DocumentInfo {
            doc_id,
            title: d.title.clone(),
            path: d.path.clone(),
            length: d.length(),
            chinese_chars: d.chinese_chars,
            total_chars: d.total_chars,
            top_terms: d.top_terms(10),
            content: include_content.then(|| self.texts.get(doc_id as usize).cloned().unwrap_or_default()),
        })
    }

    pub fn analyze_query(&self, query: &str) -> QueryAnalysis {
        let processed_terms = self.tokenizer.terms(query, true);
        let term_analysis = processed_terms
            .iter()
            .map(|t| {
                let df = self.index.doc_frequency(t);
                TermAnalysis {
                    term: t.clone(),
                    frequency: self.index.total_frequency(t),
                    document_coverage: df,
                    rarity: if df < 2 { Rarity::Rare } else { Rarity::Common },
                }
            })
            .collect();
        QueryAnalysis {
            original_query: query.to_string(),
            term_count: processed_terms.len(),
            processed_terms,
            term_analysis,
        }
    }
}

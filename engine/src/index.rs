use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub path: String,
    pub title: String,
    /// Raw text length in characters.
    pub total_chars: usize,
    pub chinese_chars: usize,
    /// Extracted terms in document order; frequencies derive from this.
    pub terms: Vec<String>,
}

impl Document {
    /// Length in terms, as used for BM25 normalization.
    pub fn length(&self) -> usize { self.terms.len() }

    pub fn term_frequencies(&self) -> HashMap<&str, u32> {
        let mut tf: HashMap<&str, u32> = HashMap::new();
        for t in &self.terms {
            *tf.entry(t.as_str()).or_insert(0) += 1;
        }
        tf
    }

    /// Most frequent terms, ties broken by first occurrence.
    pub fn top_terms(&self, n: usize) -> Vec<TermCount> {
        let tf = self.term_frequencies();
        let mut seen = std::collections::HashSet::new();
        let mut ordered: Vec<TermCount> = self
            .terms
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .map(|t| TermCount { term: t.clone(), frequency: tf[t.as_str()] as u64 })
            .collect();
        ordered.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        ordered.truncate(n);
        ordered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

/// Term -> postings sorted by doc id. Term ids follow first appearance in
/// doc-id order; no posting list is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub dictionary: HashMap<String, TermId>,
    pub terms: Vec<String>,
    pub postings: Vec<Vec<Posting>>,
    pub num_docs: u32,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Merge one document's term frequencies. Documents must arrive in
    /// ascending doc-id order; `tfs` in first-occurrence order.
    pub fn add_document(&mut self, doc_id: DocId, tfs: &[(String, u32)]) {
        for (term, tf) in tfs {
            let tid = match self.dictionary.get(term) {
                Some(&tid) => tid,
                None => {
                    let tid = self.terms.len() as TermId;
                    self.dictionary.insert(term.clone(), tid);
                    self.terms.push(term.clone());
                    self.postings.push(Vec::new());
                    tid
                }
            };
            self.postings[tid as usize].push(Posting { doc_id, tf: *tf });
        }
        self.num_docs = self.num_docs.max(doc_id + 1);
    }

    /// Drop terms whose posting list is empty, compacting term ids.
    pub fn prune(&mut self) {
        if self.postings.iter().all(|p| !p.is_empty()) {
            return;
        }
        let terms = std::mem::take(&mut self.terms);
        let postings = std::mem::take(&mut self.postings);
        self.dictionary.clear();
        for (term, plist) in terms.into_iter().zip(postings) {
            if plist.is_empty() {
                continue;
            }
            self.dictionary.insert(term.clone(), self.terms.len() as TermId);
            self.terms.push(term);
            self.postings.push(plist);
        }
    }

    pub fn vocabulary_size(&self) -> usize { self.terms.len() }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.dictionary.get(term).map(|&tid| self.postings[tid as usize].as_slice())
    }

    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.postings(term).map_or(0, |p| p.len() as u32)
    }

    pub fn total_frequency(&self, term: &str) -> u64 {
        self.postings(term).map_or(0, |p| p.iter().map(|x| x.tf as u64).sum())
    }

    /// Every posting names a document in `0..num_docs` and no list is empty.
    pub fn check_integrity(&self, num_docs: usize) -> bool {
        self.terms.len() == self.postings.len()
            && self.dictionary.len() == self.terms.len()
            && self.postings.iter().all(|p| !p.is_empty() && p.iter().all(|x| (x.doc_id as usize) < num_docs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub frequency: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthDistribution {
    pub min: usize,
    pub max: usize,
    pub median: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStatistics {
    pub document_count: usize,
    pub average_document_length: f64,
    pub vocabulary_size: usize,
    pub total_chinese_chars: usize,
    pub total_terms: usize,
    pub top_terms: Vec<TermCount>,
    pub length_distribution: LengthDistribution,
}

impl CorpusStatistics {
    /// Derive statistics from a document table and its index. Top-term ties
    /// go to the term seen first in doc-id order.
    pub fn compute(docs: &[Document], index: &InvertedIndex, top_n: usize) -> Self {
        let document_count = docs.len();
        let total_terms: usize = docs.iter().map(Document::length).sum();
        let average_document_length = if document_count == 0 { 0.0 } else { total_terms as f64 / document_count as f64 };

        let mut top: Vec<(TermId, u64)> = index
            .postings
            .iter()
            .enumerate()
            .map(|(tid, plist)| (tid as TermId, plist.iter().map(|p| p.tf as u64).sum()))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let top_terms = top
            .into_iter()
            .take(top_n)
            .map(|(tid, frequency)| TermCount { term: index.terms[tid as usize].clone(), frequency })
            .collect();

        let mut lengths: Vec<usize> = docs.iter().map(Document::length).collect();
        lengths.sort_unstable();
        let length_distribution = match (lengths.first(), lengths.last()) {
            (Some(&min), Some(&max)) => LengthDistribution { min, max, median: lengths[lengths.len() / 2] },
            _ => LengthDistribution::default(),
        };

        Self {
            document_count,
            average_document_length,
            vocabulary_size: index.vocabulary_size(),
            total_chinese_chars: docs.iter().map(|d| d.chinese_chars).sum(),
            total_terms,
            top_terms,
            length_distribution,
        }
    }
}

//! Okapi BM25 over the in-memory inverted index.
//!
//! `IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)` is always positive, so
//! every document sharing a query term gets a positive score. Ranking is
//! score descending, then doc id ascending.

use crate::config::Bm25Params;
use crate::index::{CorpusStatistics, DocId, Document, InvertedIndex};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

pub fn idf(num_docs: usize, df: u32) -> f64 {
    let n = num_docs as f64;
    let df = df as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Score every document that shares at least one term with the query.
/// Repeated query terms count once; unknown terms contribute nothing.
pub fn score(
    query_terms: &[String],
    index: &InvertedIndex,
    docs: &[Document],
    stats: &CorpusStatistics,
    params: Bm25Params,
) -> Vec<ScoredDoc> {
    let avg_len = stats.average_document_length;
    let mut seen = HashSet::new();
    let mut acc: HashMap<DocId, f64> = HashMap::new();

    for term in query_terms.iter().filter(|t| seen.insert(t.as_str())) {
        let Some(plist) = index.postings(term) else { continue };
        let w = idf(stats.document_count, plist.len() as u32);
        for p in plist {
            let Some(doc) = docs.get(p.doc_id as usize) else { continue };
            let tf = p.tf as f64;
            let norm = if avg_len > 0.0 { doc.length() as f64 / avg_len } else { 1.0 };
            let denom = tf + params.k1 * (1.0 - params.b + params.b * norm);
            *acc.entry(p.doc_id).or_insert(0.0) += w * (tf * (params.k1 + 1.0)) / denom;
        }
    }

    let mut ranked: Vec<ScoredDoc> = acc.into_iter().map(|(doc_id, score)| ScoredDoc { doc_id, score }).collect();
    rank(&mut ranked);
    ranked
}

/// Score descending, doc id ascending.
pub fn rank(hits: &mut [ScoredDoc]) {
    hits.sort_unstable_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(docs: &[&[&str]]) -> (Vec<Document>, InvertedIndex, CorpusStatistics) {
        let docs: Vec<Document> = docs
            .iter()
            .enumerate()
            .map(|(i, terms)| Document {
                doc_id: i as DocId,
                path: format!("{i}.txt"),
                title: format!("{i}.txt"),
                total_chars: 0,
                chinese_chars: 0,
                terms: terms.iter().map(|s| s.to_string()).collect(),
            })
            .collect();
        let mut ix = InvertedIndex::new();
        for d in &docs {
            let tf = d.term_frequencies();
            let mut seen = HashSet::new();
            let tfs: Vec<(String, u32)> =
                d.terms.iter().filter(|t| seen.insert(t.as_str())).map(|t| (t.clone(), tf[t.as_str()])).collect();
            ix.add_document(d.doc_id, &tfs);
        }
        let stats = CorpusStatistics::compute(&docs, &ix, 10);
        (docs, ix, stats)
    }

    fn q(terms: &[&str]) -> Vec<String> { terms.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn idf_is_positive_even_for_ubiquitous_terms() {
        assert!(idf(1, 1) > 0.0);
        assert!(idf(10, 10) > 0.0);
        assert!(idf(10, 1) > idf(10, 5));
    }

    #[test]
    fn matches_formula() {
        let (docs, ix, stats) = corpus(&[&["猪肝", "制作", "方法"], &["汤圆", "做法"]]);
        let p = Bm25Params::default();
        let hits = score(&q(&["猪肝"]), &ix, &docs, &stats, p);
        assert_eq!(hits.len(), 1);
        let avg = 2.5;
        let expected = idf(2, 1) * (1.0 * (p.k1 + 1.0)) / (1.0 + p.k1 * (1.0 - p.b + p.b * 3.0 / avg));
        assert!((hits[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn unknown_terms_score_nothing() {
        let (docs, ix, stats) = corpus(&[&["猪肝"]]);
        assert!(score(&q(&["火锅"]), &ix, &docs, &stats, Bm25Params::default()).is_empty());
        let hits = score(&q(&["火锅", "猪肝"]), &ix, &docs, &stats, Bm25Params::default());
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn only_matching_documents_are_scored() {
        let (docs, ix, stats) = corpus(&[&["猪肝"], &["汤圆"], &["猪肝", "汤圆"]]);
        let hits = score(&q(&["猪肝"]), &ix, &docs, &stats, Bm25Params::default());
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn ties_break_by_doc_id() {
        let (docs, ix, stats) = corpus(&[&["安全", "标准"], &["人事"], &["安全", "标准"]]);
        let hits = score(&q(&["安全"]), &ix, &docs, &stats, Bm25Params::default());
        assert_eq!(hits[0].score, hits[1].score);
        assert_eq!(hits[0].doc_id, 0);
        assert_eq!(hits[1].doc_id, 2);
    }

    #[test]
    fn higher_tf_ranks_first() {
        let (docs, ix, stats) = corpus(&[&["猪肝", "菜谱"], &["猪肝", "猪肝"]]);
        let hits = score(&q(&["猪肝"]), &ix, &docs, &stats, Bm25Params::default());
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn duplicate_query_terms_count_once() {
        let (docs, ix, stats) = corpus(&[&["猪肝"]]);
        let once = score(&q(&["猪肝"]), &ix, &docs, &stats, Bm25Params::default());
        let twice = score(&q(&["猪肝", "猪肝"]), &ix, &docs, &stats, Bm25Params::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn score_ignores_which_id_a_document_got() {
        let (d1, i1, s1) = corpus(&[&["甲", "乙"], &["甲", "丙", "丙"]]);
        let (d2, i2, s2) = corpus(&[&["甲", "丙", "丙"], &["甲", "乙"]]);
        let a = score(&q(&["丙", "甲"]), &i1, &d1, &s1, Bm25Params::default());
        let b = score(&q(&["丙", "甲"]), &i2, &d2, &s2, Bm25Params::default());
        let find = |hits: &[ScoredDoc], id: DocId| hits.iter().find(|h| h.doc_id == id).map(|h| h.score);
        assert_eq!(find(&a, 1), find(&b, 0));
        assert_eq!(find(&a, 0), find(&b, 1));
    }
}

//! Custom dictionary: corpus-mined terms the tokenizer treats as atomic.

use crate::config::DictionaryConfig;
use crate::lexicon::Lexicon;
use crate::tokenizer::{base_segments, clean, is_chinese_char};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Immutable for the lifetime of a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomDictionary {
    terms: BTreeSet<String>,
    first_chars: HashSet<char>,
    max_chars: usize,
}

impl CustomDictionary {
    pub fn new<I: IntoIterator<Item = String>>(terms: I) -> Self {
        let terms: BTreeSet<String> = terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| t.chars().count() >= 2)
            .collect();
        let first_chars = terms.iter().filter_map(|t| t.chars().next()).collect();
        let max_chars = terms.iter().map(|t| t.chars().count()).max().unwrap_or(0);
        Self { terms, first_chars, max_chars }
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn contains(&self, term: &str) -> bool { self.terms.contains(term) }

    /// Terms in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ { self.terms.iter().map(String::as_str) }

    /// Length in chars of the longest term starting at char `start` of
    /// `text`, where `bounds` holds the byte offset of every char plus a
    /// trailing `text.len()`.
    pub(crate) fn longest_match(&self, text: &str, bounds: &[usize], start: usize) -> Option<usize> {
        let first = text[bounds[start]..].chars().next()?;
        if !self.first_chars.contains(&first) {
            return None;
        }
        let remaining = bounds.len() - 1 - start;
        (2..=self.max_chars.min(remaining))
            .rev()
            .find(|&len| self.terms.contains(&text[bounds[start]..bounds[start + len]]))
    }

    /// Dictionary terms occurring strictly inside `term`, by start offset then
    /// longest first.
    pub(crate) fn terms_within<'t>(&self, term: &'t str) -> Vec<&'t str> {
        let bounds: Vec<usize> = term.char_indices().map(|(b, _)| b).chain(std::iter::once(term.len())).collect();
        let n = bounds.len() - 1;
        let mut out = Vec::new();
        for start in 0..n {
            for len in (2..=self.max_chars.min(n - start)).rev() {
                let sub = &term[bounds[start]..bounds[start + len]];
                if len < n && self.terms.contains(sub) {
                    out.push(sub);
                }
            }
        }
        out
    }
}

#[derive(Debug, Default)]
struct Candidate {
    first_seen: usize,
    doc_freq: usize,
    max_in_doc: usize,
    total: usize,
}

/// Mine multi-character domain terms from raw document texts.
///
/// A candidate is a segment of 2..=`max_term_chars` characters containing an
/// ideograph, or (with `merge_adjacent`) two such neighbouring segments
/// joined. It is kept when it occurs in `min_doc_freq` documents or at least
/// `min_term_freq` times within one document.
pub fn extract_terms<S: AsRef<str> + Sync>(texts: &[S], lexicon: &Lexicon, cfg: &DictionaryConfig) -> CustomDictionary {
    let per_doc: Vec<Vec<(String, usize)>> = texts
        .par_iter()
        .map(|text| count_candidates(text.as_ref(), lexicon, cfg))
        .collect();

    let mut candidates: HashMap<String, Candidate> = HashMap::new();
    for counts in per_doc {
        for (term, count) in counts {
            let next = candidates.len();
            let c = candidates.entry(term).or_insert_with(|| Candidate { first_seen: next, ..Default::default() });
            c.doc_freq += 1;
            c.max_in_doc = c.max_in_doc.max(count);
            c.total += count;
        }
    }

    let mut kept: Vec<(String, Candidate)> = candidates
        .into_iter()
        .filter(|(_, c)| c.doc_freq >= cfg.min_doc_freq || c.max_in_doc >= cfg.min_term_freq)
        .collect();
    kept.sort_by(|a, b| b.1.total.cmp(&a.1.total).then(a.1.first_seen.cmp(&b.1.first_seen)));
    kept.truncate(cfg.max_terms);

    let dict = CustomDictionary::new(kept.into_iter().map(|(t, _)| t));
    tracing::info!(terms = dict.len(), docs = texts.len(), "custom dictionary extracted");
    dict
}

/// Candidate counts for one document, in first-occurrence order.
fn count_candidates(text: &str, lexicon: &Lexicon, cfg: &DictionaryConfig) -> Vec<(String, usize)> {
    let cleaned = clean(text);
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    let mut bump = |term: String| match slot.get(&term) {
        Some(&i) => order[i].1 += 1,
        None => {
            slot.insert(term.clone(), order.len());
            order.push((term, 1));
        }
    };

    let mut prev: Option<&str> = None;
    for seg in base_segments(&cleaned) {
        if !is_candidate(seg, lexicon, cfg.max_term_chars) {
            prev = None;
            continue;
        }
        if cfg.merge_adjacent {
            if let Some(p) = prev {
                if p.chars().count() + seg.chars().count() <= cfg.max_term_chars {
                    bump(format!("{p}{seg}"));
                }
            }
        }
        bump(seg.to_string());
        prev = Some(seg);
    }
    order
}

fn is_candidate(seg: &str, lexicon: &Lexicon, max_chars: usize) -> bool {
    let n = seg.chars().count();
    (2..=max_chars).contains(&n)
        && seg.chars().any(is_chinese_char)
        && seg.chars().all(char::is_alphanumeric)
        && !lexicon.is_stopword(seg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DictionaryConfig { DictionaryConfig::default() }

    #[test]
    fn dictionary_ignores_single_chars() {
        let d = CustomDictionary::new(vec!["猪".to_string(), "猪肝".to_string(), " 汤圆 ".to_string()]);
        assert_eq!(d.len(), 2);
        assert!(d.contains("汤圆"));
        assert!(!d.contains("猪"));
    }

    #[test]
    fn longest_match_prefers_longer_terms() {
        let d = CustomDictionary::new(vec!["藕汤".to_string(), "煨藕汤".to_string()]);
        let text = "煨藕汤好";
        let bounds: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();
        assert_eq!(d.longest_match(text, &bounds, 0), Some(3));
        assert_eq!(d.longest_match(text, &bounds, 1), Some(2));
        assert_eq!(d.longest_match(text, &bounds, 3), None);
    }

    #[test]
    fn finds_nested_terms() {
        let d = CustomDictionary::new(vec!["食品安全标准".to_string(), "安全标准".to_string(), "标准".to_string()]);
        assert_eq!(d.terms_within("食品安全标准"), vec!["安全标准", "标准"]);
        assert!(d.terms_within("标准").is_empty());
    }

    #[test]
    fn keeps_terms_seen_in_two_documents() {
        let docs = ["儿童套餐很受欢迎", "我们推出儿童套餐"];
        let d = extract_terms(&docs, &Lexicon::default(), &cfg());
        assert!(d.iter().any(|t| t.contains("套餐")));
    }

    #[test]
    fn keeps_terms_frequent_in_one_document() {
        let docs = ["猪肝 猪肝 猪肝"];
        let d = extract_terms(&docs, &Lexicon::default(), &cfg());
        assert!(d.contains("猪肝"));
    }

    #[test]
    fn drops_rare_terms() {
        let docs = ["猪肝", "汤圆"];
        let d = extract_terms(&docs, &Lexicon::default(), &cfg());
        assert!(d.is_empty());
    }

    #[test]
    fn respects_cap() {
        let docs = ["猪肝 猪肝 猪肝 汤圆 汤圆 汤圆 汤圆"];
        let mut c = cfg();
        c.max_terms = 1;
        let d = extract_terms(&docs, &Lexicon::default(), &c);
        assert_eq!(d.len(), 1);
        assert!(d.contains("汤圆"));
    }

    #[test]
    fn extraction_is_deterministic() {
        let docs = ["安全标准 人事制度 安全标准", "人事制度 安全标准", "汤圆做法 汤圆做法"];
        let a = extract_terms(&docs, &Lexicon::default(), &cfg());
        let b = extract_terms(&docs, &Lexicon::default(), &cfg());
        assert_eq!(a, b);
    }
}

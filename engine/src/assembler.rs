use crate::config::RelevanceThresholds;
use crate::index::{DocId, Document};
use crate::scorer::ScoredDoc;
use crate::tokenizer::normalize;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    pub fn classify(score: f64, t: &RelevanceThresholds) -> Self {
        if score > t.high {
            Relevance::High
        } else if score >= t.medium {
            Relevance::Medium
        } else {
            Relevance::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub doc_id: DocId,
    pub score: f64,
    pub relevance: Relevance,
    pub title: String,
    pub path: String,
    pub length: usize,
    pub chinese_chars: usize,
    pub total_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// What the assembler needs from the live generation.
pub struct AssemblyContext<'a> {
    pub docs: &'a [Document],
    pub texts: &'a [String],
    pub query_terms: &'a [String],
    pub thresholds: RelevanceThresholds,
    pub snippet_chars: usize,
}

/// Turn ranked hits into result records, keeping at most `limit`.
pub fn assemble(ranked: &[ScoredDoc], limit: usize, include_snippets: bool, ctx: &AssemblyContext<'_>) -> Vec<ResultRecord> {
    ranked
        .iter()
        .filter_map(|hit| {
            let doc = ctx.docs.get(hit.doc_id as usize)?;
            let snippet = include_snippets.then(|| {
                let text = ctx.texts.get(hit.doc_id as usize).map(String::as_str).unwrap_or("");
                snippet(text, ctx.query_terms, ctx.snippet_chars)
            });
            Some(ResultRecord {
                doc_id: hit.doc_id,
                score: hit.score,
                relevance: Relevance::classify(hit.score, &ctx.thresholds),
                title: doc.title.clone(),
                path: doc.path.clone(),
                length: doc.length(),
                chinese_chars: doc.chinese_chars,
                total_chars: doc.total_chars,
                snippet,
            })
        })
        .take(limit)
        .collect()
}

/// Excerpt of at most `max_chars` characters around the densest cluster of
/// query-term occurrences, or the leading text when no term occurs.
pub fn snippet(text: &str, terms: &[String], max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let hits = term_spans(&chars, terms);

    let start = match densest_window(&hits, max_chars) {
        Some((first, covered_end)) => {
            // leading context only from the room left after the last hit
            let slack = max_chars.saturating_sub(covered_end - first);
            let lead = first.saturating_sub((max_chars / 5).min(slack));
            lead.min(chars.len().saturating_sub(max_chars))
        }
        None => 0,
    };
    let end = (start + max_chars).min(chars.len());
    let body: String = chars[start..end].iter().collect();
    let body = WHITESPACE.replace_all(body.trim(), " ");

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&body);
    if end < chars.len() {
        out.push_str("...");
    }
    out
}

/// Char spans `[start, end)` in `chars` of every occurrence of every term,
/// sorted. Matching runs on the width- and case-folded text, the same folding
/// the tokenizer applies, and spans map back to the raw characters.
fn term_spans(chars: &[char], terms: &[String]) -> Vec<(usize, usize)> {
    let mut folded: Vec<char> = Vec::with_capacity(chars.len());
    let mut origin: Vec<usize> = Vec::with_capacity(chars.len());
    let mut buf = [0u8; 4];
    for (i, c) in chars.iter().enumerate() {
        for f in normalize(c.encode_utf8(&mut buf)).chars() {
            folded.push(f);
            origin.push(i);
        }
    }

    let mut spans = Vec::new();
    for term in terms.iter().filter(|t| !t.is_empty()) {
        let needle: Vec<char> = term.chars().collect();
        if needle.len() > folded.len() {
            continue;
        }
        for at in 0..=folded.len() - needle.len() {
            if folded[at..at + needle.len()] == needle[..] {
                spans.push((origin[at], origin[at + needle.len() - 1] + 1));
            }
        }
    }
    spans.sort_unstable();
    spans.dedup();
    spans
}

/// The `width`-char window holding the most hit starts; earliest wins ties.
/// Returns the first hit's start and how far the window's hits reach,
/// capped at the window end.
fn densest_window(hits: &[(usize, usize)], width: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    let mut j = 0;
    for (i, &(start, _)) in hits.iter().enumerate() {
        if j < i {
            j = i;
        }
        while j < hits.len() && hits[j].0 < start + width {
            j += 1;
        }
        let count = j - i;
        if best.map_or(true, |(c, _, _)| count > c) {
            let reach = hits[i..j].iter().map(|&(_, e)| e).max().unwrap_or(start).min(start + width);
            best = Some((count, start, reach));
        }
    }
    best.map(|(_, start, reach)| (start, reach))
}

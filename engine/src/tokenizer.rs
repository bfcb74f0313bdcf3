use crate::dictionary::CustomDictionary;
use crate::lexicon::{Lexicon, CUSTOM_TERM_TAG};
use jieba_rs::Jieba;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref JIEBA: Jieba = Jieba::new();
    static ref NOISE: Regex = Regex::new(r"[^\p{Han}\w\s]").expect("valid regex");
}

/// Width- and case-fold text (NFKC collapses full-width forms).
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Normalize and blank out everything that is not an ideograph, a word
/// character or whitespace.
pub(crate) fn clean(text: &str) -> String {
    NOISE.replace_all(&normalize(text), " ").into_owned()
}

pub fn is_chinese_char(c: char) -> bool { ('\u{4e00}'..='\u{9fff}').contains(&c) }

pub fn count_chinese_chars(text: &str) -> usize { text.chars().filter(|&c| is_chinese_char(c)).count() }

/// Plain statistical segmentation, no dictionary overrides and no filtering.
pub(crate) fn base_segments(cleaned: &str) -> Vec<&str> { JIEBA.cut(cleaned, true) }

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    word: String,
    tag: String,
}

/// Chinese tokenizer: custom-dictionary longest match, jieba for the gaps,
/// then POS and stop-word filtering.
///
/// Output depends only on the input text, the dictionary and the lexicon, so
/// documents and queries tokenized against the same generation agree.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    lexicon: Arc<Lexicon>,
    dictionary: Arc<CustomDictionary>,
}

impl Tokenizer {
    pub fn new(lexicon: Arc<Lexicon>, dictionary: Arc<CustomDictionary>) -> Self {
        Self { lexicon, dictionary }
    }

    pub fn dictionary(&self) -> &Arc<CustomDictionary> { &self.dictionary }

    pub fn lexicon(&self) -> &Arc<Lexicon> { &self.lexicon }

    /// Tokenize text into `(term, position)`; positions index the raw
    /// segmentation, so they have gaps where tokens were filtered.
    ///
    /// In document mode a custom term spanning several jieba words is followed
    /// by those words, so a query for any component still finds the document.
    /// With `is_query`, a query that POS filtering would empty falls back to
    /// stop-word filtering alone.
    pub fn tokenize(&self, text: &str, is_query: bool) -> Vec<(String, usize)> {
        let segments = self.segment(text, !is_query);
        let terms = self.filter(&segments, true);
        if terms.is_empty() && is_query {
            return self.filter(&segments, false);
        }
        terms
    }

    /// Just the terms, in order.
    pub fn terms(&self, text: &str, is_query: bool) -> Vec<String> {
        self.tokenize(text, is_query).into_iter().map(|(t, _)| t).collect()
    }

    fn filter(&self, segments: &[Segment], by_pos: bool) -> Vec<(String, usize)> {
        segments
            .iter()
            .enumerate()
            .filter_map(|(pos, seg)| {
                let word = seg.word.trim();
                self.accepts(word, by_pos.then_some(seg.tag.as_str())).then(|| (word.to_string(), pos))
            })
            .collect()
    }

    fn accepts(&self, word: &str, tag: Option<&str>) -> bool {
        if word.is_empty() || !word.chars().any(char::is_alphanumeric) {
            return false;
        }
        if word.chars().count() < self.lexicon.min_term_chars() {
            return false;
        }
        if let Some(tag) = tag {
            if !self.lexicon.keeps_pos(tag) {
                return false;
            }
        }
        !self.lexicon.is_stopword(word)
    }

    fn segment(&self, text: &str, with_components: bool) -> Vec<Segment> {
        let cleaned = clean(text);
        let bounds: Vec<usize> = cleaned.char_indices().map(|(b, _)| b).chain(std::iter::once(cleaned.len())).collect();
        let n_chars = bounds.len() - 1;

        let mut out = Vec::new();
        let mut gap_start = 0usize;
        let mut i = 0usize;
        while i < n_chars {
            match self.dictionary.longest_match(&cleaned, &bounds, i) {
                Some(len) => {
                    tag_gap(&cleaned[gap_start..bounds[i]], &mut out);
                    let end = bounds[i + len];
                    let term = &cleaned[bounds[i]..end];
                    out.push(Segment { word: term.to_string(), tag: CUSTOM_TERM_TAG.to_string() });
                    if with_components {
                        push_components(term, &self.dictionary, &mut out);
                    }
                    gap_start = end;
                    i += len;
                }
                None => i += 1,
            }
        }
        tag_gap(&cleaned[gap_start..], &mut out);
        out
    }
}

/// The jieba words of a custom term plus any shorter custom terms nested in it.
fn push_components(term: &str, dictionary: &CustomDictionary, out: &mut Vec<Segment>) {
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(term);
    let parts = JIEBA.tag(term, true);
    for t in &parts {
        if seen.insert(t.word) {
            out.push(Segment { word: t.word.to_string(), tag: t.tag.to_string() });
        }
    }
    for nested in dictionary.terms_within(term) {
        if seen.insert(nested) {
            out.push(Segment { word: nested.to_string(), tag: CUSTOM_TERM_TAG.to_string() });
        }
    }
}

fn tag_gap(gap: &str, out: &mut Vec<Segment>) {
    if gap.is_empty() {
        return;
    }
    for t in JIEBA.tag(gap, true) {
        out.push(Segment { word: t.word.to_string(), tag: t.tag.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer_with(terms: &[&str]) -> Tokenizer {
        let dict = CustomDictionary::new(terms.iter().map(|s| s.to_string()));
        Tokenizer::new(Arc::new(Lexicon::default()), Arc::new(dict))
    }

    #[test]
    fn normalizes_width_and_case() {
        assert_eq!(normalize("ＡＢＣ１２３"), "abc123");
        assert_eq!(normalize("Hello"), "hello");
    }

    #[test]
    fn counts_ideographs_only() {
        assert_eq!(count_chinese_chars("猪肝abc，汤圆"), 4);
    }

    #[test]
    fn custom_terms_are_atomic() {
        let t = tokenizer_with(&["铫子筒骨煨藕汤"]);
        let terms = t.terms("铫子筒骨煨藕汤产品标准", false);
        assert_eq!(terms.first().map(String::as_str), Some("铫子筒骨煨藕汤"));
    }

    #[test]
    fn longest_custom_match_wins() {
        let t = tokenizer_with(&["藕汤", "煨藕汤"]);
        let terms = t.terms("煨藕汤", true);
        assert_eq!(terms, vec!["煨藕汤".to_string()]);
    }

    #[test]
    fn documents_keep_components_of_custom_terms() {
        let t = tokenizer_with(&["猪肝制作方法"]);
        let doc = t.terms("猪肝制作方法很简单", false);
        assert_eq!(doc.first().map(String::as_str), Some("猪肝制作方法"));
        assert!(doc.contains(&"猪肝".to_string()));
        assert!(doc.contains(&"方法".to_string()));
        assert_eq!(t.terms("猪肝制作方法", true), vec!["猪肝制作方法".to_string()]);
    }

    #[test]
    fn drops_stopwords_and_punctuation() {
        let t = tokenizer_with(&["猪肝"]);
        let terms = t.terms("猪肝，的。！", false);
        assert_eq!(terms, vec!["猪肝".to_string()]);
    }

    #[test]
    fn positions_follow_segmentation() {
        let t = tokenizer_with(&["猪肝", "菜谱"]);
        let toks = t.tokenize("猪肝 菜谱", false);
        assert_eq!(toks.len(), 2);
        assert!(toks[0].1 < toks[1].1);
    }

    #[test]
    fn query_falls_back_when_pos_filter_empties_it() {
        let lexicon = Lexicon::new(Vec::<String>::new(), vec!["nothing".to_string()], 1);
        let t = Tokenizer::new(Arc::new(lexicon), Arc::new(CustomDictionary::new(vec!["猪肝".to_string()])));
        assert!(t.terms("猪肝", false).is_empty());
        assert_eq!(t.terms("猪肝", true), vec!["猪肝".to_string()]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let t = tokenizer_with(&[]);
        assert!(t.tokenize("", true).is_empty());
        assert!(t.tokenize("   ", false).is_empty());
    }
}

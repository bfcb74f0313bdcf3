//! Stop words and the part-of-speech allow-list used by the tokenizer.
//!
//! Both are corpus-tuned data rather than algorithm, so they can be replaced
//! by plain-text files (one entry per line, `#` starts a comment).

use crate::config::TokenizerConfig;
use crate::error::Result;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const DEFAULT_STOPWORDS: &[&str] = &[
    // function words and particles
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "这个", "那个",
    "上", "也", "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这", "那",
    "里", "个", "们", "能", "对", "时", "下", "大", "来", "为", "多", "么", "什", "又", "可", "还",
    "只", "从", "用", "他", "她", "它", "我们", "你们", "他们", "她们", "它们", "这些", "那些",
    "什么", "怎么", "为什么", "因为", "所以", "但是", "然后", "如果", "虽然", "而且", "或者",
    // ordinals and vague quantities
    "第一", "第二", "第三", "几个", "一些", "很多", "一点", "有些",
    // punctuation
    "，", "。", "！", "？", ";", "：", "“", "”", "‘", "’", "（", "）", "【", "】", "《", "》",
    "、", "　", "…", "—", "–", "·", "〈", "〉", "「", "」", "『", "』", "［", "］", "｛", "｝",
];

/// jieba tags kept after segmentation: nouns, verbs, adjectives, idioms,
/// abbreviations, latin words, numerals/measures and unknown words.
const DEFAULT_POS_TAGS: &[&str] = &[
    "n", "nr", "nrt", "ns", "nt", "nz", "v", "vd", "vn", "a", "ad", "an", "i", "l", "j", "eng", "m", "x",
];

/// POS tag given to custom-dictionary terms.
pub const CUSTOM_TERM_TAG: &str = "n";

#[derive(Debug, Clone)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    pos_tags: HashSet<String>,
    min_term_chars: usize,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(
            DEFAULT_STOPWORDS.iter().map(|s| s.to_string()),
            DEFAULT_POS_TAGS.iter().map(|s| s.to_string()),
            1,
        )
    }
}

impl Lexicon {
    pub fn new<S, P>(stopwords: S, pos_tags: P, min_term_chars: usize) -> Self
    where
        S: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
    {
        Self {
            stopwords: stopwords.into_iter().collect(),
            pos_tags: pos_tags.into_iter().collect(),
            min_term_chars: min_term_chars.max(1),
        }
    }

    pub fn from_config(cfg: &TokenizerConfig) -> Result<Self> {
        let stopwords = match &cfg.stopwords_file {
            Some(path) => read_list(path)?,
            None => DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        };
        let pos_tags = match &cfg.pos_tags_file {
            Some(path) => read_list(path)?,
            None => DEFAULT_POS_TAGS.iter().map(|s| s.to_string()).collect(),
        };
        tracing::debug!(stopwords = stopwords.len(), pos_tags = pos_tags.len(), "lexicon loaded");
        Ok(Self::new(stopwords, pos_tags, cfg.min_term_chars))
    }

    pub fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    pub fn keeps_pos(&self, tag: &str) -> bool { self.pos_tags.contains(tag) }

    pub fn min_term_chars(&self) -> usize { self.min_term_chars }

    pub fn stopword_count(&self) -> usize { self.stopwords.len() }
}

fn read_list(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lists() {
        let lex = Lexicon::default();
        assert!(lex.is_stopword("的"));
        assert!(lex.is_stopword("我们"));
        assert!(!lex.is_stopword("猪肝"));
        assert!(lex.keeps_pos("n"));
        assert!(lex.keeps_pos("vn"));
        assert!(!lex.keeps_pos("uj"));
        assert!(!lex.keeps_pos("p"));
    }

    #[test]
    fn lists_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let stop = dir.path().join("stop.txt");
        let pos = dir.path().join("pos.txt");
        fs::write(&stop, "# custom\n菜谱\n\n方法\n").unwrap();
        fs::write(&pos, "n\nv\n").unwrap();
        let cfg = TokenizerConfig { stopwords_file: Some(stop), pos_tags_file: Some(pos), min_term_chars: 2 };
        let lex = Lexicon::from_config(&cfg).unwrap();
        assert_eq!(lex.stopword_count(), 2);
        assert!(lex.is_stopword("菜谱"));
        assert!(!lex.is_stopword("的"));
        assert!(!lex.keeps_pos("a"));
        assert_eq!(lex.min_term_chars(), 2);
    }
}

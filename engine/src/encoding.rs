//! Ordered-fallback decoding for Chinese text files.

use crate::error::EncodingError;
use encoding_rs::Encoding;
use std::path::Path;

/// Encodings tried in order. `gb2312` resolves to the GBK decoder, which is
/// a superset of it.
pub const CANDIDATE_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb2312", "big5"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode `bytes` with the first candidate encoding that accepts them without
/// replacement characters.
pub fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<Decoded, EncodingError> {
    for &label in CANDIDATE_ENCODINGS {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else { continue };
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            let text: &str = &text;
            let text = text.strip_prefix('\u{feff}').unwrap_or(text).to_string();
            return Ok(Decoded { text, encoding: label });
        }
    }
    Err(EncodingError { path: path.to_path_buf(), tried: CANDIDATE_ENCODINGS.to_vec() })
}

/// Read a file and decode it. Unreadable files surface as an `EncodingError`
/// too; the caller skips them either way.
pub fn read_document(path: &Path) -> Result<Decoded, EncodingError> {
    match std::fs::read(path) {
        Ok(bytes) => decode_bytes(path, &bytes),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read document");
            Err(EncodingError { path: path.to_path_buf(), tried: Vec::new() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_first() {
        let d = decode_bytes(Path::new("a.txt"), "猪肝制作方法".as_bytes()).unwrap();
        assert_eq!(d.encoding, "utf-8");
        assert_eq!(d.text, "猪肝制作方法");
    }

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("汤圆".as_bytes());
        let d = decode_bytes(Path::new("a.txt"), &bytes).unwrap();
        assert_eq!(d.text, "汤圆");
    }

    #[test]
    fn falls_back_to_gbk() {
        let (bytes, _, had_errors) = encoding_rs::GBK.encode("儿童套餐安全标准");
        assert!(!had_errors);
        let d = decode_bytes(Path::new("a.txt"), &bytes).unwrap();
        assert_eq!(d.encoding, "gbk");
        assert_eq!(d.text, "儿童套餐安全标准");
    }

    #[test]
    fn undecodable_bytes_fail() {
        // 0xFF is not a valid byte in any candidate encoding.
        let err = decode_bytes(Path::new("bad.txt"), &[0xFF, 0xFF, 0x80]).unwrap_err();
        assert_eq!(err.tried, CANDIDATE_ENCODINGS.to_vec());
    }
}

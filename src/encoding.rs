//! Charset handling for saved pages.
//!
//! Live captures come out of the browser as UTF-8. Offline input (a saved
//! page piped into `reconstruct_stdin`, fixtures) can be anything, so it is
//! decoded here before parsing. Precedence: byte-order mark, then an HTTP
//! `Content-Type` hint, then a `<meta>` declaration in the first 1024 bytes,
//! then UTF-8.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use tracing::debug;

/// `charset=` inside a `<meta>` tag, either form.
#[allow(clippy::expect_used)]
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b[^>]*?charset\s*=\s*["']?\s*([A-Za-z0-9_.:-]+)"#).expect("META_CHARSET regex")
});

/// `charset=` parameter of a `Content-Type` value.
#[allow(clippy::expect_used)]
static HEADER_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_.:-]+)"#).expect("HEADER_CHARSET regex"));

const SNIFF_LIMIT: usize = 1024;

/// Where the detected encoding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    ByteOrderMark,
    ContentType,
    Meta,
    Default,
}

/// Pick the encoding for `html`.
#[must_use]
pub fn detect_encoding(html: &[u8], content_type: Option<&str>) -> (&'static Encoding, EncodingSource) {
    if let Some((encoding, _)) = Encoding::for_bom(html) {
        return (encoding, EncodingSource::ByteOrderMark);
    }
    if let Some(encoding) = content_type.and_then(|ct| label_from(&HEADER_CHARSET, ct)) {
        return (encoding, EncodingSource::ContentType);
    }
    let head = String::from_utf8_lossy(&html[..html.len().min(SNIFF_LIMIT)]);
    if let Some(encoding) = label_from(&META_CHARSET, &head) {
        return (encoding, EncodingSource::Meta);
    }
    (UTF_8, EncodingSource::Default)
}

fn label_from(pattern: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = pattern.captures(haystack)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

/// Decode `html` to UTF-8. Malformed sequences become U+FFFD.
#[must_use]
pub fn decode_html(html: &[u8], content_type: Option<&str>) -> String {
    let (encoding, source) = detect_encoding(html, content_type);
    debug!(encoding = encoding.name(), ?source, "decoding input");
    let (decoded, _, had_errors) = encoding.decode(html);
    if had_errors {
        debug!(encoding = encoding.name(), "input had malformed sequences");
    }
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_charset_is_honored() {
        let html = b"<html><head><meta charset=\"ISO-8859-1\"></head><body>Caf\xE9 cr\xE8me</body></html>";
        let (encoding, source) = detect_encoding(html, None);
        assert_eq!(encoding.name(), "windows-1252");
        assert_eq!(source, EncodingSource::Meta);
        assert!(decode_html(html, None).contains("Café crème"));
    }

    #[test]
    fn http_equiv_form_is_honored() {
        let html = br#"<meta http-equiv="Content-Type" content="text/html; charset=Shift_JIS"><p>x</p>"#;
        assert_eq!(detect_encoding(html, None).0.name(), "Shift_JIS");
    }

    #[test]
    fn header_beats_meta() {
        let html = b"<meta charset=\"utf-8\"><p>\x93quoted\x94</p>";
        let (encoding, source) = detect_encoding(html, Some("text/html; charset=windows-1252"));
        assert_eq!(encoding.name(), "windows-1252");
        assert_eq!(source, EncodingSource::ContentType);
        assert!(decode_html(html, Some("text/html; charset=windows-1252")).contains("\u{201C}quoted\u{201D}"));
    }

    #[test]
    fn bom_beats_everything() {
        let mut html = vec![0xEF, 0xBB, 0xBF];
        html.extend_from_slice(b"<meta charset=\"windows-1252\"><p>\xC3\xA9t\xC3\xA9</p>");
        let (encoding, source) = detect_encoding(&html, Some("text/html; charset=koi8-r"));
        assert_eq!(encoding, UTF_8);
        assert_eq!(source, EncodingSource::ByteOrderMark);
        let text = decode_html(&html, None);
        assert!(text.contains("été"));
        assert!(!text.starts_with('\u{FEFF}'));
    }

    #[test]
    fn unknown_labels_fall_back_to_utf8() {
        let html = b"<meta charset=\"no-such-charset\"><p>ok \xFF</p>";
        assert_eq!(detect_encoding(html, None), (UTF_8, EncodingSource::Default));
        let text = decode_html(html, None);
        assert!(text.contains("ok \u{FFFD}"));
    }
}

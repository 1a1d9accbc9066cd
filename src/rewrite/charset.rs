//! Character encoding of upstream documents.
//!
//! # Detection order
//! 1. `charset` parameter of the upstream Content-Type
//! 2. Byte order mark (applied by [`Encoding::decode`] itself)
//! 3. `<meta charset>` or `<meta http-equiv content="...; charset=...">` in
//!    the first 1024 bytes
//! 4. UTF-8 when the bytes are valid UTF-8, windows-1252 otherwise
//!
//! The document is re-encoded with the encoding it was decoded with, so
//! bytes the rewrite does not touch come back unchanged.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};

/// How far into the document the `<meta>` prescan looks.
const PRESCAN_BYTES: usize = 1024;

/// Encoding named by the `charset` parameter of a Content-Type value.
pub fn from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(|c| c == '"' || c == '\'').as_bytes())
    })
}

/// Encoding declared by a `<meta>` element near the start of the document.
pub fn prescan(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = bytes[..bytes.len().min(PRESCAN_BYTES)].to_ascii_lowercase();
    let mut rest = head.as_slice();

    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        if let Some(encoding) = charset_in_tag(&tag[..end]) {
            return Some(meta_override(encoding));
        }
        rest = &tag[end..];
    }
    None
}

/// The encoding to decode `bytes` with. A byte order mark, when present,
/// still wins inside [`Encoding::decode`].
pub fn detect(content_type: Option<&str>, bytes: &[u8]) -> &'static Encoding {
    if let Some(encoding) = content_type.and_then(from_content_type) {
        return encoding;
    }
    if let Some(encoding) = prescan(bytes) {
        return encoding;
    }
    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        WINDOWS_1252
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn charset_in_tag(tag: &[u8]) -> Option<&'static Encoding> {
    let at = find(tag, b"charset")?;
    let mut value = &tag[at + b"charset".len()..];

    value = value.trim_ascii_start();
    value = value.strip_prefix(b"=")?;
    value = value.trim_ascii_start();
    if let Some(quoted) = value.strip_prefix(b"\"").or_else(|| value.strip_prefix(b"'")) {
        value = quoted;
    }

    let end = value
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(value.len());
    Encoding::for_label(&value[..end])
}

/// A document cannot describe itself as UTF-16 in ASCII-compatible bytes.
fn meta_override(encoding: &'static Encoding) -> &'static Encoding {
    if encoding == UTF_16BE || encoding == UTF_16LE {
        UTF_8
    } else if encoding == X_USER_DEFINED {
        WINDOWS_1252
    } else {
        encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{SHIFT_JIS, WINDOWS_1251};

    #[test]
    fn reads_content_type_parameter() {
        assert_eq!(from_content_type("text/html; charset=ISO-8859-1"), Some(WINDOWS_1252));
        assert_eq!(from_content_type("text/html;charset=\"Shift_JIS\""), Some(SHIFT_JIS));
        assert_eq!(from_content_type("text/html"), None);
        assert_eq!(from_content_type("text/html; charset=bogus"), None);
    }

    #[test]
    fn prescans_meta_declarations() {
        assert_eq!(prescan(b"<html><head><meta charset=\"windows-1251\">"), Some(WINDOWS_1251));
        assert_eq!(prescan(b"<META CHARSET=utf-8>"), Some(UTF_8));
        assert_eq!(
            prescan(b"<meta name=\"x\"><meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\">"),
            Some(SHIFT_JIS)
        );
        assert_eq!(prescan(b"<meta charset=\"utf-16\">"), Some(UTF_8));
        assert_eq!(prescan(b"<meta name=\"viewport\" content=\"width=device-width\">"), None);
    }

    #[test]
    fn prescan_stops_at_limit() {
        let mut source = vec![b' '; PRESCAN_BYTES];
        source.extend_from_slice(b"<meta charset=\"windows-1251\">");
        assert_eq!(prescan(&source), None);
    }

    #[test]
    fn header_wins_over_meta() {
        let bytes = b"<meta charset=\"windows-1251\">";
        assert_eq!(detect(Some("text/html; charset=shift_jis"), bytes), SHIFT_JIS);
        assert_eq!(detect(Some("text/html"), bytes), WINDOWS_1251);
    }

    #[test]
    fn undeclared_documents_fall_back_by_validity() {
        assert_eq!(detect(None, "<p>caf\u{e9}</p>".as_bytes()), UTF_8);
        assert_eq!(detect(None, b"<p>caf\xe9</p>"), WINDOWS_1252);
    }
}

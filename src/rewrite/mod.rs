//! Document rewrite engine.
//!
//! # Data Flow
//! ```text
//! upstream HTML bytes (fully buffered)
//!     → charset.rs (pick the document encoding, decode)
//!     → document.rs (parse into owned DocumentNode tree)
//!     → rules.rs (rewrite links, clear handlers, drop <script>)
//!     → serialize.rs (tree back to HTML, source order)
//!     → re-encode with the source encoding
//!     → downstream body
//! ```
//!
//! # Design Decisions
//! - The tree is request-scoped: built, mutated once, serialized once
//! - Attribute rewriting is a fixed allow-list; no CSS `url()`, no meta refresh
//! - A bad link never aborts the pass; it is left as it was
//! - Characters the source encoding cannot represent are written as numeric
//!   character references

pub mod charset;
pub mod document;
pub mod rules;
pub mod serialize;

use std::io;

use encoding_rs::Encoding;
use url::Url;

pub use document::{Attribute, DocumentNode, NodeKind};
pub use rules::{remove_elements, rewrite_document, rewrite_link, RewriteStats};
pub use serialize::serialize;

/// A rewritten document, encoded and ready to send.
#[derive(Debug)]
pub struct RewrittenHtml {
    pub bytes: Vec<u8>,
    /// Encoding the upstream bytes were decoded with.
    pub source_encoding: &'static Encoding,
    /// Encoding of `bytes`. Differs from the source only for encodings that
    /// cannot be written, such as UTF-16.
    pub encoding: &'static Encoding,
    pub stats: RewriteStats,
}

/// Parse, rewrite and re-serialize an HTML document whose address is `base`.
///
/// `content_type` is the upstream Content-Type value, consulted for the
/// document charset.
pub fn rewrite_html(source: &[u8], content_type: Option<&str>, base: &Url) -> io::Result<RewrittenHtml> {
    let (text, source_encoding, malformed) = charset::detect(content_type, source).decode(source);
    if malformed {
        tracing::debug!(encoding = source_encoding.name(), "Document contains malformed byte sequences");
    }

    let mut document = DocumentNode::parse(&text);
    let stats = rewrite_document(&mut document, base);
    let html = serialize(&document)?;

    let (bytes, encoding, unmappable) = source_encoding.encode(&html);
    if unmappable {
        tracing::debug!(encoding = encoding.name(), "Unmappable characters written as references");
    }

    Ok(RewrittenHtml {
        bytes: bytes.into_owned(),
        source_encoding,
        encoding,
        stats,
    })
}

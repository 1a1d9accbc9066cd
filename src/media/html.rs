//! `text/html` handler.

use axum::body::Body;
use encoding_rs::Encoding;
use url::Url;

use crate::error::ProxyError;
use crate::media::{normalize_media_type, Transformed, TEXT_HTML};
use crate::rewrite::{self, charset, RewrittenHtml};

/// Buffers an HTML body up to a size bound and runs the rewrite engine on it.
#[derive(Debug, Clone)]
pub struct HtmlHandler {
    max_document_bytes: usize,
}

impl HtmlHandler {
    pub fn new(max_document_bytes: usize) -> Self {
        Self { max_document_bytes }
    }

    /// Read the whole body, rewrite it, and return the new body.
    ///
    /// The body is read to the end before any output exists, so a read error
    /// or an oversized document surfaces as an error instead of a truncated page.
    pub async fn transform(
        &self,
        body: Body,
        content_type: Option<&str>,
        base: &Url,
    ) -> Result<Transformed, ProxyError> {
        let bytes = axum::body::to_bytes(body, self.max_document_bytes)
            .await
            .map_err(|e| {
                tracing::warn!(
                    base = %base,
                    max_document_bytes = self.max_document_bytes,
                    error = %e,
                    "Document unreadable or over limit"
                );
                ProxyError::ParseFailure(e.to_string())
            })?;

        let rewritten = rewrite::rewrite_html(&bytes, content_type, base)
            .map_err(|e| ProxyError::ParseFailure(e.to_string()))?;

        tracing::debug!(
            base = %base,
            input_bytes = bytes.len(),
            output_bytes = rewritten.bytes.len(),
            encoding = rewritten.encoding.name(),
            links_rewritten = rewritten.stats.links_rewritten,
            links_unresolved = rewritten.stats.links_unresolved,
            attributes_cleared = rewritten.stats.attributes_cleared,
            elements_removed = rewritten.stats.elements_removed,
            "Document rewritten"
        );

        let content_type = content_type_override(content_type, &rewritten);
        Ok(Transformed {
            body: Body::from(rewritten.bytes),
            content_type,
        })
    }
}

/// A Content-Type to send instead of the upstream one, when the upstream
/// value would misdescribe the rewritten bytes.
fn content_type_override(content_type: Option<&str>, rewritten: &RewrittenHtml) -> Option<String> {
    let declared: Option<&'static Encoding> = content_type.and_then(charset::from_content_type);
    let mislabelled = declared.is_some_and(|declared| declared != rewritten.encoding);
    if !mislabelled && rewritten.source_encoding == rewritten.encoding {
        return None;
    }

    let media_type = content_type
        .map(normalize_media_type)
        .filter(|media_type| !media_type.is_empty())
        .unwrap_or_else(|| TEXT_HTML.to_string());
    Some(format!("{media_type}; charset={}", rewritten.encoding.name()))
}

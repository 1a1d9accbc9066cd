//! Media dispatch table.
//!
//! # Data Flow
//! ```text
//! upstream Content-Type ("text/html; charset=utf-8")
//!     → normalize_media_type ("text/html")
//!     → MediaTable lookup
//!         hit  → MediaHandler::transform (buffer, rewrite, new body and,
//!                when the charset changed, a new Content-Type)
//!         miss → pass-through (upstream body streamed unchanged)
//! ```
//!
//! # Design Decisions
//! - Built once at startup, immutable afterwards, shared through `Arc`
//! - Handlers are a closed set of variants, pass-through is the implicit default
//! - A handler returns the complete body or an error before anything is sent

pub mod html;

use std::collections::HashMap;

use axum::body::Body;
use url::Url;

use crate::config::LimitsConfig;
use crate::error::ProxyError;

pub use html::HtmlHandler;

/// Media type served by [`HtmlHandler`].
pub const TEXT_HTML: &str = "text/html";

/// Strip parameters and whitespace from a Content-Type value and lower-case it.
pub fn normalize_media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// A registered body transform.
#[derive(Debug, Clone)]
pub enum MediaHandler {
    Html(HtmlHandler),
}

impl MediaHandler {
    /// Consume the upstream body and produce the downstream one.
    pub async fn transform(
        &self,
        body: Body,
        content_type: Option<&str>,
        base: &Url,
    ) -> Result<Transformed, ProxyError> {
        match self {
            MediaHandler::Html(handler) => handler.transform(body, content_type, base).await,
        }
    }
}

/// A body produced by a handler.
pub struct Transformed {
    pub body: Body,
    /// Replacement Content-Type; `None` keeps the upstream value.
    pub content_type: Option<String>,
}

/// Outcome of [`MediaTable::dispatch`].
pub enum Dispatched {
    /// A handler produced a new body.
    Transformed(Transformed),
    /// No handler matched; the upstream body is forwarded as is.
    PassThrough(Body),
}

impl Dispatched {
    /// Whether a registered handler took the body.
    pub fn handled(&self) -> bool {
        matches!(self, Dispatched::Transformed(_))
    }

    /// The downstream body and, if the handler changed it, the Content-Type.
    pub fn into_parts(self) -> (Body, Option<String>) {
        match self {
            Dispatched::Transformed(transformed) => (transformed.body, transformed.content_type),
            Dispatched::PassThrough(body) => (body, None),
        }
    }
}

/// Registry from normalized media type to handler.
#[derive(Debug, Clone, Default)]
pub struct MediaTable {
    handlers: HashMap<String, MediaHandler>,
}

impl MediaTable {
    /// An empty table: every body passes through.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table used by the proxy: HTML is rewritten, everything else passes through.
    pub fn standard(limits: &LimitsConfig) -> Self {
        Self::new().with_handler(
            TEXT_HTML,
            MediaHandler::Html(HtmlHandler::new(limits.max_document_bytes)),
        )
    }

    /// Register `handler` for `media_type`. Returns `self` for chaining.
    pub fn with_handler(mut self, media_type: &str, handler: MediaHandler) -> Self {
        self.handlers.insert(normalize_media_type(media_type), handler);
        self
    }

    /// Handler registered for a raw Content-Type value, if any.
    pub fn lookup(&self, content_type: Option<&str>) -> Option<&MediaHandler> {
        let media_type = normalize_media_type(content_type?);
        self.handlers.get(&media_type)
    }

    /// Route `body` through the handler for `content_type`, or pass it through.
    pub async fn dispatch(
        &self,
        content_type: Option<&str>,
        body: Body,
        base: &Url,
    ) -> Result<Dispatched, ProxyError> {
        match self.lookup(content_type) {
            Some(handler) => {
                let transformed = handler.transform(body, content_type, base).await?;
                Ok(Dispatched::Transformed(transformed))
            }
            None => Ok(Dispatched::PassThrough(body)),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

//! Header transform pipeline.
//!
//! # Responsibilities
//! - Copy an explicit allow-list of headers across the upstream boundary
//! - Rewrite `Location` so redirects stay inside the proxy path space
//!
//! # Design Decisions
//! - Drop by default: hop-by-hop, cookie and caching headers never cross
//! - Only the first value of a header is copied
//! - An absent or empty source header is a no-op, never "set to empty"

use axum::http::{
    header::{ACCEPT, ACCEPT_CHARSET, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION},
    HeaderMap, HeaderName, HeaderValue,
};
use url::Url;

use crate::routing::codec;

/// How a copied value is changed on the way across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTransform {
    /// Copy the value unchanged.
    Identity,
    /// Resolve against the target URL and encode as a proxy-local path.
    RewriteLocation,
}

impl HeaderTransform {
    /// Apply the transform. `None` means the header is not written.
    pub fn apply(&self, value: &str, target: &Url) -> Option<String> {
        match self {
            HeaderTransform::Identity => Some(value.to_string()),
            HeaderTransform::RewriteLocation => rewrite_location(value, target),
        }
    }
}

/// A header that may cross the boundary, and how.
#[derive(Debug, Clone)]
pub struct HeaderRule {
    pub name: HeaderName,
    pub transform: HeaderTransform,
}

impl HeaderRule {
    pub const fn identity(name: HeaderName) -> Self {
        Self {
            name,
            transform: HeaderTransform::Identity,
        }
    }

    pub const fn new(name: HeaderName, transform: HeaderTransform) -> Self {
        Self { name, transform }
    }
}

/// Headers copied from the client request to the upstream request.
pub const REQUEST_RULES: [HeaderRule; 4] = [
    HeaderRule::identity(ACCEPT),
    HeaderRule::identity(ACCEPT_CHARSET),
    HeaderRule::identity(ACCEPT_LANGUAGE),
    HeaderRule::identity(CONTENT_TYPE),
];

/// Headers copied from the upstream response to the client response.
pub const RESPONSE_RULES: [HeaderRule; 2] = [
    HeaderRule::identity(CONTENT_TYPE),
    HeaderRule::new(LOCATION, HeaderTransform::RewriteLocation),
];

/// Copy one header from `src` to `dst`, transforming its value.
///
/// Returns true when a value was written.
pub fn copy_header(
    dst: &mut HeaderMap,
    src: &HeaderMap,
    name: &HeaderName,
    transform: HeaderTransform,
    target: &Url,
) -> bool {
    let Some(value) = src.get(name) else {
        return false;
    };
    let Ok(value) = value.to_str() else {
        tracing::debug!(header = %name, "Dropping non-text header value");
        return false;
    };
    if value.is_empty() {
        return false;
    }

    let Some(transformed) = transform.apply(value, target) else {
        return false;
    };
    match HeaderValue::from_str(&transformed) {
        Ok(value) => {
            dst.append(name.clone(), value);
            true
        }
        Err(e) => {
            tracing::debug!(header = %name, error = %e, "Dropping unrepresentable header value");
            false
        }
    }
}

/// Run every rule in `rules` from `src` into `dst`.
pub fn apply_rules(dst: &mut HeaderMap, src: &HeaderMap, rules: &[HeaderRule], target: &Url) {
    for rule in rules {
        copy_header(dst, src, &rule.name, rule.transform, target);
    }
}

/// Resolve a `Location` value against the target and map it into the proxy.
fn rewrite_location(value: &str, target: &Url) -> Option<String> {
    match target.join(value.trim()) {
        Ok(location) => Some(codec::collapse(&location)),
        Err(e) => {
            tracing::warn!(location = %value, target = %target, error = %e, "Dropping unresolvable Location header");
            None
        }
    }
}

//! Request-boundary errors.
//!
//! Every variant is detected before the first byte of the downstream response
//! is written, so each one converts into a complete error response.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routing::CodecError;

/// Errors that end a proxied request in the `Failed` state.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound path does not map to an upstream URL.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The upstream request could not be built from the inbound one.
    #[error("invalid upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    /// Transport failure talking to the upstream server.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] hyper_util::client::legacy::Error),

    /// The upstream document could not be read into memory for rewriting.
    #[error("failed to parse document: {0}")]
    ParseFailure(String),
}

impl ProxyError {
    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("err: {self}\n"),
        )
            .into_response()
    }
}

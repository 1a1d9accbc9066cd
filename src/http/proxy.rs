//! Per-request proxy orchestration.
//!
//! # State Machine
//! ```text
//! Start
//!   → decode path            (failure → Failed, 500)
//!   → build upstream request, copy request headers
//!   → send upstream          (transport failure → Failed, 502)
//!   → copy response headers
//!   → dispatch body by media type
//!                            (document unreadable → Failed, 500)
//!   → Responded              (upstream status passed through)
//! ```
//!
//! # Design Decisions
//! - One upstream attempt per client request, no retries
//! - 4xx/5xx from upstream are responses, not failures
//! - The upstream call lives inside the request future: when the client goes
//!   away the future is dropped and the upstream request with it
//! - No deadline of its own; the server's timeout layer bounds every request

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::Response,
};
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;
use crate::http::headers::{apply_rules, REQUEST_RULES, RESPONSE_RULES};
use crate::media::MediaTable;
use crate::routing::codec;

/// HTTP/HTTPS client used for every upstream call.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the upstream client. Plain and TLS targets share one pool.
pub fn build_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

    Client::builder(TokioExecutor::new()).build(HttpsConnector::new_with_connector(http))
}

/// Forwards decoded requests upstream and maps the responses back.
#[derive(Clone)]
pub struct Proxy {
    client: UpstreamClient,
    media: Arc<MediaTable>,
}

impl Proxy {
    pub fn new(client: UpstreamClient, media: Arc<MediaTable>) -> Self {
        Self { client, media }
    }

    /// Decode the inbound path and forward the request.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = codec::decode(path)?;
        self.forward(&target, request).await
    }

    /// Forward `request` to `target` and build the downstream response.
    pub async fn forward(&self, target: &Url, request: Request<Body>) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();
        let upstream_request = upstream_request(&parts, body, target)?;

        let upstream_response = self.client.request(upstream_request).await.map_err(|e| {
            tracing::error!(target = %target, error = %e, "Upstream error");
            ProxyError::UpstreamUnreachable(e)
        })?;

        let (upstream, body) = upstream_response.into_parts();
        let mut headers = HeaderMap::new();
        apply_rules(&mut headers, &upstream.headers, &RESPONSE_RULES, target);

        let body = Body::new(body);
        let body = if carries_body(&parts.method, upstream.status) {
            let content_type = upstream
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let dispatched = self.media.dispatch(content_type, body, target).await?;
            tracing::debug!(
                target = %target,
                content_type = content_type.unwrap_or("none"),
                rewritten = dispatched.handled(),
                "Body dispatched"
            );

            let (body, replacement) = dispatched.into_parts();
            if let Some(replacement) = replacement {
                match HeaderValue::from_str(&replacement) {
                    Ok(value) => {
                        headers.insert(CONTENT_TYPE, value);
                    }
                    Err(e) => tracing::warn!(content_type = %replacement, error = %e, "Keeping upstream Content-Type"),
                }
            }
            body
        } else {
            body
        };

        let mut response = Response::new(body);
        *response.status_mut() = upstream.status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Build the upstream request: same method and body, allow-listed headers.
fn upstream_request(parts: &Parts, body: Body, target: &Url) -> Result<Request<Body>, ProxyError> {
    let mut url = target.clone();
    url.set_fragment(None);

    let mut builder = Request::builder().method(parts.method.clone()).uri(url.as_str());
    if let Some(headers) = builder.headers_mut() {
        apply_rules(headers, &parts.headers, &REQUEST_RULES, target);
    }
    Ok(builder.body(body)?)
}

/// Whether a response to `method` with `status` has a body worth dispatching.
fn carries_body(method: &Method, status: StatusCode) -> bool {
    method != Method::HEAD
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
        && !status.is_informational()
}

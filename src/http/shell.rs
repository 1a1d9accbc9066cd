//! Landing pages around the proxy.
//!
//! `/` and `/@about` describe the service, `/redirect` turns a submitted URL
//! into a proxy-local path, and any other path is assumed to be a bare
//! `host/path` for plain HTTP.

use axum::{
    extract::Form,
    http::{header::LOCATION, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use url::Url;

use crate::routing::codec;

pub const ABOUT_PATH: &str = "/@about";

const ABOUT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>rewrite-proxy</title></head>
<body>
<h1>rewrite-proxy</h1>
<p>Pages fetched through this service have their links rewritten to stay on the
proxy. Scripts and inline event handlers are removed.</p>
<form method="post" action="/redirect">
<input type="text" name="url" placeholder="https://example.com/" autofocus>
<button type="submit">Go</button>
</form>
</body>
</html>
"#;

fn moved_permanently(location: &str) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location.to_string())]).into_response()
}

/// `GET /`
pub async fn index() -> Response {
    moved_permanently(ABOUT_PATH)
}

/// `GET /@about`
pub async fn about() -> Html<&'static str> {
    Html(ABOUT_PAGE)
}

#[derive(Debug, Deserialize)]
pub struct RedirectForm {
    pub url: String,
}

/// `POST /redirect`
pub async fn redirect(Form(form): Form<RedirectForm>) -> Response {
    match form_target(&form.url) {
        Some(path) => Redirect::to(&path).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            format!("err: cannot proxy `{}`\n", form.url),
        )
            .into_response(),
    }
}

/// Any path without a scheme marker, e.g. `/example.com/page`.
pub async fn fallback(uri: Uri) -> Response {
    if uri.path() == "/favicon.ico" {
        return StatusCode::NOT_FOUND.into_response();
    }
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    moved_permanently(&format!("/http{path_and_query}"))
}

/// Map a user-typed URL to its proxy path. A missing scheme means `http`.
pub fn form_target(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("http://{raw}")).ok()?
    };
    codec::encode(&url).ok()
}

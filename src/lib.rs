//! Link-rewriting web proxy library.
//!
//! Requests to `/http/<host>/<path>` and `/https/<host>/<path>` are forwarded
//! upstream; HTML responses come back with every link pointing at the proxy
//! and with scripts and inline handlers removed.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod media;
pub mod observability;
pub mod rewrite;
pub mod routing;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use media::MediaTable;

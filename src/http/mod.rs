//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, route table)
//!     → request.rs (request ID for logging)
//!     → proxy.rs (decode target, forward upstream, map response)
//!         ↔ headers.rs (allow-listed header copy in both directions)
//!         → media dispatch (rewrite HTML / pass through)
//!     → Send to client
//!
//! Non-proxy paths:
//!     → shell.rs (landing page, redirect form, bare-host redirect)
//! ```

pub mod headers;
pub mod proxy;
pub mod request;
pub mod server;
pub mod shell;

pub use headers::{apply_rules, copy_header, HeaderRule, HeaderTransform, REQUEST_RULES, RESPONSE_RULES};
pub use proxy::{build_client, Proxy, UpstreamClient};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with key/value fields (request_id, target, status)
//!     → tower_http::trace spans per inbound request
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, filtered by level)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every proxy log line
//! - Per-link resolution failures log at debug, request failures at warn

pub mod logging;

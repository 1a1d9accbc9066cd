//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path + query (/https/example.com/a?b=c)
//!     → codec.rs (decode)
//!     → TargetURL (https://example.com/a?b=c)
//!
//! Absolute link found in a document or Location header
//!     → codec.rs (encode)
//!     → proxy-local path
//! ```
//!
//! # Design Decisions
//! - The proxy path space is the only route table: the URL is the route
//! - Stateless, pure functions; nothing is compiled at startup

pub mod codec;

pub use codec::{decode, encode, CodecError};

//! Match feed access.
//!
//! This crate provides:
//! - `EventFeed` trait for pluggable match sources
//! - `HttpEventFeed`, a JSON-over-HTTP implementation with a bounded timeout
//! - `parse_document` for decoding a raw feed document into events

pub mod document;
pub mod http;
pub mod traits;

pub use document::parse_document;
pub use http::HttpEventFeed;
pub use traits::{EventFeed, FeedError};

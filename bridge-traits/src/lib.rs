//! # Host Bridge Traits
//!
//! Platform abstraction traits the core depends on but does not implement.
//!
//! ## Overview
//!
//! The lyrics and artwork engine never talks to the network, a database or a
//! log pipeline directly. It goes through the contracts in this crate, and
//! each host ships adapters for them (`bridge-desktop` for desktop builds,
//! in-memory fakes in tests).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by remote lyrics/artwork providers
//! - [`KeyValueStore`](storage::KeyValueStore) - Flat string store backing the entity cache
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits report failures through [`BridgeError`](error::BridgeError).
//! Adapters should convert platform errors into it and keep the message
//! actionable (which key, which URL, which status code).
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; resolvers hold adapters behind `Arc` and
//! call them from spawned tasks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
//!
//! async fn search(client: &dyn HttpClient) -> bridge_traits::error::Result<serde_json::Value> {
//!     let request = HttpRequest::new(HttpMethod::Get, "https://lrclib.net/api/search")
//!         .query("track_name", "Imagine")
//!         .query("artist_name", "John Lennon");
//!     client.execute(request).await?.json()
//! }
//! ```

pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::KeyValueStore;

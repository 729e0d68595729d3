//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with retry and backoff
//! - `KeyValueStore` using a SQLite table (`SqliteKeyValueStore`)
//! - `KeyValueStore` held in process memory (`MemoryKeyValueStore`), used
//!   when no cache path is configured and in tests
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteKeyValueStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http = ReqwestHttpClient::new()?;
//!     let store = SqliteKeyValueStore::new("/var/cache/lyricscope/entity-cache.db".into()).await?;
//!     // Hand both to the core service
//!     Ok(())
//! }
//! ```

mod http;
mod kv_store;
mod memory_store;

pub use http::ReqwestHttpClient;
pub use kv_store::SqliteKeyValueStore;
pub use memory_store::MemoryKeyValueStore;

//! # Metadata Resolution
//!
//! Resolves lyrics and artwork for the song that is currently playing.
//!
//! ## Overview
//!
//! - [`FallbackResolver`] tries an ordered list of providers until one yields
//!   a result, checking the [`EntityCache`] first
//! - [`RequestCoordinator`] keeps one request in flight per resolver and
//!   suppresses outcomes of superseded requests
//! - [`Provider`] is the contract for lyrics and artwork sources
//! - [`select_best_match`] ranks lyrics search results
//! - Remote providers (LRCLib, iTunes) are feature-gated

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod kind;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod song;

pub use cache::{ArtworkVariant, CacheKey, EntityCache, EntityKind, KeyValueEntityCache};
pub use coordinator::{RequestCoordinator, RequestToken};
pub use error::{MetadataError, Result};
pub use kind::{ArtworkKind, LyricsKind, ResolutionKind};
pub use provider::{ArtworkProvider, LyricsProvider, Provider};
pub use registry::{ProviderLoader, ProviderRegistry};
pub use resolver::{ArtworkResolver, FallbackResolver, LyricsResolver, Resolution};
pub use selector::{select_best_match, CandidateTrack, LyricsRichness};
pub use song::{Song, SongIdentity};

//! Workspace umbrella crate.
//!
//! Exposes the feature flags that map onto the individual workspace crates
//! (`core-service`, `core-metadata`) so host applications can depend on
//! `lyricscope-workspace` and pick providers without wiring each crate.

#[cfg(any(feature = "desktop-shims", feature = "lyrics", feature = "artwork-remote"))]
pub use core_metadata as metadata;
#[cfg(any(feature = "desktop-shims", feature = "lyrics", feature = "artwork-remote"))]
pub use core_service as service;

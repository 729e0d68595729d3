//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the lyrics/artwork core:
//! - Logging and tracing setup
//! - Configuration
//! - Event bus carrying resolution outcomes and now-playing changes

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};

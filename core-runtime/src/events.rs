//! # Event Bus System
//!
//! Typed publish/subscribe channel connecting the resolution engine to its
//! observers, built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: one enum per domain (lyrics, artwork, playback, cache)
//!   wrapped in [`CoreEvent`]
//! - **EventBus**: cloneable handle; every clone publishes into the same channel
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! ```text
//! ┌────────────────┐  emit   ┌──────────┐  subscribe  ┌──────────────┐
//! │ Lyrics resolver├────────>│          ├────────────>│ UI / host    │
//! └────────────────┘         │ EventBus │             └──────────────┘
//! ┌────────────────┐  emit   │          │  subscribe  ┌──────────────┐
//! │Artwork resolver├────────>│          ├────────────>│ NowPlaying   │
//! └────────────────┘         └──────────┘             │ watcher      │
//!        player bridge ──── Playback events ─────────>└──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LyricsEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Lyrics(LyricsEvent::Loaded {
//!     content: "[00:01.00]Imagine there's no heaven".to_string(),
//!     provider_id: "lrclib".to_string(),
//! }))
//! .ok();
//!
//! assert!(matches!(rx.recv().await, Ok(CoreEvent::Lyrics(_))));
//! # }
//! ```
//!
//! ## Terminal outcomes
//!
//! Each resolution publishes at most one terminal event for its kind:
//! `Loaded` on success, `NotFound` when every provider came up empty (or the
//! song could not be identified), and `Failed` only for unexpected internal
//! failures. A superseded resolution publishes nothing.
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep reading.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! `emit` fails only when nobody is subscribed. Publishers in this workspace
//! treat that as a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Lyrics resolution outcomes
    Lyrics(LyricsEvent),
    /// Artwork resolution outcomes
    Artwork(ArtworkEvent),
    /// Now-playing changes reported by a player bridge
    Playback(PlaybackEvent),
    /// Entity cache maintenance
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Lyrics(e) => e.description(),
            CoreEvent::Artwork(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Lyrics(LyricsEvent::Failed { .. })
            | CoreEvent::Artwork(ArtworkEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Lyrics(LyricsEvent::NotFound)
            | CoreEvent::Artwork(ArtworkEvent::NotFound) => EventSeverity::Warning,
            CoreEvent::Lyrics(LyricsEvent::Loaded { .. })
            | CoreEvent::Artwork(ArtworkEvent::Loaded { .. })
            | CoreEvent::Cache(CacheEvent::Cleared) => EventSeverity::Info,
            CoreEvent::Playback(_) => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Lyrics Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LyricsEvent {
    /// A provider (or the cache entry of a provider) produced lyrics.
    Loaded {
        /// Raw lyrics text, LRC or plain.
        content: String,
        /// Provider the lyrics came from.
        provider_id: String,
    },
    /// No provider had lyrics for the song.
    NotFound,
    /// Resolution aborted for a reason other than provider failures.
    Failed { message: String },
}

impl LyricsEvent {
    fn description(&self) -> &str {
        match self {
            LyricsEvent::Loaded { .. } => "Lyrics loaded",
            LyricsEvent::NotFound => "No lyrics found",
            LyricsEvent::Failed { .. } => "Lyrics resolution failed",
        }
    }
}

// ============================================================================
// Artwork Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ArtworkEvent {
    /// A provider produced one or more artwork variants.
    Loaded {
        /// Variant URLs in provider order.
        urls: Vec<String>,
        /// Provider the artwork came from.
        provider_id: String,
    },
    NotFound,
    Failed { message: String },
}

impl ArtworkEvent {
    fn description(&self) -> &str {
        match self {
            ArtworkEvent::Loaded { .. } => "Artwork loaded",
            ArtworkEvent::NotFound => "No artwork found",
            ArtworkEvent::Failed { .. } => "Artwork resolution failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Now-playing updates published by a player bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The player reported a (possibly unchanged) current song.
    SongChanged {
        name: String,
        artist: String,
        album: String,
        /// Track duration (milliseconds).
        duration_ms: u64,
        /// Playback position (milliseconds).
        position_ms: u64,
        is_playing: bool,
    },
    /// Nothing is playing anymore.
    Stopped,
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::SongChanged { .. } => "Now playing changed",
            PlaybackEvent::Stopped => "Playback stopped",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// Every cached lyrics and artwork entry was removed.
    Cleared,
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Cleared => "Entity cache cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cloneable publish/subscribe handle.
///
/// Clones share one broadcast channel. Subscribers only see events published
/// after they subscribed; slow subscribers get `RecvError::Lagged` instead of
/// blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribes and wraps the receiver in an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    /// Bus buffering [`DEFAULT_EVENT_BUFFER_SIZE`] events.
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus};
///
/// let bus = EventBus::new(16);
/// let lyrics_only = bus.stream().filter(|event| matches!(event, CoreEvent::Lyrics(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

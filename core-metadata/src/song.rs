//! Song model shared by resolvers, providers and the entity cache.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The currently playing song as reported by a player bridge.
///
/// Only the identity fields (`name`, `artist`, `album`) matter for
/// resolution; the playback fields ride along for hosts that render
/// synchronized lyrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Track length in seconds
    #[serde(default)]
    pub duration: f64,
    /// Playback position in seconds
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub is_playing: bool,
}

impl Song {
    pub fn new(
        name: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            album: album.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_playback(mut self, current_time: f64, is_playing: bool) -> Self {
        self.current_time = current_time;
        self.is_playing = is_playing;
        self
    }

    /// A song needs both a name and an artist before anything is looked up.
    pub fn is_identified(&self) -> bool {
        !self.name.trim().is_empty() && !self.artist.trim().is_empty()
    }

    pub fn identity(&self) -> SongIdentity {
        SongIdentity {
            name: self.name.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
    }
}

/// `(name, artist, album)`; playback state is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongIdentity {
    pub name: String,
    pub artist: String,
    pub album: String,
}

impl SongIdentity {
    /// `name|artist|album`, with `\`, `|` and `#` escaped inside fields so
    /// distinct identities never collide and never end in a variants suffix.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}",
            escape(&self.name),
            escape(&self.artist),
            escape(&self.album)
        )
    }
}

impl fmt::Display for SongIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.name, self.artist, self.album)
    }
}

fn escape(field: &str) -> String {
    escape_chars(field, &['|', '#'])
}

/// Backslash-escapes `\` and every char in `special`.
pub(crate) fn escape_chars(field: &str, special: &[char]) -> String {
    if !field.contains('\\') && !field.contains(special) {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identification_requires_name_and_artist() {
        assert!(Song::new("Imagine", "John Lennon", "").is_identified());
        assert!(!Song::new("", "John Lennon", "Imagine").is_identified());
        assert!(!Song::new("Imagine", "  ", "Imagine").is_identified());
    }

    #[test]
    fn test_identity_ignores_playback_state() {
        let paused = Song::new("Imagine", "John Lennon", "").with_playback(12.5, false);
        let playing = Song::new("Imagine", "John Lennon", "")
            .with_duration(183.0)
            .with_playback(99.0, true);

        assert_eq!(paused.identity(), playing.identity());
        assert_eq!(paused.identity().key(), "Imagine|John Lennon|");
    }

    #[test]
    fn test_identity_key_escapes_separators() {
        let a = Song::new("a|b", "c", "").identity().key();
        let b = Song::new("a", "b|c", "").identity().key();
        assert_ne!(a, b);
        assert_eq!(a, "a\\|b|c|");

        let tagged = Song::new("Imagine", "John Lennon", "Live #v").identity().key();
        assert_eq!(tagged, "Imagine|John Lennon|Live \\#v");
    }

    #[test]
    fn test_deserialize_with_missing_playback_fields() {
        let song: Song =
            serde_json::from_str(r#"{"name":"Imagine","artist":"John Lennon"}"#).unwrap();
        assert_eq!(song.album, "");
        assert_eq!(song.duration, 0.0);
        assert!(!song.is_playing);
    }
}

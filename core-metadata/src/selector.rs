//! # Best-Match Selector
//!
//! Picks one candidate out of the tracks a lyrics search returned.
//!
//! Candidates without any lyrics are discarded. The rest are ranked by
//! richness first (enhanced synced, then line-synced, then plain text), and
//! within the richest non-empty tier by:
//!
//! 1. closest duration to the playing song,
//! 2. most lyric lines,
//! 3. earliest position in the search results.
//!
//! The selection is pure and deterministic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Any timestamp token, line style `[mm:ss.xx]` or word style `<mm:ss.xx>`
static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[<]\d{1,3}:\d{2}(?:[.:]\d{1,3})?[\]>]").expect("valid regex")
});

/// ID tags such as `[ar:John Lennon]` or `[length: 03:03]`
static METADATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[[A-Za-z#]+:[^\]]*\]\s*$").expect("valid regex"));

/// One track returned by a lyrics search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrack {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    /// Seconds
    pub duration: f64,
    pub synced_lyrics: Option<String>,
    pub plain_lyrics: Option<String>,
}

impl CandidateTrack {
    fn synced(&self) -> Option<&str> {
        non_blank(self.synced_lyrics.as_deref())
    }

    fn plain(&self) -> Option<&str> {
        non_blank(self.plain_lyrics.as_deref())
    }

    /// Richness tier, or `None` when the candidate carries no lyrics.
    pub fn richness(&self) -> Option<LyricsRichness> {
        match (self.synced(), self.plain()) {
            (Some(synced), _) if is_enhanced(synced) => Some(LyricsRichness::Enhanced),
            (Some(_), _) => Some(LyricsRichness::Synced),
            (None, Some(_)) => Some(LyricsRichness::Plain),
            (None, None) => None,
        }
    }

    /// Best lyrics text this candidate offers: synced if present, else plain.
    pub fn best_lyrics(&self) -> Option<&str> {
        self.synced().or_else(|| self.plain())
    }

    fn line_count(&self) -> usize {
        self.best_lyrics().map(count_lyric_lines).unwrap_or(0)
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Ordered richest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LyricsRichness {
    /// Word-level timing
    Enhanced,
    /// Line-level timing
    Synced,
    Plain,
}

/// Whether some line carries two or more timestamp tokens.
pub fn is_enhanced(lyrics: &str) -> bool {
    lyrics
        .lines()
        .any(|line| TIMESTAMP_RE.find_iter(line).nth(1).is_some())
}

/// Counts lines with actual lyric text. Blank lines, ID tags and lines that
/// consist of timestamps only are ignored.
pub fn count_lyric_lines(lyrics: &str) -> usize {
    lyrics
        .lines()
        .filter(|line| !METADATA_RE.is_match(line))
        .filter(|line| !TIMESTAMP_RE.replace_all(line, "").trim().is_empty())
        .count()
}

/// Selects the best candidate for a song of `target_duration` seconds.
///
/// A non-positive target means the duration is unknown; the duration
/// criterion is then skipped.
pub fn select_best_match(
    candidates: &[CandidateTrack],
    target_duration: f64,
) -> Option<&CandidateTrack> {
    let ranked: Vec<(LyricsRichness, &CandidateTrack)> = candidates
        .iter()
        .filter_map(|candidate| candidate.richness().map(|tier| (tier, candidate)))
        .collect();

    let best_tier = ranked.iter().map(|(tier, _)| *tier).min()?;
    let mut tier = ranked
        .into_iter()
        .filter(|(t, _)| *t == best_tier)
        .map(|(_, candidate)| candidate)
        .peekable();

    let first = tier.next()?;
    if tier.peek().is_none() {
        return Some(first);
    }

    let known_duration = target_duration.is_finite() && target_duration > 0.0;
    let distance = |candidate: &CandidateTrack| {
        let diff = (candidate.duration - target_duration).abs();
        if known_duration && diff.is_finite() {
            diff
        } else if known_duration {
            f64::INFINITY
        } else {
            0.0
        }
    };

    // min_by keeps the first of equal elements, preserving search order
    std::iter::once(first).chain(tier).min_by(|a, b| {
        distance(a)
            .total_cmp(&distance(b))
            .then_with(|| b.line_count().cmp(&a.line_count()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, duration: f64) -> CandidateTrack {
        CandidateTrack {
            track_name: name.to_string(),
            artist_name: "John Lennon".to_string(),
            duration,
            ..CandidateTrack::default()
        }
    }

    fn synced(name: &str, duration: f64, lyrics: &str) -> CandidateTrack {
        CandidateTrack {
            synced_lyrics: Some(lyrics.to_string()),
            ..candidate(name, duration)
        }
    }

    fn plain(name: &str, duration: f64, lyrics: &str) -> CandidateTrack {
        CandidateTrack {
            plain_lyrics: Some(lyrics.to_string()),
            ..candidate(name, duration)
        }
    }

    const LINE_SYNCED: &str = "[00:01.00]Imagine there's no heaven\n[00:05.00]It's easy if you try";
    const WORD_SYNCED: &str = "[00:01.00]<00:01.00>Imagine <00:01.80>there's <00:02.20>no";

    #[test]
    fn test_enhanced_detection() {
        assert!(is_enhanced(WORD_SYNCED));
        assert!(is_enhanced("[00:01.00]Imagine [00:01.80]there's"));
        assert!(is_enhanced("[00:01.00][01:10.00]Chorus line"));
        assert!(!is_enhanced(LINE_SYNCED));
        assert!(!is_enhanced("<00:01.00>word"));
        assert!(!is_enhanced("plain words only"));
    }

    #[test]
    fn test_stacked_tags_outrank_line_synced_at_exact_duration() {
        let candidates = vec![
            synced("line", 200.0, LINE_SYNCED),
            synced("stacked", 260.0, "[00:01.00][01:10.00]Chorus line"),
        ];
        let best = select_best_match(&candidates, 200.0).unwrap();
        assert_eq!(best.track_name, "stacked");
        assert_eq!(best.richness(), Some(LyricsRichness::Enhanced));
    }

    #[test]
    fn test_line_count_ignores_metadata_and_empty_lines() {
        let lyrics = "[ar:John Lennon]\n[ti:Imagine]\n[length: 03:03]\n\n[00:00.50]\n[00:01.00]Imagine\n  \n[00:05.00]It's easy";
        assert_eq!(count_lyric_lines(lyrics), 2);
        assert_eq!(count_lyric_lines("one\n\ntwo\nthree"), 3);
        assert_eq!(count_lyric_lines(""), 0);
    }

    #[test]
    fn test_empty_and_lyricless_candidates() {
        assert!(select_best_match(&[], 200.0).is_none());

        let none = vec![candidate("a", 200.0), plain("b", 200.0, "   ")];
        assert!(select_best_match(&none, 200.0).is_none());

        let single = vec![candidate("a", 200.0), plain("b", 999.0, "words")];
        assert_eq!(select_best_match(&single, 200.0).unwrap().track_name, "b");
    }

    #[test]
    fn test_richest_tier_wins_regardless_of_duration() {
        let candidates = vec![
            plain("plain", 350.0, "a\nb\nc\nd\ne\nf"),
            synced("synced", 350.0, LINE_SYNCED),
            synced("enhanced", 10.0, WORD_SYNCED),
        ];
        let best = select_best_match(&candidates, 350.0).unwrap();
        assert_eq!(best.track_name, "enhanced");
        assert_eq!(best.richness(), Some(LyricsRichness::Enhanced));
    }

    #[test]
    fn test_closest_duration_breaks_ties() {
        let candidates = vec![
            synced("short", 100.0, LINE_SYNCED),
            synced("close", 340.0, LINE_SYNCED),
        ];
        assert_eq!(
            select_best_match(&candidates, 350.0).unwrap().track_name,
            "close"
        );
    }

    #[test]
    fn test_line_count_then_order_breaks_remaining_ties() {
        let richer = "[00:01.00]one\n[00:02.00]two\n[00:03.00]three";
        let candidates = vec![
            synced("first", 200.0, LINE_SYNCED),
            synced("richer", 200.0, richer),
            synced("twin", 200.0, richer),
        ];
        assert_eq!(
            select_best_match(&candidates, 205.0).unwrap().track_name,
            "richer"
        );
    }

    #[test]
    fn test_unknown_target_duration_skips_distance() {
        let candidates = vec![
            plain("short", 10.0, "one"),
            plain("long", 400.0, "one\ntwo"),
        ];
        assert_eq!(select_best_match(&candidates, 0.0).unwrap().track_name, "long");
    }

    #[test]
    fn test_best_lyrics_prefers_synced() {
        let mut track = plain("a", 1.0, "plain");
        assert_eq!(track.best_lyrics(), Some("plain"));
        track.synced_lyrics = Some(LINE_SYNCED.to_string());
        assert_eq!(track.best_lyrics(), Some(LINE_SYNCED));
    }
}

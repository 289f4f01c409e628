// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Guess matching.
//!
//! A guess wins only when its normalised text equals the song's title,
//! its artist, or "artist title" / "title artist". Partial matches are
//! used solely to pick a closest song for feedback display.

use crate::catalog::Song;

/// Minimum normalised length for a partial (substring) match
pub const MIN_PARTIAL_LEN: usize = 3;

/// Normalise text for comparison.
///
/// Lower-cases, drops everything except letters, digits and whitespace,
/// collapses whitespace runs to one space and trims the ends.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else if c.is_alphanumeric() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.extend(c.to_lowercase());
        }
    }

    out
}

/// Normalised comparison keys for one song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongKeys {
    /// Normalised title
    pub title: String,
    /// Normalised artist
    pub artist: String,
}

impl SongKeys {
    /// Build the keys for a song
    pub fn new(song: &Song) -> Self {
        Self {
            title: normalize(&song.title),
            artist: normalize(&song.artist),
        }
    }

    /// Whether an already-normalised guess is an exact match
    pub fn accepts(&self, guess: &str) -> bool {
        if guess.is_empty() {
            return false;
        }

        guess == self.title
            || guess == self.artist
            || joined(guess, &self.artist, &self.title)
            || joined(guess, &self.title, &self.artist)
    }

    /// Whether an already-normalised guess overlaps the title
    fn overlaps_title(&self, guess: &str) -> bool {
        overlaps(guess, &self.title)
    }

    /// Whether an already-normalised guess overlaps the artist
    fn overlaps_artist(&self, guess: &str) -> bool {
        overlaps(guess, &self.artist)
    }
}

/// `guess == first + " " + second` without allocating
fn joined(guess: &str, first: &str, second: &str) -> bool {
    guess
        .strip_prefix(first)
        .and_then(|rest| rest.strip_prefix(' '))
        .map(|rest| rest == second)
        .unwrap_or(false)
}

/// Substring containment in either direction, both sides long enough
fn overlaps(guess: &str, key: &str) -> bool {
    if guess.chars().count() < MIN_PARTIAL_LEN || key.chars().count() < MIN_PARTIAL_LEN {
        return false;
    }
    guess.contains(key) || key.contains(guess)
}

/// Whether `input` is an exact match for `song`. This is the only win condition.
pub fn is_exact_match(input: &str, song: &Song) -> bool {
    SongKeys::new(song).accepts(&normalize(input))
}

/// Closest song to a guess, for feedback display only.
///
/// Exact matches win. Otherwise the first song whose title overlaps the
/// guess is returned, then the first whose artist does.
pub fn find_best_match<'a>(input: &str, songs: &'a [Song]) -> Option<&'a Song> {
    let guess = normalize(input);
    if guess.is_empty() {
        return None;
    }

    let keyed: Vec<(SongKeys, &Song)> = songs.iter().map(|song| (SongKeys::new(song), song)).collect();

    keyed
        .iter()
        .find(|(keys, _)| keys.accepts(&guess))
        .or_else(|| keyed.iter().find(|(keys, _)| keys.overlaps_title(&guess)))
        .or_else(|| keyed.iter().find(|(keys, _)| keys.overlaps_artist(&guess)))
        .map(|(_, song)| *song)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imagine() -> Song {
        Song::new(1u64, "Imagine", "John Lennon", "imagine.mp3")
    }

    fn catalog() -> Vec<Song> {
        vec![
            imagine(),
            Song::new(2u64, "Yesterday", "The Beatles", "yesterday.mp3"),
            Song::new(3u64, "Lovely Day", "Bill Withers", "lovely.mp3"),
        ]
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Don't   Stop Me Now! "), "dont stop me now");
        assert_eq!(normalize("AC/DC"), "acdc");
        assert_eq!(normalize("Hey, Jude"), "hey jude");
        assert_eq!(normalize("\tA \n B\t"), "a b");
        assert_eq!(normalize("?!"), "");
        assert_eq!(normalize("Café 99"), "café 99");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for text in ["Hello,  World", "  x ", "Sgt. Pepper's"] {
            let once = normalize(text);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_exact_match_title_and_artist() {
        let song = imagine();
        assert!(is_exact_match("imagine", &song));
        assert!(is_exact_match("IMAGINE!", &song));
        assert!(is_exact_match("john lennon", &song));
        assert!(is_exact_match("John  Lennon.", &song));
    }

    #[test]
    fn test_exact_match_concatenations() {
        let song = imagine();
        assert!(is_exact_match("John Lennon Imagine", &song));
        assert!(is_exact_match("imagine john lennon", &song));
        assert!(!is_exact_match("imagine - lennon", &song));
    }

    #[test]
    fn test_substring_is_not_a_win() {
        let song = Song::new(3u64, "Lovely Day", "Bill Withers", "lovely.mp3");
        assert!(!is_exact_match("Love", &song));
        assert!(!is_exact_match("Lovely", &song));
        assert!(!is_exact_match("Lovely Day Bill", &song));
    }

    #[test]
    fn test_empty_guess_never_matches() {
        let song = imagine();
        assert!(!is_exact_match("", &song));
        assert!(!is_exact_match("   ", &song));
        assert!(!is_exact_match("!!!", &song));
    }

    #[test]
    fn test_best_match_prefers_exact() {
        let songs = catalog();
        let best = find_best_match("the beatles", &songs).unwrap();
        assert_eq!(best.title, "Yesterday");
    }

    #[test]
    fn test_best_match_partial() {
        let songs = catalog();
        assert_eq!(find_best_match("love", &songs).unwrap().title, "Lovely Day");
        assert_eq!(find_best_match("beatles", &songs).unwrap().title, "Yesterday");
        assert_eq!(find_best_match("imagine all the people", &songs).unwrap().title, "Imagine");
    }

    #[test]
    fn test_best_match_length_guard() {
        let songs = catalog();
        assert!(find_best_match("lo", &songs).is_none());
        assert!(find_best_match("zzz", &songs).is_none());
        assert!(find_best_match("", &songs).is_none());
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Round state machine.
//!
//! [`GameSession`] tracks one playthrough: the target song, the turn
//! counter, the snippet length index, the guess history and the round
//! status. It performs no I/O; the engine drives audio around it.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::catalog::{PlayedSongs, Song};
use crate::config::ConfigError;
use crate::matcher;

/// Snippet length per turn, strictly increasing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetLadder {
    lengths: Vec<Duration>,
}

impl SnippetLadder {
    /// Validate and wrap a progression
    pub fn new(lengths: Vec<Duration>) -> Result<Self, ConfigError> {
        if lengths.is_empty() {
            return Err(ConfigError::NoSnippetLengths);
        }
        if let Some(index) = lengths.iter().position(|length| length.is_zero()) {
            return Err(ConfigError::InvalidSnippetLength { index, value: 0.0 });
        }
        if let Some(index) = lengths.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(ConfigError::NotIncreasing { index: index + 1 });
        }
        Ok(Self { lengths })
    }

    /// All lengths in turn order
    pub fn lengths(&self) -> &[Duration] {
        &self.lengths
    }

    /// Number of lengths (one per turn)
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Always false; a ladder has at least one length
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Length at `index`
    pub fn get(&self, index: usize) -> Option<Duration> {
        self.lengths.get(index).copied()
    }

    /// Index of the longest length
    pub fn last_index(&self) -> usize {
        self.lengths.len().saturating_sub(1)
    }

    /// The longest length
    pub fn longest(&self) -> Duration {
        self.lengths.last().copied().unwrap_or_default()
    }
}

impl Default for SnippetLadder {
    fn default() -> Self {
        Self {
            lengths: [2, 3, 5, 8, 16].into_iter().map(Duration::from_secs).collect(),
        }
    }
}

/// Round status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameStatus {
    /// No round has started yet
    NotStarted,
    /// Guessing in progress
    Playing,
    /// Guessed correctly
    Won,
    /// Out of turns
    Lost,
}

impl GameStatus {
    /// Won or Lost
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Won | GameStatus::Lost)
    }
}

/// What the player did on a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GuessEntry {
    /// Guess text as typed
    Guess(String),
    /// Turn skipped for a longer snippet
    Skipped,
}

/// One history line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessRecord {
    /// Guess or skip
    pub entry: GuessEntry,
    /// 1-based turn the entry was made on
    pub turn_number: usize,
    /// Whether the guess won the round
    pub is_correct: bool,
    /// Snippet length in effect when the entry was made
    pub snippet_length: Duration,
}

impl GuessRecord {
    /// Guess text, if this was a guess
    pub fn text(&self) -> Option<&str> {
        match &self.entry {
            GuessEntry::Guess(text) => Some(text),
            GuessEntry::Skipped => None,
        }
    }

    /// Whether this was a skip
    pub fn is_skip(&self) -> bool {
        self.entry == GuessEntry::Skipped
    }

    /// "1st", "2nd", "3rd", "4th", ... for feedback lines
    pub fn ordinal_label(&self) -> String {
        let n = self.turn_number;
        let suffix = match (n % 10, n % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        };
        format!("{}{}", n, suffix)
    }
}

/// Outcome of a guess or skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnResult {
    /// Not applicable (round not in progress, empty guess)
    Ignored,
    /// Turn consumed, round continues
    Continue,
    /// Correct guess
    Won,
    /// Last turn consumed without a win
    Lost,
}

/// Read-only view of the session for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    /// Round status
    pub status: GameStatus,
    /// Rounds started this session
    pub round: u64,
    /// Target song
    pub song: Option<Song>,
    /// Whether the song's audio loaded
    pub audio_available: bool,
    /// 0-based turn
    pub current_turn: usize,
    /// Turn budget
    pub max_turns: usize,
    /// Index into the snippet ladder
    pub snippet_index: usize,
    /// Snippet length in effect
    pub snippet_length: Duration,
    /// Next snippet length, if any
    pub next_snippet_length: Option<Duration>,
    /// Guesses and skips this round
    pub history: Vec<GuessRecord>,
    /// Whether `begin_timer` was called this round
    pub timer_started: bool,
    /// Time since `begin_timer`, frozen once the round is over
    pub elapsed: Option<Duration>,
    /// Songs played this session (resets when exhausted)
    pub played_count: usize,
}

/// State of one playthrough
#[derive(Debug, Clone)]
pub struct GameSession {
    ladder: SnippetLadder,
    current_song: Option<Song>,
    audio_available: bool,
    snippet_index: usize,
    turn: usize,
    history: Vec<GuessRecord>,
    status: GameStatus,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    lost_at: Option<Instant>,
    played: PlayedSongs,
    round: u64,
}

impl GameSession {
    /// Create a session with no round started
    pub fn new(ladder: SnippetLadder) -> Self {
        Self {
            ladder,
            current_song: None,
            audio_available: false,
            snippet_index: 0,
            turn: 0,
            history: Vec::new(),
            status: GameStatus::NotStarted,
            start_time: None,
            end_time: None,
            lost_at: None,
            played: PlayedSongs::new(),
            round: 0,
        }
    }

    /// Start a new round on `song`.
    ///
    /// With `reset_played` the played set is cleared before the song is
    /// recorded (the catalog was exhausted).
    pub fn reset_for(&mut self, song: Song, reset_played: bool, audio_available: bool) {
        self.played.record_round(song.id.clone(), reset_played);

        self.current_song = Some(song);
        self.audio_available = audio_available;
        self.snippet_index = 0;
        self.turn = 0;
        self.history.clear();
        self.status = GameStatus::Playing;
        self.start_time = None;
        self.end_time = None;
        self.lost_at = None;
        self.round += 1;
    }

    /// Start the round clock. Only the first call per round counts.
    pub fn begin_timer(&mut self) -> bool {
        if self.status != GameStatus::Playing || self.start_time.is_some() {
            return false;
        }
        self.start_time = Some(Instant::now());
        true
    }

    /// Record a guess and resolve it.
    pub fn submit_guess(&mut self, text: &str) -> TurnResult {
        let trimmed = text.trim();
        if self.status != GameStatus::Playing || trimmed.is_empty() {
            return TurnResult::Ignored;
        }
        let Some(song) = &self.current_song else {
            return TurnResult::Ignored;
        };

        let is_correct = matcher::is_exact_match(trimmed, song);
        self.history.push(GuessRecord {
            entry: GuessEntry::Guess(trimmed.to_string()),
            turn_number: self.turn + 1,
            is_correct,
            snippet_length: self.current_snippet_length(),
        });

        if is_correct {
            self.status = GameStatus::Won;
            self.end_time = Some(Instant::now());
            TurnResult::Won
        } else {
            self.consume_turn()
        }
    }

    /// Skip to the next (longer) snippet, spending a turn
    pub fn skip_turn(&mut self) -> TurnResult {
        if self.status != GameStatus::Playing {
            return TurnResult::Ignored;
        }

        self.history.push(GuessRecord {
            entry: GuessEntry::Skipped,
            turn_number: self.turn + 1,
            is_correct: false,
            snippet_length: self.current_snippet_length(),
        });
        self.snippet_index = (self.snippet_index + 1).min(self.ladder.last_index());
        self.consume_turn()
    }

    fn consume_turn(&mut self) -> TurnResult {
        if self.turn + 1 < self.max_turns() {
            self.turn += 1;
            TurnResult::Continue
        } else {
            self.status = GameStatus::Lost;
            self.lost_at = Some(Instant::now());
            TurnResult::Lost
        }
    }

    /// Snippet length in effect
    pub fn current_snippet_length(&self) -> Duration {
        self.ladder.get(self.snippet_index).unwrap_or_default()
    }

    /// Length a skip would unlock, if any
    pub fn next_snippet_length(&self) -> Option<Duration> {
        self.ladder.get(self.snippet_index + 1)
    }

    /// Extra time a skip would add ("Skip (+Ns)")
    pub fn skip_bonus(&self) -> Option<Duration> {
        self.next_snippet_length()
            .map(|next| next.saturating_sub(self.current_snippet_length()))
    }

    /// Time since `begin_timer`.
    ///
    /// Frozen at the winning guess on a win and at the last turn on a loss.
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.start_time?;
        let end = self.end_time.or(self.lost_at).unwrap_or_else(Instant::now);
        Some(end.saturating_duration_since(start))
    }

    /// Mark the current song's audio as (un)available
    pub fn set_audio_available(&mut self, available: bool) {
        self.audio_available = available;
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current_song.as_ref()
    }

    pub fn audio_available(&self) -> bool {
        self.audio_available
    }

    pub fn current_turn(&self) -> usize {
        self.turn
    }

    pub fn max_turns(&self) -> usize {
        self.ladder.len()
    }

    pub fn snippet_index(&self) -> usize {
        self.snippet_index
    }

    pub fn ladder(&self) -> &SnippetLadder {
        &self.ladder
    }

    pub fn history(&self) -> &[GuessRecord] {
        &self.history
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// Set only when the round is won
    pub fn end_time(&self) -> Option<Instant> {
        self.end_time
    }

    pub fn played(&self) -> &PlayedSongs {
        &self.played
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Capture the current state
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            status: self.status,
            round: self.round,
            song: self.current_song.clone(),
            audio_available: self.audio_available,
            current_turn: self.turn,
            max_turns: self.max_turns(),
            snippet_index: self.snippet_index,
            snippet_length: self.current_snippet_length(),
            next_snippet_length: self.next_snippet_length(),
            history: self.history.clone(),
            timer_started: self.start_time.is_some(),
            elapsed: self.elapsed(),
            played_count: self.played.len(),
        }
    }
}

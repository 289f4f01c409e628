// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Turn-based game core.
//!
//! This module provides:
//! - The round state machine (turns, snippet progression, win/loss)
//! - The engine tying rounds to song selection and audio playback

pub mod engine;
pub mod session;

pub use engine::{Game, RoundStartError};
pub use session::{
    GameSession, GameSnapshot, GameStatus, GuessEntry, GuessRecord, SnippetLadder, TurnResult,
};

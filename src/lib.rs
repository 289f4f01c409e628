// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Beatle - guess the song from ever longer snippets.
//!
//! The crate is organised leaves first:
//! - [`catalog`]: the read-only song list and fair random selection
//! - [`matcher`]: guess normalisation and exact/closest matching
//! - [`audio`]: the playback coordinator and its backends
//! - [`game`]: the turn-based round state machine and its composition root
//! - [`events`]: state and audio notifications for a presentation layer
//! - [`config`]: game configuration files

pub mod audio;
pub mod catalog;
pub mod config;
pub mod events;
pub mod game;
pub mod matcher;

pub use audio::{AudioBackend, AudioCoordinator, AudioError, AudioSource, PlayMode, SimulatedBackend};
pub use catalog::{CatalogError, PlayedSongs, Song, SongCatalog, SongId};
pub use config::{ConfigError, GameConfig};
pub use events::{AudioEvent, EventBus, GameEvent};
pub use game::{Game, GameSession, GameSnapshot, GameStatus, GuessRecord, RoundStartError};

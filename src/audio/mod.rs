// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio playback for song snippets.
//!
//! This module provides:
//! - A backend trait over whatever actually produces sound
//! - The playback coordinator (load, bounded snippets, full track, progress)
//! - A simulated backend for tests and silent play
//! - A rodio backend for real output (`playback` feature)

pub mod coordinator;
#[cfg(feature = "playback")]
pub mod rodio_backend;
pub mod simulated;

pub use coordinator::AudioCoordinator;
#[cfg(feature = "playback")]
pub use rodio_backend::RodioBackend;
pub use simulated::{BackendCall, SimulatedBackend};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::Song;

/// Opaque locator for a playable media resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioSource {
    locator: String,
}

impl AudioSource {
    /// Wrap a raw locator
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
        }
    }

    /// Locator for a song's audio: `<base>/<filename>`
    pub fn for_song(song: &Song, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        if base.is_empty() {
            Self::new(song.filename.clone())
        } else {
            Self::new(format!("{}/{}", base, song.filename))
        }
    }

    /// The locator string
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator)
    }
}

/// Metadata known once a source has loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo {
    /// Total media duration
    pub duration: Duration,
}

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AudioState {
    /// Nothing loaded
    Idle,
    /// Metadata load in flight
    Loading,
    /// Loaded and silent
    Ready,
    /// Starting or producing output
    Playing,
}

/// Kind of playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayMode {
    /// Bounded excerpt during a round; drives progress tracking
    Snippet,
    /// Whole track after a round ends; never auto-stopped
    FullTrack,
}

/// Audio errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AudioError {
    /// Media could not be loaded
    #[error("Failed to load {locator}: {reason}")]
    Load { locator: String, reason: String },

    /// Output could not start
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Nothing is loaded
    #[error("No media ready for playback")]
    NotReady,

    /// A newer load replaced this one before it finished
    #[error("Load superseded by a newer request")]
    Superseded,
}

/// Boxed future returned by backends
pub type BackendFuture<T> = Pin<Box<dyn Future<Output = Result<T, AudioError>> + Send + 'static>>;

/// Trait for audio output implementations.
///
/// Backends do the actual decoding and output. All sequencing (timers,
/// generations, progress) lives in [`AudioCoordinator`], so a backend only
/// needs to open media, start at an offset and halt.
pub trait AudioBackend: Send + 'static {
    /// Open `source`, replacing whatever was open, and resolve its metadata.
    fn load(&mut self, source: &AudioSource) -> BackendFuture<MediaInfo>;

    /// Start output at `offset`. Resolves once sound is actually flowing.
    fn play(&mut self, offset: Duration) -> BackendFuture<()>;

    /// Halt output. Must be safe to call when nothing is playing.
    fn pause(&mut self);
}

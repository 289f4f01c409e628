// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Notifications for the presentation layer.
//!
//! The game emits a [`GameEvent::StateChanged`] snapshot after every
//! mutating operation, and the audio coordinator emits lifecycle events
//! (loaded, started, ended, error). Both travel over one broadcast bus.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::audio::PlayMode;
use crate::game::GameSnapshot;

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Why a playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// Snippet auto-stop fired
    Completed,
    /// Explicit stop
    Stopped,
    /// Full-track pause (position retained)
    Paused,
    /// Media reached its end
    TrackEnded,
    /// A new load or segment took over
    Replaced,
}

/// Audio lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AudioEvent {
    /// Media metadata is available
    Loaded {
        /// Locator of the loaded source
        locator: String,
        /// Media duration
        duration: Duration,
    },
    /// Output actually began
    PlaybackStarted {
        /// Snippet or full track
        mode: PlayMode,
        /// Start position within the media
        offset: Duration,
        /// Auto-stop length, if bounded
        duration: Option<Duration>,
    },
    /// Output stopped
    PlaybackEnded {
        /// Snippet or full track
        mode: PlayMode,
        /// Why it stopped
        reason: EndReason,
    },
    /// Load or playback failure
    Error {
        /// Error message
        message: String,
    },
}

/// Events emitted by the game core
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    /// Session state after a mutating operation
    StateChanged(Box<GameSnapshot>),
    /// Audio lifecycle
    Audio(AudioEvent),
}

/// Broadcast bus shared by the game and its audio coordinator
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: GameEvent) {
        let _ = self.sender.send(event);
    }

    /// Publish an audio event
    pub fn emit_audio(&self, event: AudioEvent) {
        self.emit(GameEvent::Audio(event));
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

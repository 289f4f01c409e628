// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Simulated audio backend.
//!
//! Produces no sound. Media durations come from an in-memory table, load
//! and start latency are configurable and every backend call is recorded,
//! which makes it the backend for tests and for silent play.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{AudioBackend, AudioError, AudioSource, BackendFuture, MediaInfo};

/// A call received by the simulated backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `load` with the locator
    Load(String),
    /// `play` with the start offset
    Play(Duration),
    /// `pause`
    Pause,
}

#[derive(Debug, Default)]
struct SimState {
    /// Known media: locator -> duration
    tracks: HashMap<String, Duration>,
    /// Duration for locators not in `tracks` (None = unknown locators fail)
    default_duration: Option<Duration>,
    load_latency: Duration,
    start_latency: Duration,
    fail_playback: bool,
    /// Currently open locator
    open: Option<String>,
    /// Bumped per load so a slow earlier load cannot reopen stale media
    load_seq: u64,
    outputting: bool,
    calls: Vec<BackendCall>,
}

/// In-memory backend; clones share state so tests can inspect it
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedBackend {
    /// Create a backend that knows no media
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that loads any locator with the given duration
    pub fn permissive(duration: Duration) -> Self {
        let backend = Self::new();
        lock(&backend.state).default_duration = Some(duration);
        backend
    }

    /// Register a track (builder form)
    pub fn with_track(self, locator: impl Into<String>, duration: Duration) -> Self {
        self.add_track(locator, duration);
        self
    }

    /// Set load latency (builder form)
    pub fn with_load_latency(self, latency: Duration) -> Self {
        lock(&self.state).load_latency = latency;
        self
    }

    /// Set start latency (builder form)
    pub fn with_start_latency(self, latency: Duration) -> Self {
        lock(&self.state).start_latency = latency;
        self
    }

    /// Register a track
    pub fn add_track(&self, locator: impl Into<String>, duration: Duration) {
        lock(&self.state).tracks.insert(locator.into(), duration);
    }

    /// Forget a track so later loads of it fail
    pub fn remove_track(&self, locator: &str) {
        lock(&self.state).tracks.remove(locator);
    }

    /// Make every subsequent `play` fail (or succeed again)
    pub fn set_playback_failure(&self, fail: bool) {
        lock(&self.state).fail_playback = fail;
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.state).calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Whether the simulated output is currently running
    pub fn is_outputting(&self) -> bool {
        lock(&self.state).outputting
    }

    /// Locator of the open media
    pub fn open_locator(&self) -> Option<String> {
        lock(&self.state).open.clone()
    }
}

impl AudioBackend for SimulatedBackend {
    fn load(&mut self, source: &AudioSource) -> BackendFuture<MediaInfo> {
        let locator = source.locator().to_string();
        let (seq, latency) = {
            let mut state = lock(&self.state);
            state.calls.push(BackendCall::Load(locator.clone()));
            state.outputting = false;
            state.load_seq += 1;
            (state.load_seq, state.load_latency)
        };
        let shared = Arc::clone(&self.state);

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut state = lock(&shared);
            let current = state.load_seq == seq;
            let duration = state.tracks.get(&locator).copied().or(state.default_duration);
            match duration {
                Some(duration) => {
                    if current {
                        state.open = Some(locator);
                    }
                    Ok(MediaInfo { duration })
                }
                None => {
                    if current {
                        state.open = None;
                    }
                    Err(AudioError::Load {
                        locator,
                        reason: "no such media".to_string(),
                    })
                }
            }
        })
    }

    fn play(&mut self, offset: Duration) -> BackendFuture<()> {
        let latency = {
            let mut state = lock(&self.state);
            state.calls.push(BackendCall::Play(offset));
            state.start_latency
        };
        let shared = Arc::clone(&self.state);

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut state = lock(&shared);
            if state.fail_playback {
                return Err(AudioError::Playback("simulated output failure".to_string()));
            }
            if state.open.is_none() {
                return Err(AudioError::NotReady);
            }
            state.outputting = true;
            Ok(())
        })
    }

    fn pause(&mut self) {
        let mut state = lock(&self.state);
        state.calls.push(BackendCall::Pause);
        state.outputting = false;
    }
}

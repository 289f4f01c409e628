// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback coordinator.
//!
//! Drives one [`AudioBackend`] through `Idle -> Loading -> Ready -> Playing`
//! and back, arms auto-stop timers for bounded snippets and reports
//! progress against a fixed reference ceiling.
//!
//! Every timer carries the play generation it was armed under. Any stop,
//! new segment or new load bumps the generation and aborts the timer task,
//! so a timer that still manages to fire afterwards finds a stale
//! generation and does nothing. Loads carry their own generation so a
//! superseded load resolves to [`AudioError::Superseded`] without touching
//! state or emitting events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::{AudioBackend, AudioError, AudioSource, AudioState, MediaInfo, PlayMode};
use crate::events::{AudioEvent, EndReason, EventBus};

#[derive(Debug, Clone)]
struct LoadedMedia {
    source: AudioSource,
    info: MediaInfo,
}

/// The segment currently producing output
#[derive(Debug, Clone, Copy)]
struct Segment {
    mode: PlayMode,
    offset: Duration,
    /// Auto-stop length (snippets only)
    duration: Option<Duration>,
    /// When output actually began
    started_at: Instant,
}

impl Segment {
    /// Time played, never beyond the segment's own length
    fn elapsed(&self) -> Duration {
        let elapsed = self.started_at.elapsed();
        match self.duration {
            Some(limit) => elapsed.min(limit),
            None => elapsed,
        }
    }
}

struct Inner<B> {
    backend: B,
    state: AudioState,
    load_generation: u64,
    play_generation: u64,
    media: Option<LoadedMedia>,
    segment: Option<Segment>,
    /// Retained full-track position after `pause`
    paused_at: Option<Duration>,
    timer: Option<JoinHandle<()>>,
    /// Progress scale for snippets (the longest snippet length)
    reference_ceiling: Duration,
}

impl<B: AudioBackend> Inner<B> {
    /// Cancel the timer, halt output and leave `Playing`.
    ///
    /// Always invalidates the current play generation. Returns true if an
    /// active segment was ended (and its `PlaybackEnded` event emitted).
    fn halt(&mut self, reason: EndReason, events: &EventBus) -> bool {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.play_generation += 1;

        if self.state != AudioState::Playing {
            return false;
        }

        self.backend.pause();
        self.state = if self.media.is_some() {
            AudioState::Ready
        } else {
            AudioState::Idle
        };

        match self.segment.take() {
            Some(segment) => {
                events.emit_audio(AudioEvent::PlaybackEnded {
                    mode: segment.mode,
                    reason,
                });
                true
            }
            None => false,
        }
    }

    fn media_duration(&self) -> Duration {
        self.media
            .as_ref()
            .map(|media| media.info.duration)
            .unwrap_or_default()
    }

    fn position(&self) -> Duration {
        match (self.segment, self.paused_at) {
            (Some(segment), _) => (segment.offset + segment.elapsed()).min(self.media_duration()),
            (None, Some(paused)) => paused,
            (None, None) => Duration::ZERO,
        }
    }
}

fn lock_inner<B>(inner: &Mutex<Inner<B>>) -> MutexGuard<'_, Inner<B>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawn the end-of-segment timer for `generation`
fn arm_timer<B: AudioBackend>(
    inner: Weak<Mutex<Inner<B>>>,
    events: EventBus,
    generation: u64,
    delay: Duration,
    reason: EndReason,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let Some(shared) = inner.upgrade() else {
            return;
        };
        let mut inner = lock_inner(&shared);
        if inner.play_generation != generation {
            trace!(generation, "ignoring stale segment timer");
            return;
        }

        // Finishing from inside the timer task: don't abort ourselves
        inner.timer = None;
        debug!(?reason, "segment finished");
        inner.halt(reason, &events);
    })
}

/// Playback coordinator handle.
///
/// Clones share the same underlying state; at most one media resource is
/// live and at most one segment plays at a time.
pub struct AudioCoordinator<B: AudioBackend> {
    inner: Arc<Mutex<Inner<B>>>,
    events: EventBus,
}

impl<B: AudioBackend> Clone for AudioCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
        }
    }
}

impl<B: AudioBackend> AudioCoordinator<B> {
    /// Create a coordinator.
    ///
    /// `reference_ceiling` is the snippet progress scale, normally the
    /// longest configured snippet length.
    pub fn new(backend: B, reference_ceiling: Duration, events: EventBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backend,
                state: AudioState::Idle,
                load_generation: 0,
                play_generation: 0,
                media: None,
                segment: None,
                paused_at: None,
                timer: None,
                reference_ceiling,
            })),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        lock_inner(&self.inner)
    }

    /// Current state
    pub fn state(&self) -> AudioState {
        self.lock().state
    }

    /// Whether a segment is producing output
    pub fn is_playing(&self) -> bool {
        self.lock().segment.is_some()
    }

    /// Mode of the active segment
    pub fn play_mode(&self) -> Option<PlayMode> {
        self.lock().segment.map(|segment| segment.mode)
    }

    /// Whether a full-track pause position is retained
    pub fn is_paused(&self) -> bool {
        self.lock().paused_at.is_some()
    }

    /// Metadata of the loaded media
    pub fn media(&self) -> Option<MediaInfo> {
        self.lock().media.as_ref().map(|media| media.info)
    }

    /// Source of the loaded media
    pub fn source(&self) -> Option<AudioSource> {
        self.lock().media.as_ref().map(|media| media.source.clone())
    }

    /// Snippet progress scale
    pub fn reference_ceiling(&self) -> Duration {
        self.lock().reference_ceiling
    }

    /// Change the snippet progress scale
    pub fn set_reference_ceiling(&self, ceiling: Duration) {
        self.lock().reference_ceiling = ceiling;
    }

    /// Load a source, replacing whatever was loaded.
    ///
    /// Cancels any playback and timers first. If another load starts before
    /// this one resolves, this one returns [`AudioError::Superseded`].
    pub async fn load(&self, source: AudioSource) -> Result<MediaInfo, AudioError> {
        self.load_from(source, None).await
    }

    /// Generation of the most recent load request
    pub fn load_generation(&self) -> u64 {
        self.lock().load_generation
    }

    /// Load `source` only if no load was requested since `generation`.
    ///
    /// Returns [`AudioError::Superseded`] without touching anything when a
    /// newer load already started.
    pub async fn reload_if_current(&self, generation: u64, source: AudioSource) -> Result<MediaInfo, AudioError> {
        self.load_from(source, Some(generation)).await
    }

    async fn load_from(&self, source: AudioSource, expected: Option<u64>) -> Result<MediaInfo, AudioError> {
        let (generation, pending) = {
            let mut inner = self.lock();
            if expected.is_some_and(|expected| expected != inner.load_generation) {
                debug!(source = %source, "skipping reload after a newer load");
                return Err(AudioError::Superseded);
            }
            inner.halt(EndReason::Replaced, &self.events);
            inner.load_generation += 1;
            inner.state = AudioState::Loading;
            inner.media = None;
            inner.paused_at = None;
            let pending = inner.backend.load(&source);
            (inner.load_generation, pending)
        };
        debug!(source = %source, "loading audio");

        let result = pending.await;

        let mut inner = self.lock();
        if inner.load_generation != generation {
            debug!(source = %source, "discarding superseded load");
            return Err(AudioError::Superseded);
        }

        match result {
            Ok(info) => {
                inner.state = AudioState::Ready;
                inner.media = Some(LoadedMedia {
                    source: source.clone(),
                    info,
                });
                debug!(source = %source, duration = ?info.duration, "audio loaded");
                self.events.emit_audio(AudioEvent::Loaded {
                    locator: source.locator().to_string(),
                    duration: info.duration,
                });
                Ok(info)
            }
            Err(err) => {
                inner.state = AudioState::Idle;
                warn!(source = %source, error = %err, "audio load failed");
                self.events.emit_audio(AudioEvent::Error {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Play from `offset`.
    ///
    /// In [`PlayMode::Snippet`] with `duration` set, playback stops after
    /// exactly that long, counted from when output actually began. Full
    /// tracks ignore `duration` and run to the end of the media. Any
    /// segment already playing is stopped first.
    ///
    /// Returns false if nothing is loaded, the backend failed to start, or
    /// the request was stopped or replaced before output began.
    pub async fn play_segment(&self, offset: Duration, duration: Option<Duration>, mode: PlayMode) -> bool {
        let (generation, pending) = {
            let mut inner = self.lock();
            let ready = matches!(inner.state, AudioState::Ready | AudioState::Playing);
            if !ready || inner.media.is_none() {
                debug!(state = ?inner.state, "play requested without ready media");
                return false;
            }

            inner.halt(EndReason::Replaced, &self.events);
            inner.state = AudioState::Playing;
            inner.paused_at = None;
            let pending = inner.backend.play(offset);
            (inner.play_generation, pending)
        };

        let result = pending.await;

        let mut inner = self.lock();
        if inner.play_generation != generation {
            // Stopped, replaced or reloaded while starting
            if inner.state != AudioState::Playing {
                inner.backend.pause();
            }
            trace!(generation, "discarding superseded play request");
            return false;
        }

        match result {
            Ok(()) => {
                let remaining = inner.media_duration().saturating_sub(offset);
                let bounded = match mode {
                    PlayMode::Snippet => duration,
                    PlayMode::FullTrack => None,
                };
                let (delay, reason) = match bounded {
                    Some(limit) if limit <= remaining => (limit, EndReason::Completed),
                    _ => (remaining, EndReason::TrackEnded),
                };

                inner.segment = Some(Segment {
                    mode,
                    offset,
                    duration: bounded,
                    started_at: Instant::now(),
                });
                inner.timer = Some(arm_timer(
                    Arc::downgrade(&self.inner),
                    self.events.clone(),
                    generation,
                    delay,
                    reason,
                ));

                debug!(?mode, ?offset, duration = ?bounded, "playback started");
                self.events.emit_audio(AudioEvent::PlaybackStarted {
                    mode,
                    offset,
                    duration: bounded,
                });
                true
            }
            Err(err) => {
                inner.state = if inner.media.is_some() {
                    AudioState::Ready
                } else {
                    AudioState::Idle
                };
                warn!(error = %err, "playback failed to start");
                self.events.emit_audio(AudioEvent::Error {
                    message: err.to_string(),
                });
                false
            }
        }
    }

    /// Stop playback and cancel any auto-stop. Safe to call when stopped.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.halt(EndReason::Stopped, &self.events) {
            debug!("playback stopped");
        }
        inner.paused_at = None;
    }

    /// Pause full-track playback, retaining the position.
    ///
    /// Returns false for snippets or when nothing is playing.
    pub fn pause(&self) -> bool {
        let mut inner = self.lock();
        let segment = inner.segment;
        match segment {
            Some(segment) if segment.mode == PlayMode::FullTrack => {
                let position = inner.position();
                inner.halt(EndReason::Paused, &self.events);
                inner.paused_at = Some(position);
                debug!(?position, "full track paused");
                true
            }
            _ => false,
        }
    }

    /// Resume full-track playback from the paused position, or from the
    /// start if never paused. Returns false if already playing.
    pub async fn resume(&self) -> bool {
        let from = {
            let inner = self.lock();
            if inner.state == AudioState::Playing {
                return false;
            }
            inner.paused_at.unwrap_or(Duration::ZERO)
        };
        self.play_segment(from, None, PlayMode::FullTrack).await
    }

    /// Current position within the media
    pub fn position(&self) -> Duration {
        self.lock().position()
    }

    /// Progress in `[0, 1]`.
    ///
    /// Snippets report elapsed time over the reference ceiling, so the scale
    /// is the same for every snippet length; full tracks report position
    /// over media duration. Zero when nothing plays.
    pub fn progress_fraction(&self) -> f64 {
        let inner = self.lock();
        let Some(segment) = inner.segment else {
            return 0.0;
        };

        let (done, total) = match segment.mode {
            PlayMode::Snippet => (segment.elapsed(), inner.reference_ceiling),
            PlayMode::FullTrack => (inner.position(), inner.media_duration()),
        };

        if total.is_zero() {
            return 0.0;
        }
        (done.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BackendCall, SimulatedBackend};
    use crate::events::GameEvent;
    use tokio::sync::broadcast;
    use tokio::time::sleep;

    const TRACK: &str = "audio/track.mp3";

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn setup(backend: SimulatedBackend) -> (AudioCoordinator<SimulatedBackend>, broadcast::Receiver<GameEvent>) {
        let events = EventBus::default();
        let rx = events.subscribe();
        (AudioCoordinator::new(backend, secs(16.0), events), rx)
    }

    fn drain(rx: &mut broadcast::Receiver<GameEvent>) -> Vec<AudioEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let GameEvent::Audio(audio) = event {
                out.push(audio);
            }
        }
        out
    }

    fn ended(events: &[AudioEvent]) -> Vec<EndReason> {
        events
            .iter()
            .filter_map(|event| match event {
                AudioEvent::PlaybackEnded { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_load_reaches_ready() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, mut rx) = setup(backend);
        assert_eq!(audio.state(), AudioState::Idle);

        let info = audio.load(AudioSource::new(TRACK)).await.unwrap();
        assert_eq!(info.duration, secs(30.0));
        assert_eq!(audio.state(), AudioState::Ready);
        assert_eq!(audio.source(), Some(AudioSource::new(TRACK)));
        assert!(matches!(drain(&mut rx).as_slice(), [AudioEvent::Loaded { .. }]));
    }

    #[tokio::test]
    async fn test_load_failure_returns_to_idle() {
        let (audio, mut rx) = setup(SimulatedBackend::new());

        let result = audio.load(AudioSource::new("audio/missing.mp3")).await;
        assert!(matches!(result, Err(AudioError::Load { .. })));
        assert_eq!(audio.state(), AudioState::Idle);
        assert!(audio.media().is_none());
        assert!(matches!(drain(&mut rx).as_slice(), [AudioEvent::Error { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_load_supersedes_pending_one() {
        let backend = SimulatedBackend::new()
            .with_track("a", secs(10.0))
            .with_track("b", secs(20.0))
            .with_load_latency(secs(1.0));
        let (audio, mut rx) = setup(backend);

        let (first, second) = tokio::join!(audio.load(AudioSource::new("a")), async {
            tokio::task::yield_now().await;
            audio.load(AudioSource::new("b")).await
        });

        assert_eq!(first, Err(AudioError::Superseded));
        assert_eq!(second.unwrap().duration, secs(20.0));
        assert_eq!(audio.source(), Some(AudioSource::new("b")));

        // Only the winning load reports
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AudioEvent::Loaded { locator, .. } if locator == "b"));
    }

    #[tokio::test]
    async fn test_reload_if_current() {
        let backend = SimulatedBackend::new().with_track("a", secs(10.0)).with_track("b", secs(20.0));
        let (audio, _rx) = setup(backend);

        let generation = audio.load_generation();
        audio.load(AudioSource::new("a")).await.unwrap();

        // A load happened since the generation was read
        let result = audio.reload_if_current(generation, AudioSource::new("b")).await;
        assert_eq!(result, Err(AudioError::Superseded));
        assert_eq!(audio.source(), Some(AudioSource::new("a")));
        assert_eq!(audio.state(), AudioState::Ready);

        let generation = audio.load_generation();
        assert!(audio.reload_if_current(generation, AudioSource::new("b")).await.is_ok());
        assert_eq!(audio.source(), Some(AudioSource::new("b")));
    }

    #[tokio::test]
    async fn test_play_requires_loaded_media() {
        let (audio, _rx) = setup(SimulatedBackend::new());
        assert!(!audio.play_segment(Duration::ZERO, Some(secs(2.0)), PlayMode::Snippet).await);
        assert_eq!(audio.state(), AudioState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snippet_auto_stops() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, mut rx) = setup(backend.clone());
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        assert!(audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet).await);
        assert!(audio.is_playing());
        assert!(backend.is_outputting());

        sleep(secs(2.9)).await;
        assert!(audio.is_playing());

        sleep(secs(0.2)).await;
        assert!(!audio.is_playing());
        assert!(!backend.is_outputting());
        assert_eq!(audio.state(), AudioState::Ready);
        assert_eq!(ended(&drain(&mut rx)), vec![EndReason::Completed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_counts_from_actual_start() {
        let backend = SimulatedBackend::new()
            .with_track(TRACK, secs(30.0))
            .with_start_latency(secs(0.5));
        let (audio, _rx) = setup(backend);
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        let called_at = Instant::now();
        assert!(audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet).await);
        assert!(called_at.elapsed() >= secs(0.5));

        // 3.2s after the call, but only 2.7s after output began
        sleep(secs(2.7)).await;
        assert!(audio.is_playing());

        sleep(secs(0.4)).await;
        assert!(!audio.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_auto_stop() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, mut rx) = setup(backend.clone());
        audio.load(AudioSource::new(TRACK)).await.unwrap();
        drain(&mut rx);

        assert!(audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet).await);
        sleep(secs(1.0)).await;
        audio.stop();
        sleep(secs(5.0)).await;

        let events = drain(&mut rx);
        assert_eq!(ended(&events), vec![EndReason::Stopped]);
        assert_eq!(events.len(), 2);

        // Stop is idempotent
        audio.stop();
        assert!(drain(&mut rx).is_empty());
        let pauses = backend.calls().iter().filter(|c| **c == BackendCall::Pause).count();
        assert_eq!(pauses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_starting_discards_start() {
        let backend = SimulatedBackend::new()
            .with_track(TRACK, secs(30.0))
            .with_start_latency(secs(1.0));
        let (audio, _rx) = setup(backend.clone());
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        let (started, _) = tokio::join!(
            audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet),
            async {
                sleep(secs(0.5)).await;
                audio.stop();
            }
        );

        assert!(!started);
        assert!(!audio.is_playing());
        assert!(!backend.is_outputting());
        assert_eq!(audio.state(), AudioState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_segment_replaces_previous() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, mut rx) = setup(backend.clone());
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        assert!(audio.play_segment(Duration::ZERO, Some(secs(2.0)), PlayMode::Snippet).await);
        sleep(secs(1.0)).await;
        assert!(audio.play_segment(Duration::ZERO, Some(secs(5.0)), PlayMode::Snippet).await);

        // The first snippet's timer must not cut the second one short
        sleep(secs(3.0)).await;
        assert!(audio.is_playing());

        sleep(secs(2.5)).await;
        assert!(!audio.is_playing());
        assert_eq!(
            ended(&drain(&mut rx)),
            vec![EndReason::Replaced, EndReason::Completed]
        );
        assert_eq!(
            backend.calls()[1..3],
            [BackendCall::Play(Duration::ZERO), BackendCall::Pause]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_cancels_pending_timer() {
        let backend = SimulatedBackend::new()
            .with_track("a", secs(30.0))
            .with_track("b", secs(30.0));
        let (audio, mut rx) = setup(backend);
        audio.load(AudioSource::new("a")).await.unwrap();

        assert!(audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet).await);
        audio.load(AudioSource::new("b")).await.unwrap();
        sleep(secs(5.0)).await;

        assert_eq!(ended(&drain(&mut rx)), vec![EndReason::Replaced]);
        assert_eq!(audio.state(), AudioState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_uses_reference_ceiling() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, _rx) = setup(backend);
        audio.load(AudioSource::new(TRACK)).await.unwrap();
        assert_eq!(audio.progress_fraction(), 0.0);

        assert!(audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet).await);
        sleep(secs(1.6)).await;
        assert!((audio.progress_fraction() - 0.1).abs() < 1e-9);

        sleep(secs(2.0)).await;
        assert_eq!(audio.progress_fraction(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_segment_elapsed_is_capped() {
        let segment = Segment {
            mode: PlayMode::Snippet,
            offset: Duration::ZERO,
            duration: Some(secs(3.0)),
            started_at: Instant::now(),
        };
        tokio::time::advance(secs(5.0)).await;
        assert_eq!(segment.elapsed(), secs(3.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_track_pause_resume() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, mut rx) = setup(backend.clone());
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        assert!(audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::FullTrack).await);
        sleep(secs(10.0)).await;
        assert!(audio.is_playing(), "full tracks ignore the snippet bound");
        assert!((audio.progress_fraction() - 1.0 / 3.0).abs() < 1e-9);

        assert!(audio.pause());
        assert!(audio.is_paused());
        assert_eq!(audio.position(), secs(10.0));
        assert_eq!(audio.state(), AudioState::Ready);

        assert!(audio.resume().await);
        assert_eq!(backend.calls().last(), Some(&BackendCall::Play(secs(10.0))));
        assert!(!audio.resume().await);

        sleep(secs(20.5)).await;
        assert!(!audio.is_playing());
        assert_eq!(
            ended(&drain(&mut rx)),
            vec![EndReason::Paused, EndReason::TrackEnded]
        );
    }

    #[tokio::test]
    async fn test_resume_without_pause_starts_from_beginning() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, _rx) = setup(backend.clone());
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        assert!(audio.resume().await);
        assert_eq!(audio.play_mode(), Some(PlayMode::FullTrack));
        assert_eq!(backend.calls().last(), Some(&BackendCall::Play(Duration::ZERO)));
    }

    #[tokio::test]
    async fn test_pause_rejected_for_snippets() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, _rx) = setup(backend);
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        assert!(audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet).await);
        assert!(!audio.pause());
        assert!(audio.is_playing());
    }

    #[tokio::test]
    async fn test_playback_failure_reverts_to_ready() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(30.0));
        let (audio, mut rx) = setup(backend.clone());
        audio.load(AudioSource::new(TRACK)).await.unwrap();
        drain(&mut rx);

        backend.set_playback_failure(true);
        assert!(!audio.play_segment(Duration::ZERO, Some(secs(3.0)), PlayMode::Snippet).await);
        assert_eq!(audio.state(), AudioState::Ready);
        assert!(!audio.is_playing());
        assert!(matches!(drain(&mut rx).as_slice(), [AudioEvent::Error { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snippet_longer_than_media_ends_with_track() {
        let backend = SimulatedBackend::new().with_track(TRACK, secs(2.0));
        let (audio, mut rx) = setup(backend);
        audio.load(AudioSource::new(TRACK)).await.unwrap();

        assert!(audio.play_segment(Duration::ZERO, Some(secs(5.0)), PlayMode::Snippet).await);
        sleep(secs(2.5)).await;
        assert!(!audio.is_playing());
        assert_eq!(ended(&drain(&mut rx)), vec![EndReason::TrackEnded]);
    }
}

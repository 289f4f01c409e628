// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Game engine.
//!
//! [`Game`] owns the catalog, the session, the playback coordinator and the
//! event bus, and keeps audio side effects in step with session
//! transitions. Every mutating operation ends by publishing a
//! [`GameEvent::StateChanged`] snapshot.

use std::collections::HashSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::session::{GameSession, GameSnapshot, GameStatus, TurnResult};
use crate::audio::{AudioBackend, AudioCoordinator, AudioError, AudioSource, PlayMode};
use crate::catalog::{CatalogError, Song, SongCatalog, SongId};
use crate::config::{ConfigError, GameConfig};
use crate::events::{EventBus, GameEvent};
use crate::matcher;

/// Why a round could not start. The session is left unchanged.
#[derive(Debug, Error)]
pub enum RoundStartError {
    /// Catalog could not supply a song
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Every song tried failed to load its audio
    #[error("No playable song after {attempts} attempt(s): {source}")]
    NoPlayableSong {
        attempts: usize,
        #[source]
        source: AudioError,
    },

    /// Requested song is not in the catalog
    #[error("Song not found: {0}")]
    SongNotFound(SongId),

    /// Another load took over the audio while this round was starting
    #[error("Round start superseded by a newer request")]
    Superseded,
}

/// Song chosen for a round, before it is committed to the session
struct Candidate {
    song: Song,
    reset_played: bool,
}

/// Reloads the current round's audio if a round start is dropped before it
/// settles. Disarmed once the start commits or has restored audio itself.
struct RestoreOnDrop<B: AudioBackend> {
    audio: AudioCoordinator<B>,
    source: Option<AudioSource>,
}

impl<B: AudioBackend> RestoreOnDrop<B> {
    fn disarm(&mut self) {
        self.source = None;
    }
}

impl<B: AudioBackend> Drop for RestoreOnDrop<B> {
    fn drop(&mut self) {
        let Some(source) = self.source.take() else {
            return;
        };
        // A later load wins over the restore
        let generation = self.audio.load_generation();
        let audio = self.audio.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(source = %source, "round start dropped, restoring audio");
                handle.spawn(async move {
                    if let Err(err) = audio.reload_if_current(generation, source).await {
                        debug!(error = %err, "audio restore skipped");
                    }
                });
            }
            Err(_) => warn!(source = %source, "round start dropped outside a runtime, audio not restored"),
        }
    }
}

/// The game: session state plus everything it coordinates
pub struct Game<B: AudioBackend> {
    config: GameConfig,
    catalog: SongCatalog,
    session: GameSession,
    audio: AudioCoordinator<B>,
    events: EventBus,
    rng: StdRng,
}

impl<B: AudioBackend> Game<B> {
    /// Create a game. No round is started.
    pub fn new(config: GameConfig, catalog: SongCatalog, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;
        let ladder = config.snippet_ladder()?;

        let events = EventBus::default();
        let audio = AudioCoordinator::new(backend, ladder.longest(), events.clone());
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            catalog,
            session: GameSession::new(ladder),
            audio,
            events,
            rng,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SongCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Playback coordinator handle
    pub fn audio(&self) -> &AudioCoordinator<B> {
        &self.audio
    }

    /// Event bus shared with the coordinator
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to state and audio events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Current state
    pub fn snapshot(&self) -> GameSnapshot {
        self.session.snapshot()
    }

    pub fn status(&self) -> GameStatus {
        self.session.status()
    }

    fn notify(&self) {
        self.events
            .emit(GameEvent::StateChanged(Box::new(self.session.snapshot())));
    }

    fn source_for(&self, song: &Song) -> AudioSource {
        AudioSource::for_song(song, &self.config.audio_base)
    }

    /// Guard for a round start about to replace the loaded media
    fn restore_guard(&self) -> RestoreOnDrop<B> {
        let source = match self.session.current_song() {
            Some(song) if self.session.audio_available() => Some(self.source_for(song)),
            _ => None,
        };
        RestoreOnDrop {
            audio: self.audio.clone(),
            source,
        }
    }

    /// Start a new round on a random unplayed song.
    ///
    /// Up to `max_selection_attempts` distinct songs are tried until one
    /// loads. Nothing is committed until a song is settled on, so if this
    /// future is dropped or fails the previous round stays as it was and
    /// its audio is loaded again.
    pub async fn start_round(&mut self) -> Result<Song, RoundStartError> {
        let played = self.session.played().ids().clone();
        let mut tried: HashSet<SongId> = HashSet::new();
        let mut reset = false;
        let mut last_failure: Option<(Candidate, AudioError)> = None;
        let mut attempts = 0;
        let mut guard = self.restore_guard();

        while attempts < self.config.max_selection_attempts && !self.catalog.is_covered_by(&tried) {
            attempts += 1;

            let excluded: HashSet<SongId> = if reset {
                tried.clone()
            } else {
                played.union(&tried).cloned().collect()
            };
            let mut selection = self.catalog.pick_random(&excluded, &mut self.rng)?;
            if selection.reset && !reset && !tried.is_empty() {
                // Exhausted: draw again from everything except this call's failures
                selection = self.catalog.pick_random(&tried, &mut self.rng)?;
                reset = true;
            }
            reset |= selection.reset;

            let candidate = Candidate {
                song: selection.song.clone(),
                reset_played: reset,
            };
            debug!(song = %candidate.song.id, attempt = attempts, reset, "selected song");

            match self.audio.load(self.source_for(&candidate.song)).await {
                Ok(_) => {
                    guard.disarm();
                    return Ok(self.commit(candidate, true));
                }
                Err(AudioError::Superseded) => {
                    guard.disarm();
                    return Err(RoundStartError::Superseded);
                }
                Err(err) => {
                    warn!(song = %candidate.song.id, error = %err, "song audio unavailable");
                    tried.insert(candidate.song.id.clone());
                    last_failure = Some((candidate, err));
                }
            }
        }

        let result = match last_failure {
            Some((candidate, _)) if self.config.proceed_without_audio => {
                warn!(song = %candidate.song.id, "starting round without audio");
                Ok(self.commit(candidate, false))
            }
            Some((_, source)) => {
                self.restore_audio().await;
                Err(RoundStartError::NoPlayableSong { attempts, source })
            }
            None => Err(CatalogError::Empty.into()),
        };
        guard.disarm();
        result
    }

    /// Start a new round on a specific song
    pub async fn start_round_with(&mut self, id: &SongId) -> Result<Song, RoundStartError> {
        let song = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| RoundStartError::SongNotFound(id.clone()))?;
        let candidate = Candidate {
            reset_played: self.catalog.is_covered_by(self.session.played().ids()),
            song,
        };

        let mut guard = self.restore_guard();
        let result = match self.audio.load(self.source_for(&candidate.song)).await {
            Ok(_) => Ok(self.commit(candidate, true)),
            Err(AudioError::Superseded) => Err(RoundStartError::Superseded),
            Err(_) if self.config.proceed_without_audio => Ok(self.commit(candidate, false)),
            Err(source) => {
                self.restore_audio().await;
                Err(RoundStartError::NoPlayableSong { attempts: 1, source })
            }
        };
        guard.disarm();
        result
    }

    fn commit(&mut self, candidate: Candidate, audio_available: bool) -> Song {
        let Candidate { song, reset_played } = candidate;
        self.session.reset_for(song.clone(), reset_played, audio_available);
        info!(
            round = self.session.round(),
            song = %song.id,
            audio_available,
            "round started"
        );
        self.notify();
        song
    }

    /// Failed selection attempts replaced the loaded media; put the current
    /// round's audio back.
    async fn restore_audio(&mut self) {
        let Some(song) = self.session.current_song() else {
            return;
        };
        if !self.session.audio_available() {
            return;
        }

        let source = self.source_for(song);
        if let Err(err) = self.audio.load(source).await {
            warn!(error = %err, "could not restore audio for the current round");
            self.session.set_audio_available(false);
            self.notify();
        }
    }

    /// Start the round clock. Returns false if already running or no round
    /// is in progress.
    pub fn begin_timer(&mut self) -> bool {
        let started = self.session.begin_timer();
        if started {
            debug!("round timer started");
            self.notify();
        }
        started
    }

    /// Submit a guess. Returns false if it was ignored.
    pub fn submit_guess(&mut self, text: &str) -> bool {
        let result = self.session.submit_guess(text);
        match result {
            TurnResult::Ignored => return false,
            TurnResult::Won => {
                self.audio.stop();
                info!(turn = self.session.current_turn() + 1, "round won");
            }
            TurnResult::Lost => {
                self.audio.stop();
                info!("round lost");
            }
            TurnResult::Continue => {
                debug!(turn = self.session.current_turn(), "incorrect guess");
            }
        }
        self.notify();
        true
    }

    /// Skip to a longer snippet. Returns false if no round is in progress.
    pub fn skip_turn(&mut self) -> bool {
        if self.session.status() != GameStatus::Playing {
            return false;
        }

        self.audio.stop();
        match self.session.skip_turn() {
            TurnResult::Ignored => return false,
            TurnResult::Lost => info!("round lost"),
            _ => debug!(
                snippet = ?self.session.current_snippet_length(),
                "turn skipped"
            ),
        }
        self.notify();
        true
    }

    pub fn current_snippet_length(&self) -> Duration {
        self.session.current_snippet_length()
    }

    pub fn next_snippet_length(&self) -> Option<Duration> {
        self.session.next_snippet_length()
    }

    pub fn skip_bonus(&self) -> Option<Duration> {
        self.session.skip_bonus()
    }

    /// Play the current snippet from the configured offset
    pub async fn play_snippet(&self) -> bool {
        if self.session.status() != GameStatus::Playing || !self.session.audio_available() {
            return false;
        }
        let length = self.session.current_snippet_length();
        self.audio
            .play_segment(self.config.snippet_offset(), Some(length), PlayMode::Snippet)
            .await
    }

    /// Play the whole track once the round is over
    pub async fn play_full_track(&self) -> bool {
        if !self.session.is_over() || !self.session.audio_available() {
            return false;
        }
        self.audio
            .play_segment(Duration::ZERO, None, PlayMode::FullTrack)
            .await
    }

    /// Pause full-track playback
    pub fn pause(&self) -> bool {
        self.audio.pause()
    }

    /// Resume full-track playback once the round is over
    pub async fn resume(&self) -> bool {
        if !self.session.is_over() || !self.session.audio_available() {
            return false;
        }
        self.audio.resume().await
    }

    pub fn stop_audio(&self) {
        self.audio.stop();
    }

    /// Playback progress in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.audio.progress_fraction()
    }

    /// Closest catalog song to a guess, for feedback only
    pub fn closest_match(&self, text: &str) -> Option<&Song> {
        matcher::find_best_match(text, self.catalog.songs())
    }

    /// Catalog songs matching a partial query
    pub fn suggestions(&self, query: &str, limit: usize) -> Vec<&Song> {
        self.catalog.search(query, limit)
    }
}

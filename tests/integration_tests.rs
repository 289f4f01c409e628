// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for Beatle
//!
//! These tests drive the public API end to end: catalog loading, round
//! selection, guessing, skipping and snippet playback on the simulated
//! backend with a paused clock.

use std::collections::HashSet;
use std::fs;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};

use beatle::audio::{AudioSource, AudioState, BackendCall};
use beatle::events::EndReason;
use beatle::matcher::{is_exact_match, normalize};
use beatle::{
    AudioEvent, Game, GameConfig, GameEvent, GameStatus, PlayMode, SimulatedBackend, Song, SongCatalog,
    SongId,
};

const CATALOG_JSON: &str = r#"[
    {"id": 1, "title": "Imagine", "artist": "John Lennon", "filename": "imagine.mp3"},
    {"id": 2, "title": "Yesterday", "artist": "The Beatles", "filename": "yesterday.mp3"}
]"#;

fn catalog() -> SongCatalog {
    SongCatalog::from_json(CATALOG_JSON).unwrap()
}

fn backend() -> SimulatedBackend {
    SimulatedBackend::new()
        .with_track("audio/imagine.mp3", Duration::from_secs(180))
        .with_track("audio/yesterday.mp3", Duration::from_secs(125))
}

fn config() -> GameConfig {
    GameConfig {
        rng_seed: Some(3),
        ..GameConfig::default()
    }
}

/// Game with a round started on song 1 ("Imagine")
async fn imagine_round() -> (Game<SimulatedBackend>, SimulatedBackend) {
    let backend = backend();
    let mut game = Game::new(config(), catalog(), backend.clone()).unwrap();
    game.start_round_with(&SongId::from(1u64)).await.unwrap();
    (game, backend)
}

fn audio_events(rx: &mut broadcast::Receiver<GameEvent>) -> Vec<AudioEvent> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            GameEvent::Audio(audio) => Some(audio),
            GameEvent::StateChanged(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn test_start_round_state() {
    let mut game = Game::new(config(), catalog(), backend()).unwrap();
    let song = game.start_round().await.unwrap();

    let snapshot = game.snapshot();
    assert_eq!(snapshot.status, GameStatus::Playing);
    assert_eq!(snapshot.current_turn, 0);
    assert_eq!(snapshot.snippet_index, 0);
    assert_eq!(snapshot.song, Some(song));
    assert!(snapshot.history.is_empty());
    assert!(!snapshot.timer_started);
}

#[tokio::test(start_paused = true)]
async fn test_exact_title_guess_wins() {
    let (mut game, _) = imagine_round().await;
    assert!(game.begin_timer());
    sleep(Duration::from_secs(4)).await;

    assert!(game.submit_guess("imagine"));
    assert_eq!(game.status(), GameStatus::Won);
    assert!(game.session().end_time().is_some());
    assert_eq!(game.snapshot().elapsed, Some(Duration::from_secs(4)));
}

#[tokio::test]
async fn test_wrong_song_guess_consumes_turn_only() {
    let (mut game, _) = imagine_round().await;

    assert!(game.submit_guess("beatles"));
    assert_eq!(game.status(), GameStatus::Playing);
    assert_eq!(game.session().current_turn(), 1);
    assert_eq!(game.session().snippet_index(), 0);
    assert_eq!(game.current_snippet_length(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_five_skips_lose() {
    let (mut game, _) = imagine_round().await;

    for _ in 0..5 {
        assert!(game.skip_turn());
    }
    assert_eq!(game.status(), GameStatus::Lost);
    assert_eq!(game.session().snippet_index(), 4);
    assert_eq!(game.current_snippet_length(), Duration::from_secs(16));
    assert_eq!(game.session().current_turn(), 4);
    assert!(game.session().end_time().is_none());
    assert!(!game.skip_turn());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_auto_stop() {
    let (game, backend) = imagine_round().await;
    let mut rx = game.subscribe();
    backend.clear_calls();

    let start = Instant::now();
    assert!(game
        .audio()
        .play_segment(Duration::ZERO, Some(Duration::from_secs(3)), PlayMode::Snippet)
        .await);
    sleep(Duration::from_secs(1)).await;
    game.stop_audio();
    sleep(Duration::from_secs(5)).await;
    assert!(start.elapsed() >= Duration::from_secs(6));

    let ended: Vec<EndReason> = audio_events(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            AudioEvent::PlaybackEnded { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(ended, vec![EndReason::Stopped]);
    assert_eq!(
        backend.calls(),
        vec![BackendCall::Play(Duration::ZERO), BackendCall::Pause]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stale_timer_ignored_after_new_round() {
    let (mut game, _) = imagine_round().await;
    let mut rx = game.subscribe();

    assert!(game.play_snippet().await);
    game.start_round_with(&SongId::from(2u64)).await.unwrap();
    assert!(game.play_snippet().await);

    // Only the new 2s snippet's timer may end playback
    sleep(Duration::from_millis(1900)).await;
    assert!(game.audio().is_playing());
    sleep(Duration::from_millis(200)).await;
    assert!(!game.audio().is_playing());

    let ended: Vec<EndReason> = audio_events(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            AudioEvent::PlaybackEnded { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(ended, vec![EndReason::Replaced, EndReason::Completed]);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_start_round_keeps_prior_state() {
    let backend = backend().with_load_latency(Duration::from_secs(1));
    let mut game = Game::new(config(), catalog(), backend).unwrap();
    game.start_round_with(&SongId::from(1u64)).await.unwrap();
    game.skip_turn();

    let cancelled = tokio::time::timeout(Duration::from_millis(500), game.start_round()).await;
    assert!(cancelled.is_err());

    assert_eq!(game.session().current_turn(), 1);
    assert_eq!(
        game.session().current_song().map(|s| s.id.clone()),
        Some(SongId::from(1u64))
    );
    assert!(game.session().audio_available());

    // The current song's audio comes back and plays
    sleep(Duration::from_secs(2)).await;
    assert_eq!(game.audio().state(), AudioState::Ready);
    assert_eq!(game.audio().source(), Some(AudioSource::new("audio/imagine.mp3")));
    assert!(game.play_snippet().await);

    // The replacement request runs to completion
    let song = game.start_round().await.unwrap();
    assert_eq!(game.session().current_song(), Some(&song));
    assert_eq!(game.session().current_turn(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_scale_is_longest_snippet() {
    let (mut game, _) = imagine_round().await;

    game.skip_turn();
    assert!(game.play_snippet().await);
    sleep(Duration::from_secs(2)).await;
    assert!((game.progress() - 2.0 / 16.0).abs() < 1e-9);

    // Polled after the 3s snippet ended: never beyond its own share
    sleep(Duration::from_secs(2)).await;
    assert!(game.progress() <= 3.0 / 16.0);
}

#[tokio::test(start_paused = true)]
async fn test_full_track_after_loss() {
    let (mut game, _) = imagine_round().await;
    let mut rx = game.subscribe();
    for _ in 0..5 {
        game.skip_turn();
    }

    assert!(game.play_full_track().await);
    sleep(Duration::from_secs(60)).await;
    assert!(game.pause());
    assert_eq!(game.audio().position(), Duration::from_secs(60));

    assert!(game.resume().await);
    sleep(Duration::from_secs(121)).await;
    assert!(!game.audio().is_playing());

    let ended: Vec<EndReason> = audio_events(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            AudioEvent::PlaybackEnded { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(ended, vec![EndReason::Paused, EndReason::TrackEnded]);
}

#[tokio::test]
async fn test_state_change_after_every_mutation() {
    let (mut game, _) = imagine_round().await;
    let mut rx = game.subscribe();

    game.begin_timer();
    game.submit_guess("yesterday");
    game.skip_turn();
    game.submit_guess("   ");
    game.submit_guess("john lennon imagine");

    let statuses: Vec<(GameStatus, usize)> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            GameEvent::StateChanged(snapshot) => Some((snapshot.status, snapshot.current_turn)),
            GameEvent::Audio(_) => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            (GameStatus::Playing, 0),
            (GameStatus::Playing, 1),
            (GameStatus::Playing, 2),
            (GameStatus::Won, 2),
        ]
    );
}

#[tokio::test]
async fn test_catalog_file_to_round() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("songs.json");
    fs::write(&path, CATALOG_JSON).unwrap();

    let catalog = SongCatalog::load(&path).await.unwrap();
    let mut game = Game::new(config(), catalog, backend()).unwrap();
    game.start_round().await.unwrap();
    assert_eq!(game.status(), GameStatus::Playing);
}

#[test]
fn test_skip_index_bounded_and_monotonic() {
    for skips in 0..8 {
        let mut session = beatle::GameSession::new(Default::default());
        session.reset_for(Song::new(1u64, "Imagine", "John Lennon", "imagine.mp3"), false, true);

        let mut last = session.snippet_index();
        for _ in 0..skips {
            session.skip_turn();
            assert!(session.snippet_index() >= last);
            assert!(session.snippet_index() <= 4);
            last = session.snippet_index();
        }
    }
}

#[test]
fn test_turns_increase_by_one_until_loss() {
    let mut session = beatle::GameSession::new(Default::default());
    session.reset_for(Song::new(1u64, "Imagine", "John Lennon", "imagine.mp3"), false, true);

    let guesses = ["a song", "another", "nope", "still no"];
    for (expected, guess) in guesses.iter().enumerate() {
        assert_eq!(session.current_turn(), expected);
        session.submit_guess(guess);
        assert_eq!(session.current_turn(), expected + 1);
    }
    session.skip_turn();
    assert_eq!(session.current_turn(), 4);
    assert_eq!(session.status(), GameStatus::Lost);
}

#[test]
fn test_canonical_forms_always_match() {
    for song in catalog().songs() {
        assert!(is_exact_match(&song.title, song));
        assert!(is_exact_match(&song.artist.to_uppercase(), song));
        assert!(is_exact_match(&format!("{} {}", song.artist, song.title), song));
        assert!(is_exact_match(&format!("{}, {}!", song.title, song.artist), song));
    }
}

#[test]
fn test_strict_substring_never_matches() {
    let song = Song::new(9u64, "Lovely Day", "Bill Withers", "lovely.mp3");
    let title = normalize(&song.title);
    for end in 1..title.len() {
        assert!(!is_exact_match(&title[..end], &song), "{:?} matched", &title[..end]);
    }
}

#[test]
fn test_pick_respects_exclusion_until_exhausted() {
    let songs = (1..=6u64)
        .map(|i| Song::new(i, format!("Song {}", i), "Band", format!("{}.mp3", i)))
        .collect();
    let catalog = SongCatalog::new(songs).unwrap();
    let mut rng = StdRng::seed_from_u64(42);

    let mut excluded: HashSet<SongId> = HashSet::new();
    for _ in 0..6 {
        let selection = catalog.pick_random(&excluded, &mut rng).unwrap();
        assert!(!selection.reset);
        assert!(excluded.insert(selection.song.id.clone()));
    }

    let selection = catalog.pick_random(&excluded, &mut rng).unwrap();
    assert!(selection.reset);
}

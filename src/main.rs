// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::Level;

use beatle::audio::AudioBackend;
use beatle::events::EndReason;
use beatle::game::GuessRecord;
use beatle::{AudioEvent, Game, GameConfig, GameEvent, GameStatus, PlayMode, SongCatalog};

fn print_usage() {
    println!("Beatle - Guess the song from ever longer snippets");
    println!();
    println!("Usage: beatle [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  play                 Play interactively on the terminal");
    println!("  list                 List the song catalog");
    println!("  check                Validate configuration and catalog");
    println!();
    println!("Options:");
    println!("  --config <FILE>      Game configuration (YAML or TOML)");
    println!("  --catalog <FILE>     Song catalog (JSON or YAML)");
    println!("  --audio-dir <DIR>    Directory or URL prefix holding the audio files");
    println!("  --seed <N>           Seed song selection");
    println!("  --verbose            Debug logging");
    println!("  --help               Show this help message");
}

fn print_commands() {
    println!("Commands during a round:");
    println!("  play                 Play the snippet (the full track once the round is over)");
    println!("  skip                 Skip to a longer snippet (uses a turn)");
    println!("  guess <text>         Guess title and/or artist (bare text works too)");
    println!("  search <text>        Look up songs in the catalog");
    println!("  pause / resume       Pause or resume the full track");
    println!("  new                  Start a new round");
    println!("  quit                 Exit");
}

/// Parsed command line
#[derive(Debug, Default)]
struct CliArgs {
    command: Option<String>,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    audio_dir: Option<String>,
    seed: Option<u64>,
    verbose: bool,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{} requires a value", name))
        };
        match arg.as_str() {
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--catalog" => cli.catalog = Some(PathBuf::from(value("--catalog")?)),
            "--audio-dir" => cli.audio_dir = Some(value("--audio-dir")?),
            "--seed" => {
                let raw = value("--seed")?;
                let seed = raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid seed: {}", raw))?;
                cli.seed = Some(seed);
            }
            "--verbose" | "-v" => cli.verbose = true,
            "--help" | "-h" => cli.help = true,
            other if other.starts_with('-') => anyhow::bail!("Unknown option: {}", other),
            other => {
                if cli.command.is_some() {
                    anyhow::bail!("Unexpected argument: {}", other);
                }
                cli.command = Some(other.to_string());
            }
        }
    }

    Ok(cli)
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &CliArgs) -> Result<GameConfig> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    if let Some(catalog) = &cli.catalog {
        config.catalog_path = catalog.clone();
    }
    if let Some(audio_dir) = &cli.audio_dir {
        config.audio_base = audio_dir.clone();
    }
    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn load_catalog(config: &GameConfig) -> Result<SongCatalog> {
    SongCatalog::load(&config.catalog_path)
        .await
        .with_context(|| format!("Failed to load catalog {:?}", config.catalog_path))
}

fn secs(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}s", secs)
    } else {
        format!("{:.1}s", secs)
    }
}

fn list_catalog(catalog: &SongCatalog) {
    for song in catalog.songs() {
        println!("{:>5}  {}  ({})", song.id, song.label(), song.filename);
    }
    println!("{} songs", catalog.len());
}

fn check(config: &GameConfig, catalog: &SongCatalog) -> Result<()> {
    let ladder = config.snippet_ladder()?;
    let lengths: Vec<String> = ladder.lengths().iter().copied().map(secs).collect();
    println!("Configuration OK");
    println!("  turns:    {}", config.max_turns);
    println!("  snippets: {}", lengths.join(", "));
    println!("  offset:   {}", secs(config.snippet_offset()));
    println!("  audio:    {}", config.audio_base);
    println!("Catalog OK: {} songs from {:?}", catalog.len(), config.catalog_path);
    Ok(())
}

async fn print_audio_events(mut events: broadcast::Receiver<GameEvent>) {
    loop {
        match events.recv().await {
            Ok(GameEvent::Audio(event)) => match event {
                AudioEvent::PlaybackStarted {
                    mode: PlayMode::Snippet,
                    duration: Some(duration),
                    ..
                } => println!("  ♪ playing {} snippet", secs(duration)),
                AudioEvent::PlaybackStarted {
                    mode: PlayMode::FullTrack,
                    offset,
                    ..
                } => println!("  ♪ playing full track from {}", secs(offset)),
                AudioEvent::PlaybackEnded {
                    reason: EndReason::Completed,
                    ..
                } => println!("  (snippet over)"),
                AudioEvent::PlaybackEnded {
                    reason: EndReason::TrackEnded,
                    ..
                } => println!("  (track over)"),
                AudioEvent::Error { message } => println!("  audio error: {}", message),
                _ => {}
            },
            Ok(GameEvent::StateChanged(_)) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_turn<B: AudioBackend>(game: &Game<B>) {
    let session = game.session();
    let skip = match game.skip_bonus() {
        Some(bonus) => format!(", skip for +{}", secs(bonus)),
        None => String::new(),
    };
    println!(
        "Turn {}/{}: snippet {}{}",
        session.current_turn() + 1,
        session.max_turns(),
        secs(game.current_snippet_length()),
        skip
    );
}

fn print_result<B: AudioBackend>(game: &Game<B>) {
    let snapshot = game.snapshot();
    let Some(song) = &snapshot.song else {
        return;
    };
    let time = snapshot
        .elapsed
        .map(|elapsed| format!(" in {}", secs(elapsed)))
        .unwrap_or_default();

    match snapshot.status {
        GameStatus::Won => {
            let turns = snapshot.history.len();
            println!(
                "Correct! {} ({} {}{})",
                song.label(),
                turns,
                if turns == 1 { "guess" } else { "guesses" },
                time
            );
        }
        GameStatus::Lost => println!("Out of turns. It was {}{}", song.label(), time),
        _ => return,
    }
    println!("Type `play` to hear the whole track or `new` for another round.");
}

fn print_miss<B: AudioBackend>(game: &Game<B>, record: &GuessRecord) {
    let text = record.text().unwrap_or_default();
    let closest = game
        .closest_match(text)
        .map(|song| format!(" (closest: {})", song.label()))
        .unwrap_or_default();
    println!("✗ {} guess: {}{}", record.ordinal_label(), text, closest);
}

async fn start_round<B: AudioBackend>(game: &mut Game<B>) {
    match game.start_round().await {
        Ok(_) => {
            println!();
            println!("Round {}. Type `play` to hear the snippet.", game.session().round());
            if !game.session().audio_available() {
                println!("(audio unavailable for this song; guess from the turn cues)");
            }
            print_turn(game);
        }
        Err(err) => println!("Could not start a round: {}. Type `new` to retry.", err),
    }
}

async fn run_game<B: AudioBackend>(mut game: Game<B>) -> Result<()> {
    tokio::spawn(print_audio_events(game.subscribe()));

    print_commands();
    start_round(&mut game).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "quit" | "exit" | "q" => break,
            "help" | "?" => print_commands(),
            "new" | "n" => start_round(&mut game).await,
            "play" | "p" => {
                let started = if game.session().is_over() {
                    game.play_full_track().await
                } else {
                    game.begin_timer();
                    game.play_snippet().await
                };
                if !started {
                    println!("Nothing to play.");
                }
            }
            "skip" | "s" => {
                if game.skip_turn() {
                    match game.status() {
                        GameStatus::Playing => print_turn(&game),
                        _ => print_result(&game),
                    }
                }
            }
            "search" => {
                for song in game.suggestions(rest, 5) {
                    println!("  {}", song.label());
                }
            }
            "pause" => {
                if !game.pause() {
                    println!("Only the full track can be paused.");
                }
            }
            "resume" => {
                if !game.resume().await {
                    println!("Nothing to resume.");
                }
            }
            _ => {
                let guess = if command == "guess" || command == "g" { rest } else { line };
                if !game.submit_guess(guess) {
                    if game.session().status() != GameStatus::Playing {
                        println!("No round in progress. Type `new` to start one.");
                    }
                    continue;
                }

                match game.status() {
                    GameStatus::Playing => {
                        if let Some(record) = game.session().history().last() {
                            print_miss(&game, record);
                        }
                        print_turn(&game);
                    }
                    _ => print_result(&game),
                }
            }
        }
    }

    game.stop_audio();
    Ok(())
}

#[cfg(feature = "playback")]
fn backend() -> Result<beatle::audio::RodioBackend> {
    beatle::audio::RodioBackend::new().context("Failed to open audio output")
}

#[cfg(not(feature = "playback"))]
fn backend() -> Result<beatle::SimulatedBackend> {
    println!("(built without the `playback` feature: snippets are silent)");
    Ok(beatle::SimulatedBackend::permissive(Duration::from_secs(30)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    if cli.help || cli.command.is_none() {
        print_usage();
        return Ok(());
    }
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let catalog = load_catalog(&config).await?;

    match cli.command.as_deref() {
        Some("list") => list_catalog(&catalog),
        Some("check") => check(&config, &catalog)?,
        Some("play") => {
            let game = Game::new(config, catalog, backend()?)?;
            run_game(game).await?;
        }
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
        None => print_usage(),
    }

    Ok(())
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via rodio.
//!
//! rodio's output stream cannot leave the thread that created it, so a
//! dedicated audio thread owns the stream and the current sink and serves
//! commands sent over a channel. Locators are file paths.

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::{AudioBackend, AudioError, AudioSource, BackendFuture, MediaInfo};

type Reply<T> = oneshot::Sender<Result<T, AudioError>>;

enum Command {
    Open { locator: String, reply: Reply<MediaInfo> },
    Play { offset: Duration, reply: Reply<()> },
    Pause,
}

/// Media bytes held in memory so every play can decode from any offset
struct OpenMedia {
    locator: String,
    bytes: Arc<[u8]>,
}

fn decoder(bytes: &Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>, String> {
    Decoder::new(Cursor::new(Arc::clone(bytes))).map_err(|e| e.to_string())
}

/// Duration from the container, or by decoding every sample
fn measure(bytes: &Arc<[u8]>) -> Result<Duration, String> {
    let source = decoder(bytes)?;
    if let Some(duration) = source.total_duration() {
        return Ok(duration);
    }

    let channels = u64::from(source.channels().max(1));
    let rate = u64::from(source.sample_rate().max(1));
    let samples = source.count() as u64;
    Ok(Duration::from_secs_f64(samples as f64 / (channels * rate) as f64))
}

struct AudioThread {
    handle: OutputStreamHandle,
    media: Option<OpenMedia>,
    sink: Option<Sink>,
}

impl AudioThread {
    fn halt(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn open(&mut self, locator: String) -> Result<MediaInfo, AudioError> {
        self.halt();
        self.media = None;

        let load_error = |reason: String| AudioError::Load {
            locator: locator.clone(),
            reason,
        };
        let bytes: Arc<[u8]> = std::fs::read(&locator)
            .map_err(|e| load_error(e.to_string()))?
            .into();
        let duration = measure(&bytes).map_err(load_error)?;

        debug!(locator = %locator, ?duration, "media opened");
        self.media = Some(OpenMedia { locator, bytes });
        Ok(MediaInfo { duration })
    }

    fn play(&mut self, offset: Duration) -> Result<(), AudioError> {
        self.halt();
        let media = self.media.as_ref().ok_or(AudioError::NotReady)?;

        let source = decoder(&media.bytes).map_err(AudioError::Playback)?;
        let sink = Sink::try_new(&self.handle).map_err(|e| AudioError::Playback(e.to_string()))?;
        sink.append(source.skip_duration(offset));
        sink.play();

        debug!(locator = %media.locator, ?offset, "sink started");
        self.sink = Some(sink);
        Ok(())
    }

    fn run(mut self, commands: mpsc::Receiver<Command>) {
        for command in commands {
            match command {
                Command::Open { locator, reply } => {
                    let _ = reply.send(self.open(locator));
                }
                Command::Play { offset, reply } => {
                    let _ = reply.send(self.play(offset));
                }
                Command::Pause => self.halt(),
            }
        }
        self.halt();
    }
}

/// Backend playing through the default output device
pub struct RodioBackend {
    commands: mpsc::Sender<Command>,
}

impl RodioBackend {
    /// Open the default output device and start the audio thread
    pub fn new() -> Result<Self, AudioError> {
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        thread::Builder::new()
            .name("beatle-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Playback(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                AudioThread {
                    handle,
                    media: None,
                    sink: None,
                }
                .run(receiver);
            })
            .map_err(|e| AudioError::Playback(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| AudioError::Playback("audio thread exited".to_string()))??;
        Ok(Self { commands })
    }

    fn request<T: Send + 'static>(&self, build: impl FnOnce(Reply<T>) -> Command) -> BackendFuture<T> {
        let (reply, response) = oneshot::channel();
        let sent = self.commands.send(build(reply)).is_ok();

        Box::pin(async move {
            if !sent {
                return Err(AudioError::Playback("audio thread stopped".to_string()));
            }
            response
                .await
                .unwrap_or_else(|_| Err(AudioError::Playback("audio thread stopped".to_string())))
        })
    }
}

impl AudioBackend for RodioBackend {
    fn load(&mut self, source: &AudioSource) -> BackendFuture<MediaInfo> {
        let locator = source.locator().to_string();
        self.request(|reply| Command::Open { locator, reply })
    }

    fn play(&mut self, offset: Duration) -> BackendFuture<()> {
        self.request(|reply| Command::Play { offset, reply })
    }

    fn pause(&mut self) {
        if self.commands.send(Command::Pause).is_err() {
            warn!("audio thread stopped; pause ignored");
        }
    }
}

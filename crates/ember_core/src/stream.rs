//! cpal playback sink
//!
//! One output stream serves the whole board. Voices are added and removed
//! through a bounded command channel drained at the top of the render
//! callback, so the callback never touches a lock and never allocates.
//!
//! # Architecture
//!
//! ```text
//!  play() / stop()            ember-audio thread            render callback
//!  ──────────────── commands ───────────────────────────▶ drain, mix voices
//!                             owns the cpal::Stream        feed taps (rtrb)
//!                             (cpal streams are not        ship removed
//!                             Send; the stream lives       voices to the
//!                             and dies on this thread) ◀── trash channel
//! ```
//!
//! Removed voice state is shipped back over a trash channel and freed on the
//! ember-audio thread, keeping deallocation out of the render callback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, warn};

use ember_dsp::SpectrumTap;

use crate::error::{EngineError, EngineResult};
use crate::loader::AudioSource;
use crate::sink::{PlaybackHandle, PlaybackSink};
use crate::voice::SharedVolume;

/// Hard cap on concurrently mixed voices; adds beyond this are dropped.
const MAX_SINK_VOICES: usize = 64;

/// Command queue depth between control threads and the render callback.
const COMMAND_QUEUE: usize = 256;

/// How often the ember-audio thread wakes to free trashed voices.
const HOUSEKEEPING_PERIOD: Duration = Duration::from_millis(250);

enum SinkCommand {
    Add(Box<SinkVoice>),
    Remove(u64),
}

/// Render-thread state for one mixed voice.
struct SinkVoice {
    id: u64,
    source: AudioSource,
    volume: Arc<SharedVolume>,
    tap: SpectrumTap,
    /// Fractional read position into the source, advanced by `step`.
    phase: f64,
    /// Source rate / device rate: nearest-neighbour-with-lerp resampling,
    /// good enough for ambient loops.
    step: f64,
    looping: bool,
    finished: bool,
}

impl SinkVoice {
    /// Mix one buffer's worth of this voice into `out` (interleaved), and
    /// feed the spectral tap with the pre-gain mono signal.
    fn render(&mut self, out: &mut [f32], channels: usize) {
        let samples = self.source.samples();
        let len = samples.len();
        if len == 0 {
            self.finished = true;
            return;
        }

        let gain = self.volume.get();
        let frames = out.len() / channels;

        for frame in 0..frames {
            let index = self.phase as usize;
            if index >= len {
                self.finished = true;
                break;
            }
            let next = if index + 1 < len {
                index + 1
            } else if self.looping {
                0
            } else {
                index
            };
            let frac = (self.phase - index as f64) as f32;
            let sample = samples[index] + (samples[next] - samples[index]) * frac;

            self.tap.push(sample);

            let value = sample * gain;
            let base = frame * channels;
            for channel in 0..channels {
                out[base + channel] += value;
            }

            self.phase += self.step;
            if self.phase >= len as f64 {
                if self.looping {
                    self.phase %= len as f64;
                } else {
                    self.finished = true;
                    break;
                }
            }
        }
    }
}

/// cpal-backed [`PlaybackSink`]: one shared output stream, owned by a
/// dedicated audio thread.
pub struct CpalSink {
    command_sender: Sender<SinkCommand>,
    next_id: AtomicU64,
    sample_rate: u32,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open the default output device and start the shared stream.
    pub fn new() -> EngineResult<Self> {
        let (command_sender, command_receiver) = bounded::<SinkCommand>(COMMAND_QUEUE);
        let (ready_sender, ready_receiver) = bounded::<EngineResult<u32>>(1);
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_shutdown = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("ember-audio".into())
            .spawn(move || {
                audio_thread_main(command_receiver, ready_sender, thread_shutdown);
            })
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        let sample_rate = ready_receiver
            .recv()
            .map_err(|_| EngineError::StreamBuildError("audio thread died during setup".into()))??;

        Ok(Self {
            command_sender,
            next_id: AtomicU64::new(1),
            sample_rate,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Output sample rate of the device stream.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl PlaybackSink for CpalSink {
    fn play(
        &self,
        source: AudioSource,
        tap: SpectrumTap,
        looping: bool,
    ) -> EngineResult<Box<dyn PlaybackHandle>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let volume = SharedVolume::new(0.0);

        let voice = Box::new(SinkVoice {
            id,
            step: source.sample_rate() as f64 / self.sample_rate as f64,
            source,
            volume: Arc::clone(&volume),
            tap,
            phase: 0.0,
            looping,
            finished: false,
        });

        self.command_sender
            .try_send(SinkCommand::Add(voice))
            .map_err(|_| EngineError::SinkRejected("command queue full or closed".into()))?;

        Ok(Box::new(CpalHandle {
            id,
            volume,
            command_sender: self.command_sender.clone(),
        }))
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

struct CpalHandle {
    id: u64,
    volume: Arc<SharedVolume>,
    command_sender: Sender<SinkCommand>,
}

impl PlaybackHandle for CpalHandle {
    fn set_volume(&self, volume: f32) {
        self.volume.set(volume.clamp(0.0, 1.0));
    }

    fn stop(&self) {
        // Best-effort: if the stream is already gone there is nothing to stop
        let _ = self.command_sender.try_send(SinkCommand::Remove(self.id));
    }
}

/// Owns the cpal stream for its whole life; parks between housekeeping
/// rounds that free voices the render callback retired.
fn audio_thread_main(
    commands: Receiver<SinkCommand>,
    ready: Sender<EngineResult<u32>>,
    shutdown: Arc<AtomicBool>,
) {
    let (trash_sender, trash_receiver) = bounded::<Box<SinkVoice>>(MAX_SINK_VOICES);

    let built = build_output_stream(commands, trash_sender);
    let stream = match built {
        Ok((stream, sample_rate)) => {
            if let Err(e) = stream.play() {
                let _ = ready.send(Err(EngineError::StreamPlayError(e.to_string())));
                return;
            }
            let _ = ready.send(Ok(sample_rate));
            info!(sample_rate, "audio output stream started");
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    while !shutdown.load(Ordering::SeqCst) {
        thread::park_timeout(HOUSEKEEPING_PERIOD);
        while let Ok(voice) = trash_receiver.try_recv() {
            debug!(voice = voice.id, "freed retired sink voice");
        }
    }

    drop(stream);
    debug!("audio output stream stopped");
}

fn build_output_stream(
    commands: Receiver<SinkCommand>,
    trash: Sender<Box<SinkVoice>>,
) -> EngineResult<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(EngineError::NoOutputDevice)?;
    let supported = device
        .default_output_config()
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(EngineError::StreamBuildError(format!(
            "unsupported sample format: {:?}",
            supported.sample_format()
        )));
    }

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.into();

    let mut voices: Vec<Box<SinkVoice>> = Vec::with_capacity(MAX_SINK_VOICES);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Real-time audio callback - no allocations, no locks.
                while let Ok(command) = commands.try_recv() {
                    match command {
                        SinkCommand::Add(voice) => {
                            // Within capacity the push cannot reallocate
                            if voices.len() < MAX_SINK_VOICES {
                                voices.push(voice);
                            } else {
                                let _ = trash.try_send(voice);
                            }
                        }
                        SinkCommand::Remove(id) => {
                            if let Some(index) = voices.iter().position(|v| v.id == id) {
                                let voice = voices.swap_remove(index);
                                let _ = trash.try_send(voice);
                            }
                        }
                    }
                }

                data.fill(0.0);
                for voice in voices.iter_mut() {
                    voice.render(data, channels);
                }

                // Ship naturally-finished voices out for deallocation
                let mut index = 0;
                while index < voices.len() {
                    if voices[index].finished {
                        let voice = voices.swap_remove(index);
                        let _ = trash.try_send(voice);
                    } else {
                        index += 1;
                    }
                }
            },
            move |err| {
                warn!(error = %err, "audio output stream error");
            },
            None,
        )
        .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

    Ok((stream, sample_rate))
}

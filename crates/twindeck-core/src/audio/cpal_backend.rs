//! CPAL output stream
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  Control Thread  │───push()───────────►│   Command Queue     │
//! │ (EngineController)                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!         │                                           │
//!         │ Acquire/Relaxed loads                     │ pop()
//!         ▼                                           ▼
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │   DeckAtomics    │◄────────────────────│  CPAL Audio Thread  │
//! │   (lock-free)    │   publish per block │  (owns AudioEngine) │
//! └──────────────────┘                     └─────────────────────┘
//! ```
//!
//! The engine is prepared on the calling thread, then moved into the stream
//! callback. Nothing in the callback locks or allocates.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::config::AudioConfig;
use super::device::{default_output_device, find_device_by_id};
use super::error::{AudioError, AudioResult};
use crate::engine::{command_channel, AudioEngine, CommandSender, DeckAtomics, EngineCommand};
use crate::types::{StereoBuffer, MAX_BUFFER_SIZE};

/// Keeps the output stream alive
///
/// Dropping the handle stops the stream and releases the engine.
pub struct AudioHandle {
    _stream: Stream,
    device_name: String,
    sample_rate: u32,
    buffer_size: u32,
}

impl AudioHandle {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Negotiated buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Everything the control side needs once the stream runs
pub struct AudioSystemResult {
    /// Drop to stop audio
    pub handle: AudioHandle,
    /// Producer end of the command queue
    pub command_sender: CommandSender,
    /// Published deck state, one per deck in deck order
    pub deck_atomics: Vec<Arc<DeckAtomics>>,
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub latency_ms: f32,
}

/// Open the configured output device and start rendering `engine` into it
pub fn start_audio_system(config: &AudioConfig, mut engine: AudioEngine) -> AudioResult<AudioSystemResult> {
    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => default_output_device()?,
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let (supported_config, buffer_size) = get_output_config(&device, config)?;
    let sample_rate = supported_config.sample_rate().0;

    let stream_config = StreamConfig {
        channels: supported_config.channels(),
        sample_rate: supported_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(buffer_size),
    };
    let latency_ms = config.buffer_size.latency_ms(sample_rate);

    log::info!(
        "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
        stream_config.channels,
        sample_rate,
        buffer_size,
        latency_ms
    );

    engine.prepare(buffer_size as usize, sample_rate);
    let deck_atomics = engine.deck_atomics();
    let (command_tx, command_rx) = command_channel();

    let state = AudioCallbackState::new(engine, command_rx);
    let stream = build_output_stream(&device, &stream_config, state)?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!("Audio stream started");

    Ok(AudioSystemResult {
        handle: AudioHandle {
            _stream: stream,
            device_name,
            sample_rate,
            buffer_size,
        },
        command_sender: CommandSender::new(command_tx),
        deck_atomics,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// State owned by the stream callback
struct AudioCallbackState {
    engine: AudioEngine,
    command_rx: rtrb::Consumer<EngineCommand>,
    /// Pre-allocated mix buffer
    buffer: StereoBuffer,
}

impl AudioCallbackState {
    fn new(engine: AudioEngine, command_rx: rtrb::Consumer<EngineCommand>) -> Self {
        Self {
            engine,
            command_rx,
            buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
        }
    }

    /// Fill one interleaved device period
    ///
    /// Periods longer than MAX_BUFFER_SIZE are rendered in chunks. Channels
    /// past the first two are silenced.
    fn fill(&mut self, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        self.engine.process_commands(&mut self.command_rx);

        for period in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
            let n_frames = period.len() / channels;
            self.buffer.set_len_from_capacity(n_frames);
            self.engine.render_block(&mut self.buffer);

            if channels == 2 {
                period[..n_frames * 2].copy_from_slice(self.buffer.as_interleaved());
                continue;
            }
            for (frame, sample) in period.chunks_mut(channels).zip(self.buffer.as_slice()) {
                frame[0] = sample.left;
                if channels > 1 {
                    frame[1] = sample.right;
                }
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
        }
    }
}

impl Drop for AudioCallbackState {
    fn drop(&mut self) {
        self.engine.release();
    }
}

fn supports_rate(config: &cpal::SupportedStreamConfigRange, rate: u32) -> bool {
    rate >= config.min_sample_rate().0 && rate <= config.max_sample_rate().0
}

/// Choose among the device's f32 configurations
///
/// Prefers stereo at the target rate, then any stereo config, then the first
/// f32 config. Other sample formats are never picked since the callback
/// writes f32.
fn select_config(
    supported: &[cpal::SupportedStreamConfigRange],
    target_sample_rate: u32,
) -> Option<&cpal::SupportedStreamConfigRange> {
    let f32_configs = supported.iter().filter(|c| c.sample_format() == SampleFormat::F32);
    f32_configs
        .clone()
        .find(|c| c.channels() >= 2 && supports_rate(c, target_sample_rate))
        .or_else(|| f32_configs.clone().find(|c| c.channels() >= 2))
        .or_else(|| f32_configs.clone().next())
}

/// Pick the device configuration closest to the request
///
/// Returns the config and the buffer size in frames.
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<(cpal::SupportedStreamConfig, u32)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target_sample_rate = config.target_sample_rate();
    let best_config = select_config(&supported_configs, target_sample_rate)
        .ok_or_else(|| AudioError::ConfigError("No f32 output configuration".to_string()))?;

    let sample_rate = if supports_rate(best_config, target_sample_rate) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    let buffer_size = config.buffer_size.frames();
    log::debug!("Selected buffer size: {} frames for {:?}", buffer_size, config.buffer_size);

    Ok((best_config.clone().with_sample_rate(sample_rate), buffer_size))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut state: AudioCallbackState,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                state.fill(data, channels);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

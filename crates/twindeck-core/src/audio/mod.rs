//! Audio output for the twindeck engine
//!
//! A single CPAL output stream drives the engine:
//!
//! - **Control Thread**: sends commands via the lock-free ringbuffer
//! - **Audio Thread**: owns the AudioEngine exclusively, drains commands, renders
//! - **Atomics**: the control side reads playback state without locks
//!
//! # Example Usage
//!
//! ```ignore
//! use twindeck_core::audio::{start_audio_system, AudioConfig};
//! use twindeck_core::engine::{AudioEngine, EngineController};
//!
//! let result = start_audio_system(&AudioConfig::default(), AudioEngine::new())?;
//! let mut controller = EngineController::new(result.command_sender, result.deck_atomics);
//! controller.deck(DeckId::A).unwrap().load(path)?;
//! ```

mod config;
mod cpal_backend;
mod device;
mod error;

pub use config::{AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use cpal_backend::{start_audio_system, AudioHandle, AudioSystemResult};
pub use device::{default_output_device, find_device_by_id, get_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};

//! Twindeck Core - two-deck playback engine
//!
//! Decoded sources play through per-deck resampler and reverb stages into an
//! unweighted mix bus, rendered by a cpal output stream. The control thread
//! talks to the audio thread through a wait-free command queue and reads
//! playback state back through atomics.

pub mod audio;
pub mod config;
pub mod effect;
pub mod engine;
pub mod poller;
pub mod source;
pub mod types;

pub use types::*;

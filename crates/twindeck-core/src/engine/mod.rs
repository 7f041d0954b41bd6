//! Audio engine - decks, mix bus and the cross-thread control surface
//!
//! - Deck: one playback unit (transport → resampler → reverb)
//! - Mixer: unweighted sum of the registered decks
//! - AudioEngine: owns decks and mixer, drains commands, renders blocks
//! - EngineController: control-thread side, validates and queues writes

mod command;
mod control;
mod deck;
mod engine;
pub mod gc;
mod mixer;
mod params;
mod resampler;
mod transport;

pub use command::*;
pub use control::*;
pub use deck::*;
pub use engine::*;
pub use mixer::*;
pub use params::*;
pub use resampler::{InterpolationMethod, Resampler};
pub use transport::{FrameSource, Transport};

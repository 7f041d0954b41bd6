//! Lock-free command queue for real-time engine control
//!
//! The control thread sends commands through a wait-free single-producer /
//! single-consumer ring buffer and the audio thread drains it at the start of
//! every render block. Neither side ever blocks: a full queue is reported back
//! to the sender, and an empty queue costs the audio thread one failed pop.
//!
//! Large payloads (decoded audio) travel as `basedrop::Shared` handles, so a
//! command is a few words wide and dropping a replaced source on the audio
//! thread only enqueues it for the collector.
//!
//! # Usage
//!
//! ```ignore
//! let (tx, mut rx) = command_channel();
//! let mut sender = CommandSender::new(tx);
//!
//! // Control thread (non-blocking)
//! sender.send(EngineCommand::Start { deck: 0 })?;
//!
//! // Audio thread
//! engine.process_commands(&mut rx);
//! ```

use crate::source::DecodedSource;

/// Commands sent from the control thread to the audio thread
///
/// Values are validated before they are queued; the engine applies them
/// unchecked. `seq` numbers let readers tell whether a load or seek has been
/// applied yet.
#[derive(Debug)]
pub enum EngineCommand {
    // ─────────────────────────────────────────────────────────────
    // Source Management
    // ─────────────────────────────────────────────────────────────
    /// Replace a deck's source, rewinding to 0 and stopping
    LoadSource {
        deck: usize,
        source: DecodedSource,
        seq: u64,
    },
    /// Return a deck to the empty state
    Unload { deck: usize, seq: u64 },

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────
    Start { deck: usize },
    Stop { deck: usize },
    SetLooping { deck: usize, looping: bool },
    /// Move the read cursor (frames, clamped by the deck)
    Seek { deck: usize, frame: u64, seq: u64 },

    // ─────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────
    SetGain { deck: usize, gain: f32 },
    SetSpeed { deck: usize, speed: f64 },
    SetRoomSize { deck: usize, room_size: f32 },
    SetDamping { deck: usize, damping: f32 },

    // ─────────────────────────────────────────────────────────────
    // Mix Bus
    // ─────────────────────────────────────────────────────────────
    AddToMix { deck: usize },
    RemoveFromMix { deck: usize },
}

impl EngineCommand {
    /// Short name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadSource { .. } => "load",
            Self::Unload { .. } => "unload",
            Self::Start { .. } => "start",
            Self::Stop { .. } => "stop",
            Self::SetLooping { .. } => "set looping",
            Self::Seek { .. } => "seek",
            Self::SetGain { .. } => "set gain",
            Self::SetSpeed { .. } => "set speed",
            Self::SetRoomSize { .. } => "set room size",
            Self::SetDamping { .. } => "set damping",
            Self::AddToMix { .. } => "add to mix",
            Self::RemoveFromMix { .. } => "remove from mix",
        }
    }
}

/// Command queue capacity
///
/// Control operations are user-paced; 256 slots absorb any burst between two
/// render blocks.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Create a new command channel pair
///
/// The producer goes to the control thread, the consumer to the audio thread.
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// Producer side of the command queue
pub struct CommandSender {
    producer: rtrb::Producer<EngineCommand>,
}

impl CommandSender {
    pub fn new(producer: rtrb::Producer<EngineCommand>) -> Self {
        Self { producer }
    }

    /// Push a command without blocking
    ///
    /// Returns the command back when the queue is full.
    pub fn send(&mut self, cmd: EngineCommand) -> Result<(), EngineCommand> {
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Whether at least one slot is free
    pub fn has_space(&self) -> bool {
        self.producer.slots() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_roundtrip() {
        let (tx, mut rx) = command_channel();
        let mut sender = CommandSender::new(tx);

        assert!(sender.send(EngineCommand::Start { deck: 1 }).is_ok());
        match rx.pop() {
            Ok(EngineCommand::Start { deck }) => assert_eq!(deck, 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_full_queue_returns_command() {
        let (tx, _rx) = command_channel();
        let mut sender = CommandSender::new(tx);
        for _ in 0..COMMAND_QUEUE_CAPACITY {
            sender.send(EngineCommand::Stop { deck: 0 }).unwrap();
        }
        assert!(!sender.has_space());

        let rejected = sender.send(EngineCommand::SetGain { deck: 0, gain: 0.5 }).unwrap_err();
        assert_eq!(rejected.name(), "set gain");
    }

    #[test]
    fn test_command_size() {
        // Keep commands a few words wide for the ring buffer
        let size = std::mem::size_of::<EngineCommand>();
        assert!(size <= 40, "EngineCommand is {} bytes, expected <= 40", size);
    }
}

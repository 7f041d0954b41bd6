//! Main audio engine - ties together decks and the mix bus
//!
//! The engine is owned by the audio thread. Its host contract is:
//!
//! 1. `prepare(block_size, sample_rate)` before the first block
//! 2. per block: `process_commands` then `render_block`
//! 3. `release()` when the stream goes away

use std::sync::Arc;

use super::command::EngineCommand;
use super::{Deck, DeckAtomics, Mixer};
use crate::types::{DeckId, StereoBuffer, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE, NUM_DECKS};

/// The main audio engine
pub struct AudioEngine {
    decks: Vec<Deck>,
    mixer: Mixer,
    /// Pre-allocated per-deck render buffers
    deck_buffers: Vec<StereoBuffer>,
    sample_rate: u32,
    block_size: usize,
}

impl AudioEngine {
    /// Create an engine with the standard two decks
    pub fn new() -> Self {
        Self::with_deck_count(NUM_DECKS)
    }

    /// Create an engine with `count` decks
    pub fn with_deck_count(count: usize) -> Self {
        Self {
            decks: (0..count).map(|i| Deck::new(DeckId(i))).collect(),
            mixer: Mixer::with_capacity(count),
            deck_buffers: (0..count).map(|_| StereoBuffer::silence(MAX_BUFFER_SIZE)).collect(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: 0,
        }
    }

    pub fn deck_count(&self) -> usize {
        self.decks.len()
    }

    pub fn deck(&self, id: usize) -> Option<&Deck> {
        self.decks.get(id)
    }

    pub fn deck_mut(&mut self, id: usize) -> Option<&mut Deck> {
        self.decks.get_mut(id)
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get lock-free atomics for all decks
    ///
    /// Call once before handing the engine to the audio thread and keep the
    /// Arcs on the control side.
    pub fn deck_atomics(&self) -> Vec<Arc<DeckAtomics>> {
        self.decks.iter().map(Deck::atomics).collect()
    }

    /// Prepare for rendering at `sample_rate` in blocks of up to `block_size`
    ///
    /// Registers every deck with the mixer (idempotent), sizes each deck's
    /// stages for the rate and clears reverb state. May allocate.
    pub fn prepare(&mut self, block_size: usize, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.block_size = block_size.min(MAX_BUFFER_SIZE);
        self.mixer.prepare(self.block_size);
        for (idx, deck) in self.decks.iter_mut().enumerate() {
            self.mixer.add_input(idx);
            deck.prepare(sample_rate);
            deck.sync_atomics();
        }
        log::debug!(
            "Engine prepared: {} decks, block {} @ {}Hz",
            self.decks.len(),
            self.block_size,
            sample_rate
        );
    }

    /// Drain pending commands from the control thread
    ///
    /// Wait-free: pops until the queue is empty.
    pub fn process_commands(&mut self, rx: &mut rtrb::Consumer<EngineCommand>) {
        while let Ok(cmd) = rx.pop() {
            self.apply(cmd);
        }
    }

    /// Apply a single command
    pub fn apply(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::AddToMix { deck } => {
                if deck < self.decks.len() {
                    self.mixer.add_input(deck);
                }
            }
            EngineCommand::RemoveFromMix { deck } => {
                self.mixer.remove_input(deck);
            }
            cmd => self.apply_to_deck(cmd),
        }
    }

    fn apply_to_deck(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::LoadSource { deck, source, seq } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    // The replaced source drops here; basedrop defers the free
                    d.load_source(source);
                    d.mark_applied(seq);
                }
            }
            EngineCommand::Unload { deck, seq } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.unload();
                    d.mark_applied(seq);
                }
            }
            EngineCommand::Seek { deck, frame, seq } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.seek(frame);
                    d.mark_applied(seq);
                }
            }
            EngineCommand::Start { deck } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.start();
                }
            }
            EngineCommand::Stop { deck } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.stop();
                }
            }
            EngineCommand::SetLooping { deck, looping } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.set_looping(looping);
                }
            }
            EngineCommand::SetGain { deck, gain } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.apply_gain(gain);
                }
            }
            EngineCommand::SetSpeed { deck, speed } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.apply_speed(speed);
                }
            }
            EngineCommand::SetRoomSize { deck, room_size } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.apply_room_size(room_size);
                }
            }
            EngineCommand::SetDamping { deck, damping } => {
                if let Some(d) = self.decks.get_mut(deck) {
                    d.apply_damping(damping);
                }
            }
            EngineCommand::AddToMix { .. } | EngineCommand::RemoveFromMix { .. } => {}
        }
    }

    /// Render one block into `output`
    ///
    /// `output.len()` is the block size and must not exceed
    /// [`MAX_BUFFER_SIZE`]; hosts with larger periods call this in chunks.
    /// Every deck's atomics are published afterwards, rendered or not.
    pub fn render_block(&mut self, output: &mut StereoBuffer) {
        debug_assert!(output.len() <= MAX_BUFFER_SIZE, "block larger than MAX_BUFFER_SIZE");
        self.mixer.process(&mut self.decks, &mut self.deck_buffers, output);
        for deck in &self.decks {
            deck.sync_atomics();
        }
    }

    /// Tear down rendering
    ///
    /// Releases each mixer input in registration order, then any deck not
    /// registered, and only then removes the inputs and releases the mixer.
    /// Loaded sources and settings survive; a later `prepare` resumes
    /// rendering.
    pub fn release(&mut self) {
        for &idx in self.mixer.inputs() {
            if let Some(deck) = self.decks.get_mut(idx) {
                deck.release();
            }
        }
        for (idx, deck) in self.decks.iter_mut().enumerate() {
            if !self.mixer.is_input(idx) {
                deck.release();
            }
        }
        self.mixer.remove_all_inputs();
        self.mixer.release();
        self.block_size = 0;
        log::debug!("Engine released");
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command_channel;
    use crate::source::DecodedSource;
    use crate::types::StereoSample;

    fn constant_source(value: f32, frames: usize) -> DecodedSource {
        DecodedSource::new(StereoBuffer::from_vec(vec![StereoSample::mono(value); frames]), 48000)
    }

    #[test]
    fn test_process_empty_engine() {
        let mut engine = AudioEngine::new();
        engine.prepare(256, 48000);
        let mut out = StereoBuffer::silence(256);
        engine.render_block(&mut out);
        assert_eq!(out.len(), 256);
        assert_eq!(out.peak(), 0.0);
    }

    #[test]
    fn test_prepare_registers_every_deck_once() {
        let mut engine = AudioEngine::with_deck_count(3);
        engine.prepare(512, 44100);
        engine.prepare(512, 44100);
        assert_eq!(engine.mixer().inputs(), &[0, 1, 2]);
        assert_eq!(engine.sample_rate(), 44100);
    }

    #[test]
    fn test_commands_apply_before_render() {
        let mut engine = AudioEngine::new();
        engine.prepare(128, 48000);
        let atomics = engine.deck_atomics();
        let (mut tx, mut rx) = command_channel();

        tx.push(EngineCommand::LoadSource {
            deck: 0,
            source: constant_source(1.0, 48000),
            seq: 1,
        })
        .unwrap();
        tx.push(EngineCommand::SetGain { deck: 0, gain: 0.5 }).unwrap();
        tx.push(EngineCommand::Start { deck: 0 }).unwrap();

        engine.process_commands(&mut rx);
        let mut out = StereoBuffer::silence(128);
        engine.render_block(&mut out);

        assert!(out.iter().all(|s| (s.left - 0.5).abs() < 1e-6));
        assert!(atomics[0].is_playing());
        assert_eq!(atomics[0].length(), 48000);
        assert_eq!(atomics[0].applied_seq(), 1);
        assert!(atomics[0].position() >= 128);
    }

    #[test]
    fn test_mixing_two_decks() {
        let mut engine = AudioEngine::new();
        engine.prepare(256, 48000);
        for (deck, gain) in [(0, 0.5), (1, 0.3)] {
            engine.apply(EngineCommand::LoadSource {
                deck,
                source: constant_source(1.0, 48000),
                seq: 1,
            });
            engine.apply(EngineCommand::SetGain { deck, gain });
            engine.apply(EngineCommand::Start { deck });
        }

        let mut out = StereoBuffer::silence(256);
        engine.render_block(&mut out);
        assert!(out.iter().all(|s| (s.left - 0.8).abs() < 1e-6));

        engine.apply(EngineCommand::RemoveFromMix { deck: 1 });
        engine.render_block(&mut out);
        assert!(out.iter().all(|s| (s.left - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_release_removes_inputs_and_keeps_sources() {
        let mut engine = AudioEngine::new();
        engine.prepare(64, 48000);
        engine.apply(EngineCommand::LoadSource {
            deck: 0,
            source: constant_source(1.0, 4800),
            seq: 1,
        });
        engine.apply(EngineCommand::Start { deck: 0 });
        engine.release();

        assert!(engine.mixer().inputs().is_empty());
        assert_eq!(engine.mixer().block_size(), 0);
        assert!(engine.deck(0).is_some_and(|d| d.has_source()));

        let mut out = StereoBuffer::silence(64);
        engine.render_block(&mut out);
        assert_eq!(out.peak(), 0.0);

        engine.prepare(64, 48000);
        engine.render_block(&mut out);
        assert!(out.peak() > 0.0);
    }

    #[test]
    fn test_release_reaches_every_deck() {
        let mut engine = AudioEngine::new();
        engine.prepare(64, 48000);
        engine.apply(EngineCommand::RemoveFromMix { deck: 0 });
        engine.apply(EngineCommand::AddToMix { deck: 0 });
        assert_eq!(engine.mixer().inputs(), &[1, 0]);
        engine.apply(EngineCommand::RemoveFromMix { deck: 1 });
        assert!(engine.deck(1).is_some_and(|d| d.is_prepared()));

        engine.release();
        assert!(engine.deck(0).is_some_and(|d| !d.is_prepared()));
        assert!(engine.deck(1).is_some_and(|d| !d.is_prepared()));
        assert!(engine.mixer().inputs().is_empty());

        engine.prepare(64, 48000);
        assert!(engine.deck(0).is_some_and(|d| d.is_prepared()));
        assert_eq!(engine.mixer().inputs(), &[0, 1]);
    }

    #[test]
    fn test_commands_for_unknown_deck_are_ignored() {
        let mut engine = AudioEngine::new();
        engine.prepare(64, 48000);
        engine.apply(EngineCommand::Start { deck: 9 });
        engine.apply(EngineCommand::AddToMix { deck: 9 });
        assert_eq!(engine.mixer().inputs(), &[0, 1]);
    }
}

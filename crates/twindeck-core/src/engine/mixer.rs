//! Mixer - sums the registered decks into one output block
//!
//! The mixer holds deck indices, not decks: the engine owns the decks and
//! lends them for each block. Summation is unweighted; levels outside
//! [-1, 1] are passed through for the host to deal with.

use super::Deck;
use crate::types::StereoBuffer;

/// The mix bus
#[derive(Debug, Clone)]
pub struct Mixer {
    /// Registered deck indices, in registration order
    inputs: Vec<usize>,
    /// Block size from the last prepare (0 when released)
    block_size: usize,
}

impl Mixer {
    /// Create a mixer with room for `max_inputs` registrations
    pub fn with_capacity(max_inputs: usize) -> Self {
        Self {
            inputs: Vec::with_capacity(max_inputs),
            block_size: 0,
        }
    }

    pub fn prepare(&mut self, block_size: usize) {
        self.block_size = block_size;
    }

    /// Register a deck; registering twice is a no-op
    pub fn add_input(&mut self, deck: usize) -> bool {
        if self.inputs.contains(&deck) {
            return false;
        }
        // Capacity is reserved for every deck up front
        debug_assert!(self.inputs.len() < self.inputs.capacity());
        self.inputs.push(deck);
        true
    }

    /// Unregister a deck; returns false if it was not registered
    pub fn remove_input(&mut self, deck: usize) -> bool {
        match self.inputs.iter().position(|&i| i == deck) {
            Some(pos) => {
                self.inputs.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn remove_all_inputs(&mut self) {
        self.inputs.clear();
    }

    pub fn release(&mut self) {
        self.block_size = 0;
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn is_input(&self, deck: usize) -> bool {
        self.inputs.contains(&deck)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Render every registered deck and sum into `out`
    ///
    /// `deck_buffers` must hold one pre-allocated buffer per deck. Decks that
    /// are not registered are neither rendered nor advanced.
    pub fn process(&mut self, decks: &mut [Deck], deck_buffers: &mut [StereoBuffer], out: &mut StereoBuffer) {
        let buffer_len = out.len();
        out.fill_silence();

        for &idx in &self.inputs {
            let (Some(deck), Some(buffer)) = (decks.get_mut(idx), deck_buffers.get_mut(idx)) else {
                continue;
            };
            buffer.set_len_from_capacity(buffer_len);
            deck.render(buffer);
            out.add_buffer(buffer);
        }
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::with_capacity(crate::types::NUM_DECKS)
    }
}

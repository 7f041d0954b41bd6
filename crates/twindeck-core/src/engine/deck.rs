//! Deck - one independent playback unit
//!
//! The render-side deck owns its source chain as an explicit sequence of
//! stages:
//!
//! ```text
//! DecodedSource ─► Transport (cursor, loop, gain, play flag)
//!               ─► Resampler (speed × source rate → output rate)
//!               ─► ReverbEffect (room size, damping)
//! ```
//!
//! A `Deck` lives inside the [`AudioEngine`](super::AudioEngine) and is owned
//! by the audio thread. The control thread never touches it; it sends
//! commands and reads back [`DeckAtomics`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use super::params::{validate_position, validate_speed, validate_unit, ControlResult};
use super::resampler::Resampler;
use super::transport::{seek_target, Transport};
use crate::effect::reverb::{PARAM_DAMPING, PARAM_ROOM_SIZE};
use crate::effect::{Effect, ReverbEffect};
use crate::source::DecodedSource;
use crate::types::{DeckId, PlayState, StereoBuffer};

/// Lock-free deck state for control/UI access
///
/// The audio thread is the only writer; it publishes once per render block
/// and when a command is applied. Readers never block the audio thread.
///
/// `applied_seq` is stored last with `Release` ordering, so a reader that
/// observes a sequence number with `Acquire` also observes the position and
/// length written with it.
#[derive(Debug, Default)]
pub struct DeckAtomics {
    /// Read cursor in source frames
    pub position: AtomicU64,
    /// Loaded source length in frames (0 when empty)
    pub length: AtomicU64,
    /// Loaded source sample rate (0 when empty)
    pub sample_rate: AtomicU32,
    /// Playback state: 0=Stopped, 1=Playing
    pub state: AtomicU8,
    /// Whether looping is enabled
    pub looping: AtomicBool,
    /// Sequence number of the last load/seek/unload applied
    pub applied_seq: AtomicU64,
}

impl DeckAtomics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current read cursor in frames (lock-free)
    #[inline]
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    /// Source length in frames (lock-free)
    #[inline]
    pub fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn play_state(&self) -> PlayState {
        PlayState::from_u8(self.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.play_state() == PlayState::Playing
    }

    #[inline]
    pub fn looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq.load(Ordering::Acquire)
    }

    /// Copy the published state into a value
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let rate = self.sample_rate();
        PlaybackSnapshot::from_frames(self.position(), self.length(), rate, self.is_playing())
    }
}

/// Immutable read of a deck's playback clock
///
/// Cheap to copy; taken by the position poller and handed out by value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub position_seconds: f64,
    pub length_seconds: f64,
    pub is_playing: bool,
}

impl PlaybackSnapshot {
    /// Build a snapshot from frame counts
    pub fn from_frames(position: u64, length: u64, sample_rate: u32, is_playing: bool) -> Self {
        if sample_rate == 0 {
            return Self {
                is_playing,
                ..Self::default()
            };
        }
        let rate = sample_rate as f64;
        Self {
            position_seconds: position.min(length) as f64 / rate,
            length_seconds: length as f64 / rate,
            is_playing,
        }
    }

    /// Position as a fraction of the length
    ///
    /// Returns 0 when the length is 0, never NaN.
    pub fn relative(&self) -> f64 {
        if self.length_seconds > 0.0 {
            (self.position_seconds / self.length_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Convert seconds into a frame index, negative times map to 0
///
/// The result is not bounded by the source length; [`seek_target`] resolves
/// it against the loop flag.
pub fn seconds_to_frame(seconds: f64, sample_rate: u32) -> u64 {
    if sample_rate == 0 || seconds <= 0.0 {
        return 0;
    }
    // Float to int casts saturate
    (seconds * sample_rate as f64).round() as u64
}

/// Render-side deck
pub struct Deck {
    id: DeckId,
    transport: Transport,
    resampler: Resampler,
    reverb: ReverbEffect,
    atomics: Arc<DeckAtomics>,
    /// Last applied load/seek sequence number
    applied_seq: u64,
    /// Between `prepare` and `release`
    prepared: bool,
}

impl Deck {
    pub fn new(id: DeckId) -> Self {
        Self {
            id,
            transport: Transport::new(),
            resampler: Resampler::new(),
            reverb: ReverbEffect::new(),
            atomics: Arc::new(DeckAtomics::new()),
            applied_seq: 0,
            prepared: false,
        }
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    /// Shared atomics for lock-free reads from other threads
    pub fn atomics(&self) -> Arc<DeckAtomics> {
        Arc::clone(&self.atomics)
    }

    /// Size stages for the pipeline sample rate and clear reverb state
    ///
    /// May allocate; call before the render loop starts.
    pub fn prepare(&mut self, sample_rate: u32) {
        self.resampler.prepare(sample_rate);
        self.reverb.prepare(sample_rate);
        self.prepared = true;
    }

    /// Drop render state; the loaded source and settings are kept
    pub fn release(&mut self) {
        self.resampler.reset();
        self.reverb.reset();
        self.prepared = false;
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    // ─────────────────────────────────────────────────────────────
    // Source
    // ─────────────────────────────────────────────────────────────

    /// Replace the source, rewinding to 0 and stopping
    ///
    /// The loop flag, gain, speed and reverb settings carry over. The
    /// replaced source is returned so it drops wherever the caller is.
    pub fn load_source(&mut self, source: DecodedSource) -> Option<DecodedSource> {
        self.resampler.set_source_rate(source.sample_rate());
        self.resampler.reset();
        self.transport.load(source)
    }

    /// Return to the empty state
    pub fn unload(&mut self) -> Option<DecodedSource> {
        self.resampler.reset();
        self.transport.unload()
    }

    pub fn has_source(&self) -> bool {
        self.transport.has_source()
    }

    pub fn source(&self) -> Option<&DecodedSource> {
        self.transport.source()
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Set the play flag; an empty deck stays silent
    pub fn start(&mut self) {
        self.transport.start();
    }

    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.transport.set_looping(looping);
    }

    pub fn is_looping(&self) -> bool {
        self.transport.is_looping()
    }

    // ─────────────────────────────────────────────────────────────
    // Validated parameters
    // ─────────────────────────────────────────────────────────────

    pub fn set_gain(&mut self, gain: f64) -> ControlResult<()> {
        let gain = validate_unit("gain", gain)?;
        self.apply_gain(gain as f32);
        Ok(())
    }

    pub fn set_speed(&mut self, speed: f64) -> ControlResult<()> {
        let speed = validate_speed(speed)?;
        self.apply_speed(speed);
        Ok(())
    }

    pub fn set_room_size(&mut self, room_size: f64) -> ControlResult<()> {
        let room_size = validate_unit("room size", room_size)?;
        self.apply_room_size(room_size as f32);
        Ok(())
    }

    pub fn set_damping(&mut self, damping: f64) -> ControlResult<()> {
        let damping = validate_unit("damping", damping)?;
        self.apply_damping(damping as f32);
        Ok(())
    }

    /// Seek to an absolute position in seconds
    ///
    /// A looping deck wraps the target into the source, otherwise it clamps
    /// to [0, length]. Past the end of a non-looping source the deck renders
    /// silence and stops on the next block.
    pub fn set_position(&mut self, seconds: f64) -> ControlResult<()> {
        let seconds = validate_position(seconds)?;
        let frame = seconds_to_frame(seconds, self.transport.sample_rate());
        self.seek(frame);
        Ok(())
    }

    /// Seek to a fraction of the length
    pub fn set_position_relative(&mut self, fraction: f64) -> ControlResult<()> {
        let fraction = validate_unit("relative position", fraction)?;
        let seconds = self.length_seconds() * fraction;
        self.set_position(seconds)
    }

    // Unchecked appliers, used by the engine for values validated on the
    // control thread.

    pub(super) fn apply_gain(&mut self, gain: f32) {
        self.transport.set_gain(gain);
    }

    pub(super) fn apply_speed(&mut self, speed: f64) {
        self.resampler.set_speed(speed);
    }

    pub(super) fn apply_room_size(&mut self, room_size: f32) {
        self.reverb.set_param(PARAM_ROOM_SIZE, room_size);
        self.reverb.set_bypass(false);
    }

    pub(super) fn apply_damping(&mut self, damping: f32) {
        self.reverb.set_param(PARAM_DAMPING, damping);
        self.reverb.set_bypass(false);
    }

    /// Move the read cursor to `frame` and restart interpolation
    ///
    /// The frame is resolved with [`seek_target`] against the loop flag.
    pub fn seek(&mut self, frame: u64) {
        self.transport.seek(frame);
        self.resampler.reset();
    }

    pub(super) fn mark_applied(&mut self, seq: u64) {
        self.applied_seq = self.applied_seq.max(seq);
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn gain(&self) -> f32 {
        self.transport.gain()
    }

    pub fn speed(&self) -> f64 {
        self.resampler.speed()
    }

    pub fn room_size(&self) -> f32 {
        self.reverb.room_size()
    }

    pub fn damping(&self) -> f32 {
        self.reverb.damping()
    }

    pub fn reverb_engaged(&self) -> bool {
        !self.reverb.is_bypassed()
    }

    /// Read cursor in source frames
    pub fn position_frames(&self) -> u64 {
        self.transport.cursor()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot::from_frames(
            self.transport.cursor(),
            self.transport.length_frames(),
            self.transport.sample_rate(),
            self.transport.is_playing(),
        )
    }

    pub fn position_seconds(&self) -> f64 {
        self.snapshot().position_seconds
    }

    /// Length in seconds, 0 when empty
    pub fn length_seconds(&self) -> f64 {
        self.snapshot().length_seconds
    }

    /// Position as a fraction of the length, 0 when empty
    pub fn position_relative(&self) -> f64 {
        self.snapshot().relative()
    }

    // ─────────────────────────────────────────────────────────────
    // Render
    // ─────────────────────────────────────────────────────────────

    /// Render one block into `out` (its length is the block size)
    ///
    /// Real-time safe: no allocation, no locks.
    pub fn render(&mut self, out: &mut StereoBuffer) {
        if self.transport.is_playing() {
            self.resampler.process(&mut self.transport, out.as_mut_slice());
        } else {
            // Interpolator history is kept so a restart resumes seamlessly
            out.fill_silence();
        }
        // Tail rings out after a stop
        self.reverb.process(out);
    }

    /// Publish the current state to the shared atomics
    pub fn sync_atomics(&self) {
        let a = &self.atomics;
        a.position.store(self.transport.cursor(), Ordering::Relaxed);
        a.length.store(self.transport.length_frames(), Ordering::Relaxed);
        a.sample_rate.store(self.transport.sample_rate(), Ordering::Relaxed);
        a.state.store(self.transport.state().as_u8(), Ordering::Relaxed);
        a.looping.store(self.transport.is_looping(), Ordering::Relaxed);
        a.applied_seq.store(self.applied_seq, Ordering::Release);
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new(DeckId::A)
    }
}

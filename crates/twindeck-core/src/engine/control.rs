//! Control-thread deck surface
//!
//! [`EngineController`] is the control thread's handle on the engine. It owns
//! the command producer, a mirror of every deck's accepted settings, and the
//! reader binding used for loads. [`DeckController`] is a short-lived view on
//! one deck that implements every deck operation:
//!
//! - setters validate first; a rejected value is logged and the previous one
//!   stays in effect
//! - accepted writes are queued for the audio thread and applied at the start
//!   of the next render block
//! - getters read lock-free state published by the audio thread
//!
//! Loads decode on the calling thread. Only the finished source is queued, so
//! a failed load never disturbs what the audio thread is playing.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::command::{CommandSender, EngineCommand};
use super::deck::{seconds_to_frame, DeckAtomics, PlaybackSnapshot};
use super::params::{validate_position, validate_speed, validate_unit, ControlError, ControlResult};
use super::transport::seek_target;
use crate::poller::PositionPoller;
use crate::source::{DecodedSource, LoadError, LoadResult, SourceReader, SymphoniaReader};
use crate::types::DeckId;

/// Accepted settings of one deck, as last sent to the audio thread
///
/// Also the `deck` section of a config file, hence the serde derives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    pub gain: f64,
    pub speed: f64,
    pub room_size: f64,
    pub damping: f64,
    pub looping: bool,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            gain: 1.0,
            speed: 1.0,
            room_size: 0.5,
            damping: 0.5,
            looping: false,
        }
    }
}

/// Read-only view of one deck's playback clock
///
/// Shared between the control thread (writer of the requested cursor and the
/// loaded length) and readers such as the position poller. Audio-thread state
/// comes from the wrapped [`DeckAtomics`].
#[derive(Debug)]
pub struct DeckView {
    atomics: Arc<DeckAtomics>,
    /// Latest load/seek/unload sequence number sent
    requested_seq: AtomicU64,
    /// Cursor requested by that load/seek/unload
    requested_frame: AtomicU64,
    /// Whether that request also stops the deck (load, unload)
    requested_stop: AtomicBool,
    /// Length and rate of the most recently accepted source
    length: AtomicU64,
    sample_rate: AtomicU32,
}

impl DeckView {
    fn new(atomics: Arc<DeckAtomics>) -> Self {
        Self {
            atomics,
            requested_seq: AtomicU64::new(0),
            requested_frame: AtomicU64::new(0),
            requested_stop: AtomicBool::new(false),
            length: AtomicU64::new(0),
            sample_rate: AtomicU32::new(0),
        }
    }

    fn publish_source(&self, length: u64, sample_rate: u32) {
        self.length.store(length, Ordering::Relaxed);
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
    }

    fn publish_request(&self, seq: u64, frame: u64, stops: bool) {
        self.requested_frame.store(frame, Ordering::Relaxed);
        self.requested_stop.store(stops, Ordering::Relaxed);
        self.requested_seq.store(seq, Ordering::Release);
    }

    fn is_pending(&self) -> bool {
        self.atomics.applied_seq() < self.requested_seq.load(Ordering::Acquire)
    }

    /// Loaded length in frames (0 when empty)
    pub fn length_frames(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Take a snapshot of position, length and play flag
    ///
    /// Until the audio thread has applied the latest load or seek, the
    /// requested cursor is reported instead of the rendered one.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let (position, is_playing) = if self.is_pending() {
            let playing = !self.requested_stop.load(Ordering::Relaxed) && self.atomics.is_playing();
            (self.requested_frame.load(Ordering::Relaxed), playing)
        } else {
            (self.atomics.position(), self.atomics.is_playing())
        };
        PlaybackSnapshot::from_frames(position, self.length_frames(), self.sample_rate(), is_playing)
    }

    /// The audio thread's raw atomics
    pub fn atomics(&self) -> &Arc<DeckAtomics> {
        &self.atomics
    }
}

struct DeckSlot {
    settings: DeckSettings,
    view: Arc<DeckView>,
}

/// Control-thread handle on the audio engine
pub struct EngineController {
    sender: CommandSender,
    decks: Vec<DeckSlot>,
    reader: Box<dyn SourceReader>,
    next_seq: u64,
}

impl EngineController {
    /// Create a controller that decodes with symphonia
    pub fn new(sender: CommandSender, deck_atomics: Vec<Arc<DeckAtomics>>) -> Self {
        Self::with_reader(sender, deck_atomics, Box::new(SymphoniaReader))
    }

    /// Create a controller with a custom reader binding
    pub fn with_reader(
        sender: CommandSender,
        deck_atomics: Vec<Arc<DeckAtomics>>,
        reader: Box<dyn SourceReader>,
    ) -> Self {
        let decks = deck_atomics
            .into_iter()
            .map(|atomics| DeckSlot {
                settings: DeckSettings::default(),
                view: Arc::new(DeckView::new(atomics)),
            })
            .collect();
        Self {
            sender,
            decks,
            reader,
            next_seq: 0,
        }
    }

    pub fn deck_count(&self) -> usize {
        self.decks.len()
    }

    /// Borrow the controls of one deck
    pub fn deck(&mut self, id: DeckId) -> Option<DeckController<'_>> {
        let slot = self.decks.get_mut(id.index())?;
        Some(DeckController {
            id,
            sender: &mut self.sender,
            slot,
            reader: self.reader.as_ref(),
            next_seq: &mut self.next_seq,
        })
    }

    /// Borrow the controls of one deck, or fail with `UnknownDeck`
    pub fn try_deck(&mut self, id: DeckId) -> ControlResult<DeckController<'_>> {
        self.deck(id).ok_or(ControlError::UnknownDeck(id.index()))
    }

    /// Shared clock views for every deck
    pub fn deck_views(&self) -> Vec<(DeckId, Arc<DeckView>)> {
        self.decks
            .iter()
            .enumerate()
            .map(|(i, slot)| (DeckId(i), Arc::clone(&slot.view)))
            .collect()
    }

    /// Build a position poller over every deck
    pub fn poller(&self, period: Duration) -> PositionPoller {
        PositionPoller::new(self.deck_views(), period)
    }

    /// Register a deck with the mix bus
    pub fn add_to_mix(&mut self, id: DeckId) -> ControlResult<()> {
        self.check_deck(id)?;
        send(&mut self.sender, EngineCommand::AddToMix { deck: id.index() })
    }

    /// Unregister a deck from the mix bus; it stops advancing
    pub fn remove_from_mix(&mut self, id: DeckId) -> ControlResult<()> {
        self.check_deck(id)?;
        send(&mut self.sender, EngineCommand::RemoveFromMix { deck: id.index() })
    }

    fn check_deck(&self, id: DeckId) -> ControlResult<()> {
        if id.index() < self.decks.len() {
            Ok(())
        } else {
            Err(ControlError::UnknownDeck(id.index()))
        }
    }
}

/// Queue a command, reporting a full queue as `QueueFull`
fn send(sender: &mut CommandSender, cmd: EngineCommand) -> ControlResult<()> {
    sender.send(cmd).map_err(|cmd| {
        log::warn!("Command queue full, dropping {}", cmd.name());
        ControlError::QueueFull(cmd.name())
    })
}

/// Log a rejected write and hand the error back
fn rejected(id: DeckId, err: ControlError) -> ControlError {
    log::warn!("{}: {}", id, err);
    err
}

/// Controls for one deck
pub struct DeckController<'a> {
    id: DeckId,
    sender: &'a mut CommandSender,
    slot: &'a mut DeckSlot,
    reader: &'a dyn SourceReader,
    next_seq: &'a mut u64,
}

impl DeckController<'_> {
    pub fn id(&self) -> DeckId {
        self.id
    }

    fn deck(&self) -> usize {
        self.id.index()
    }

    /// Settings last accepted for this deck
    pub fn settings(&self) -> DeckSettings {
        self.slot.settings
    }

    // ─────────────────────────────────────────────────────────────
    // Source
    // ─────────────────────────────────────────────────────────────

    /// Open `location`, decode it and make it the deck's source
    ///
    /// On success the deck is stopped at position 0 with its loop flag and
    /// other settings carried over. On failure nothing changes.
    pub fn load(&mut self, location: &Path) -> LoadResult<()> {
        let source = self.reader.open_for_read(location).map_err(|err| {
            log::warn!("{}: {}", self.id, err);
            err
        })?;
        log::info!(
            "{}: loaded {:?} ({:.2}s @ {}Hz)",
            self.id,
            location,
            source.length_seconds(),
            source.sample_rate()
        );
        self.load_source(source)
    }

    /// Publish an already decoded source to the deck
    pub fn load_source(&mut self, source: DecodedSource) -> LoadResult<()> {
        let length = source.length_frames();
        let sample_rate = source.sample_rate();
        let seq = *self.next_seq + 1;
        let cmd = EngineCommand::LoadSource {
            deck: self.deck(),
            source,
            seq,
        };
        if self.sender.send(cmd).is_err() {
            log::warn!("{}: command queue full, load dropped", self.id);
            return Err(LoadError::QueueFull);
        }
        *self.next_seq = seq;
        self.slot.view.publish_source(length, sample_rate);
        self.slot.view.publish_request(seq, 0, true);
        Ok(())
    }

    /// Return the deck to the empty state, keeping its settings
    pub fn unload(&mut self) -> ControlResult<()> {
        let seq = *self.next_seq + 1;
        send(self.sender, EngineCommand::Unload { deck: self.deck(), seq })?;
        *self.next_seq = seq;
        self.slot.view.publish_source(0, 0);
        self.slot.view.publish_request(seq, 0, true);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Set the play flag; an empty deck renders silence
    pub fn start(&mut self) -> ControlResult<()> {
        send(self.sender, EngineCommand::Start { deck: self.deck() })
    }

    pub fn stop(&mut self) -> ControlResult<()> {
        send(self.sender, EngineCommand::Stop { deck: self.deck() })
    }

    /// Set the loop flag; kept across loads and applied to an empty deck's
    /// next source
    pub fn set_looping(&mut self, looping: bool) -> ControlResult<()> {
        send(
            self.sender,
            EngineCommand::SetLooping {
                deck: self.deck(),
                looping,
            },
        )?;
        self.slot.settings.looping = looping;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────

    /// Set the gain, in [0, 1]
    pub fn set_gain(&mut self, gain: f64) -> ControlResult<()> {
        let gain = validate_unit("gain", gain).map_err(|e| rejected(self.id, e))?;
        send(
            self.sender,
            EngineCommand::SetGain {
                deck: self.deck(),
                gain: gain as f32,
            },
        )?;
        self.slot.settings.gain = gain;
        Ok(())
    }

    /// Set the playback speed factor, in (0, 100]
    pub fn set_speed(&mut self, speed: f64) -> ControlResult<()> {
        let speed = validate_speed(speed).map_err(|e| rejected(self.id, e))?;
        send(self.sender, EngineCommand::SetSpeed { deck: self.deck(), speed })?;
        self.slot.settings.speed = speed;
        Ok(())
    }

    /// Set the reverb room size, in [0, 1]
    pub fn set_room_size(&mut self, room_size: f64) -> ControlResult<()> {
        let room_size = validate_unit("room size", room_size).map_err(|e| rejected(self.id, e))?;
        send(
            self.sender,
            EngineCommand::SetRoomSize {
                deck: self.deck(),
                room_size: room_size as f32,
            },
        )?;
        self.slot.settings.room_size = room_size;
        Ok(())
    }

    /// Set the reverb damping, in [0, 1]
    pub fn set_damping(&mut self, damping: f64) -> ControlResult<()> {
        let damping = validate_unit("damping", damping).map_err(|e| rejected(self.id, e))?;
        send(
            self.sender,
            EngineCommand::SetDamping {
                deck: self.deck(),
                damping: damping as f32,
            },
        )?;
        self.slot.settings.damping = damping;
        Ok(())
    }

    /// Apply the fields of `settings` that differ from the current ones
    ///
    /// Goes through the validated setters and stops at the first rejected
    /// value; earlier ones stay applied. Unchanged room size and damping are
    /// not sent, so default settings leave the reverb bypassed.
    pub fn apply_settings(&mut self, settings: &DeckSettings) -> ControlResult<()> {
        let current = self.slot.settings;
        if settings.gain != current.gain {
            self.set_gain(settings.gain)?;
        }
        if settings.speed != current.speed {
            self.set_speed(settings.speed)?;
        }
        if settings.room_size != current.room_size {
            self.set_room_size(settings.room_size)?;
        }
        if settings.damping != current.damping {
            self.set_damping(settings.damping)?;
        }
        if settings.looping != current.looping {
            self.set_looping(settings.looping)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Position
    // ─────────────────────────────────────────────────────────────

    /// Seek to `seconds`
    ///
    /// Wraps into the source when looping, otherwise clamps to [0, length].
    pub fn set_position(&mut self, seconds: f64) -> ControlResult<()> {
        let seconds = validate_position(seconds).map_err(|e| rejected(self.id, e))?;
        let view = &self.slot.view;
        let frame = seek_target(
            seconds_to_frame(seconds, view.sample_rate()),
            view.length_frames(),
            self.slot.settings.looping,
        );
        self.seek_frame(frame)
    }

    /// Seek to a fraction of the length, in [0, 1]
    ///
    /// With no source loaded the target resolves to 0 seconds.
    pub fn set_position_relative(&mut self, fraction: f64) -> ControlResult<()> {
        let fraction = validate_unit("relative position", fraction).map_err(|e| rejected(self.id, e))?;
        let seconds = self.audio_length() * fraction;
        self.set_position(seconds)
    }

    fn seek_frame(&mut self, frame: u64) -> ControlResult<()> {
        let seq = *self.next_seq + 1;
        let cmd = EngineCommand::Seek {
            deck: self.deck(),
            frame,
            seq,
        };
        send(self.sender, cmd)?;
        *self.next_seq = seq;
        self.slot.view.publish_request(seq, frame, false);
        Ok(())
    }

    /// Position, length and play flag in one read
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.slot.view.snapshot()
    }

    /// Position as a fraction of the length; 0 when nothing is loaded
    pub fn position_relative(&self) -> f64 {
        self.snapshot().relative()
    }

    /// Current position in seconds
    pub fn current_position(&self) -> f64 {
        self.snapshot().position_seconds
    }

    /// Length of the loaded source in seconds, 0 when empty
    pub fn audio_length(&self) -> f64 {
        self.snapshot().length_seconds
    }

    pub fn is_playing(&self) -> bool {
        self.snapshot().is_playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{command_channel, AudioEngine};
    use crate::types::{StereoBuffer, StereoSample};
    use std::path::PathBuf;

    /// Produces one second of a constant level per location, fails on "missing"
    struct ConstantReader;

    impl SourceReader for ConstantReader {
        fn open_for_read(&self, location: &Path) -> LoadResult<DecodedSource> {
            if location.to_string_lossy().contains("missing") {
                return Err(LoadError::unreadable(location, "no such file"));
            }
            let frames = StereoBuffer::from_vec(vec![StereoSample::mono(1.0); 48000]);
            Ok(DecodedSource::new(frames, 48000))
        }
    }

    struct Rig {
        engine: AudioEngine,
        rx: rtrb::Consumer<EngineCommand>,
        controller: EngineController,
    }

    impl Rig {
        fn new() -> Self {
            let mut engine = AudioEngine::new();
            engine.prepare(256, 48000);
            let (tx, rx) = command_channel();
            let controller =
                EngineController::with_reader(CommandSender::new(tx), engine.deck_atomics(), Box::new(ConstantReader));
            Self { engine, rx, controller }
        }

        fn deck(&mut self, id: DeckId) -> DeckController<'_> {
            self.controller.deck(id).unwrap()
        }

        /// Run one render block on the "audio thread"
        fn pump(&mut self) -> StereoBuffer {
            let mut out = StereoBuffer::silence(256);
            self.engine.process_commands(&mut self.rx);
            self.engine.render_block(&mut out);
            out
        }
    }

    #[test]
    fn test_empty_deck_relative_position_is_zero() {
        let mut rig = Rig::new();
        let deck = rig.deck(DeckId::A);
        assert_eq!(deck.position_relative(), 0.0);
        assert_eq!(deck.audio_length(), 0.0);
        assert_eq!(deck.current_position(), 0.0);
    }

    #[test]
    fn test_load_play_and_position_advances() {
        let mut rig = Rig::new();
        let mut deck = rig.deck(DeckId::A);
        deck.load(Path::new("one_second.wav")).unwrap();
        assert!((deck.audio_length() - 1.0).abs() < 1e-9);
        deck.start().unwrap();

        rig.pump();
        rig.pump();
        let deck = rig.deck(DeckId::A);
        assert!(deck.is_playing());
        assert!(deck.current_position() > 0.0);
        assert!(deck.position_relative() > 0.0 && deck.position_relative() < 1.0);
    }

    #[test]
    fn test_failed_load_preserves_previous_source() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.pump();

        let err = rig.deck(DeckId::A).load(Path::new("missing.wav")).unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { .. }));
        rig.pump();
        assert!((rig.deck(DeckId::A).audio_length() - 1.0).abs() < 1e-9);

        // An empty deck stays empty
        let err = rig.deck(DeckId::B).load(&PathBuf::from("missing.mp3")).unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { .. }));
        assert_eq!(rig.deck(DeckId::B).audio_length(), 0.0);
    }

    #[test]
    fn test_relative_round_trip_before_and_after_render() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.pump();

        for fraction in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let mut deck = rig.deck(DeckId::A);
            deck.set_position_relative(fraction).unwrap();
            assert!((deck.position_relative() - fraction).abs() < 1e-9);
            rig.pump();
            // Stopped deck: the applied cursor equals the request
            assert!((rig.deck(DeckId::A).position_relative() - fraction).abs() < 1e-9);
        }
    }

    #[test]
    fn test_round_trip_while_playing_within_one_block() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.deck(DeckId::A).start().unwrap();
        rig.pump();

        rig.deck(DeckId::A).set_position_relative(0.5).unwrap();
        rig.pump();
        let relative = rig.deck(DeckId::A).position_relative();
        // One block plus the interpolator's lookahead
        let resolution = (256.0 + 4.0) / 48000.0;
        assert!((relative - 0.5).abs() <= resolution, "relative = {}", relative);
    }

    #[test]
    fn test_looping_seek_wraps_before_and_after_render() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.deck(DeckId::A).set_looping(true).unwrap();
        rig.pump();

        rig.deck(DeckId::A).set_position(2.5).unwrap();
        assert!((rig.deck(DeckId::A).current_position() - 0.5).abs() < 1e-9);
        rig.pump();
        assert!((rig.deck(DeckId::A).current_position() - 0.5).abs() < 1e-9);
        assert_eq!(rig.engine.deck(0).unwrap().position_frames(), 24000);

        rig.deck(DeckId::A).set_looping(false).unwrap();
        rig.deck(DeckId::A).set_position(2.5).unwrap();
        assert!((rig.deck(DeckId::A).current_position() - 1.0).abs() < 1e-9);
        rig.pump();
        assert_eq!(rig.engine.deck(0).unwrap().position_frames(), 48000);
    }

    #[test]
    fn test_seek_past_end_then_start_stays_silent() {
        let mut rig = Rig::new();
        rig.controller.remove_from_mix(DeckId::B).unwrap();
        let mut deck = rig.deck(DeckId::A);
        deck.load(Path::new("track.wav")).unwrap();
        deck.set_position(5.0).unwrap();
        deck.start().unwrap();

        let out = rig.pump();
        assert_eq!(out.peak(), 0.0);
        let deck = rig.deck(DeckId::A);
        assert!(!deck.is_playing());
        assert_eq!(deck.position_relative(), 1.0);
    }

    #[test]
    fn test_rejected_parameters_keep_previous_values() {
        let mut rig = Rig::new();
        let mut deck = rig.deck(DeckId::A);
        deck.set_gain(0.7).unwrap();
        deck.set_speed(1.5).unwrap();
        deck.set_room_size(0.2).unwrap();
        deck.set_damping(0.9).unwrap();

        assert!(matches!(deck.set_gain(1.2), Err(ControlError::InvalidParameter { .. })));
        assert!(deck.set_speed(0.0).is_err());
        assert!(deck.set_speed(101.0).is_err());
        assert!(deck.set_room_size(-0.5).is_err());
        assert!(deck.set_damping(2.0).is_err());
        assert!(deck.set_position(f64::INFINITY).is_err());
        assert!(deck.set_position_relative(-0.1).is_err());

        let settings = deck.settings();
        assert_eq!(settings.gain, 0.7);
        assert_eq!(settings.speed, 1.5);
        assert_eq!(settings.room_size, 0.2);
        assert_eq!(settings.damping, 0.9);

        rig.pump();
        let engine_deck = rig.engine.deck(0).unwrap();
        assert!((engine_deck.gain() - 0.7).abs() < 1e-6);
        assert_eq!(engine_deck.speed(), 1.5);
        assert!((engine_deck.damping() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_gain_scales_rendered_output() {
        let mut rig = Rig::new();
        rig.controller.remove_from_mix(DeckId::B).unwrap();
        let mut deck = rig.deck(DeckId::A);
        deck.load(Path::new("track.wav")).unwrap();
        deck.set_gain(0.25).unwrap();
        deck.start().unwrap();

        let out = rig.pump();
        assert!(out.iter().all(|s| (s.left - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_looping_flag_survives_empty_deck_and_load() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).set_looping(true).unwrap();
        rig.pump();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.pump();

        assert!(rig.engine.deck(0).unwrap().is_looping());
        assert!(rig.deck(DeckId::A).settings().looping);
    }

    #[test]
    fn test_start_stop_are_idempotent() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.deck(DeckId::A).stop().unwrap();
        rig.deck(DeckId::A).stop().unwrap();
        rig.pump();
        assert!(!rig.deck(DeckId::A).is_playing());

        rig.deck(DeckId::A).start().unwrap();
        rig.deck(DeckId::A).start().unwrap();
        rig.pump();
        assert!(rig.deck(DeckId::A).is_playing());
    }

    #[test]
    fn test_load_reports_stopped_until_applied() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.deck(DeckId::A).start().unwrap();
        rig.pump();
        rig.pump();
        assert!(rig.deck(DeckId::A).current_position() > 0.0);

        rig.deck(DeckId::A).load(Path::new("other.wav")).unwrap();
        let deck = rig.deck(DeckId::A);
        assert_eq!(deck.current_position(), 0.0);
        assert!(!deck.is_playing());
    }

    #[test]
    fn test_full_queue_rejects_without_changing_settings() {
        let mut rig = Rig::new();
        let mut deck = rig.deck(DeckId::A);
        while deck.start().is_ok() {}

        assert_eq!(deck.set_gain(0.5), Err(ControlError::QueueFull("set gain")));
        assert_eq!(deck.settings().gain, 1.0);
        assert!(matches!(deck.load(Path::new("track.wav")), Err(LoadError::QueueFull)));
        assert_eq!(deck.audio_length(), 0.0);
        assert!(deck.set_position(0.5).is_err());
    }

    #[test]
    fn test_unload_returns_to_empty() {
        let mut rig = Rig::new();
        rig.deck(DeckId::A).load(Path::new("track.wav")).unwrap();
        rig.deck(DeckId::A).set_gain(0.4).unwrap();
        rig.pump();
        rig.deck(DeckId::A).unload().unwrap();
        rig.pump();

        let deck = rig.deck(DeckId::A);
        assert_eq!(deck.audio_length(), 0.0);
        assert_eq!(deck.position_relative(), 0.0);
        assert_eq!(deck.settings().gain, 0.4);
        assert!(!rig.engine.deck(0).unwrap().has_source());
    }

    #[test]
    fn test_unknown_deck() {
        let mut rig = Rig::new();
        assert!(rig.controller.deck(DeckId(5)).is_none());
        assert!(matches!(rig.controller.try_deck(DeckId(5)), Err(ControlError::UnknownDeck(5))));
        assert_eq!(rig.controller.add_to_mix(DeckId(5)), Err(ControlError::UnknownDeck(5)));
    }

    #[test]
    fn test_two_deck_mix_through_controller() {
        let mut rig = Rig::new();
        for (id, gain) in [(DeckId::A, 0.5), (DeckId::B, 0.3)] {
            let mut deck = rig.deck(id);
            deck.load(Path::new("track.wav")).unwrap();
            deck.set_gain(gain).unwrap();
            deck.start().unwrap();
        }
        let out = rig.pump();
        assert!(out.iter().all(|s| (s.left - 0.8).abs() < 1e-6));
    }

    #[test]
    fn test_apply_settings_from_yaml() {
        let mut rig = Rig::new();
        let settings: DeckSettings = serde_yaml::from_str("gain: 0.6\nlooping: true\n").unwrap();
        assert_eq!(settings.speed, 1.0);

        rig.deck(DeckId::B).apply_settings(&settings).unwrap();
        rig.pump();
        let deck = rig.engine.deck(1).unwrap();
        assert!((deck.gain() - 0.6).abs() < 1e-6);
        assert!(deck.is_looping());
        assert!(!deck.reverb_engaged());

        let wet = DeckSettings { room_size: 0.9, ..settings };
        rig.deck(DeckId::B).apply_settings(&wet).unwrap();
        rig.pump();
        assert!(rig.engine.deck(1).unwrap().reverb_engaged());

        let bad = DeckSettings { speed: 0.0, ..settings };
        assert!(rig.deck(DeckId::A).apply_settings(&bad).is_err());
        assert_eq!(rig.deck(DeckId::A).settings().gain, 0.6);
        assert_eq!(rig.deck(DeckId::A).settings().speed, 1.0);
    }
}

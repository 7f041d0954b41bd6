//! Deck gate - read cursor, loop, gain and play flag
//!
//! The transport is the first stage of a deck's render chain. It owns the
//! deck's optional source and produces one frame at a time for the
//! resampler to pull from.

use crate::source::DecodedSource;
use crate::types::{PlayState, StereoSample};

/// Resolve a requested cursor against a source of `length` frames
///
/// A looping source wraps the target modulo its length; otherwise the target
/// clamps to [0, length].
pub fn seek_target(frame: u64, length: u64, looping: bool) -> u64 {
    if looping && length > 0 {
        frame % length
    } else {
        frame.min(length)
    }
}

/// A pull-based producer of stereo frames
///
/// Stages downstream of the transport (the resampler) read through this
/// trait so they can be tested against synthetic sources.
pub trait FrameSource {
    /// Produce the next frame, advancing any internal cursor
    fn next_frame(&mut self) -> StereoSample;
}

/// Transport state for one deck
#[derive(Debug)]
pub struct Transport {
    source: Option<DecodedSource>,
    /// Read cursor in source frames, always within [0, length]
    cursor: u64,
    looping: bool,
    gain: f32,
    state: PlayState,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            source: None,
            cursor: 0,
            looping: false,
            gain: 1.0,
            state: PlayState::Stopped,
        }
    }

    /// Replace the source, rewind to 0 and stop
    ///
    /// Gain and loop flag are kept. Returns the replaced source so the caller
    /// decides where it is dropped.
    pub fn load(&mut self, source: DecodedSource) -> Option<DecodedSource> {
        self.cursor = 0;
        self.state = PlayState::Stopped;
        self.source.replace(source)
    }

    /// Remove the source, returning the deck to empty
    pub fn unload(&mut self) -> Option<DecodedSource> {
        self.cursor = 0;
        self.state = PlayState::Stopped;
        self.source.take()
    }

    pub fn source(&self) -> Option<&DecodedSource> {
        self.source.as_ref()
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn start(&mut self) {
        self.state = PlayState::Playing;
    }

    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Move the cursor; see [`seek_target`]
    pub fn seek(&mut self, frame: u64) {
        self.cursor = seek_target(frame, self.length_frames(), self.looping);
    }

    /// Read cursor in source frames
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Length of the loaded source in frames (0 when empty)
    pub fn length_frames(&self) -> u64 {
        self.source.as_ref().map_or(0, |s| s.length_frames())
    }

    /// Sample rate of the loaded source (0 when empty)
    pub fn sample_rate(&self) -> u32 {
        self.source.as_ref().map_or(0, |s| s.sample_rate())
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for Transport {
    #[inline]
    fn next_frame(&mut self) -> StereoSample {
        if self.state != PlayState::Playing {
            return StereoSample::silence();
        }
        // No source renders silence, the play flag is left as is
        let Some(source) = self.source.as_ref() else {
            return StereoSample::silence();
        };
        let frames = source.frames();
        let length = frames.len() as u64;

        if self.cursor >= length {
            if self.looping && length > 0 {
                self.cursor = 0;
            } else {
                // Finished: hold the cursor at the end
                self.cursor = length;
                self.state = PlayState::Stopped;
                return StereoSample::silence();
            }
        }

        let frame = frames[self.cursor as usize] * self.gain;
        self.cursor += 1;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoBuffer;

    fn ramp_source(len: usize) -> DecodedSource {
        let frames = (0..len).map(|i| StereoSample::mono(i as f32)).collect();
        DecodedSource::new(StereoBuffer::from_vec(frames), 48000)
    }

    #[test]
    fn test_stopped_transport_is_silent() {
        let mut transport = Transport::new();
        transport.load(ramp_source(4));
        assert_eq!(transport.next_frame(), StereoSample::silence());
        assert_eq!(transport.cursor(), 0);
    }

    #[test]
    fn test_start_without_source_renders_silence() {
        let mut transport = Transport::new();
        transport.start();
        assert_eq!(transport.next_frame(), StereoSample::silence());
        assert!(transport.is_playing());
    }

    #[test]
    fn test_gain_scales_frames() {
        let mut transport = Transport::new();
        transport.load(ramp_source(4));
        transport.set_gain(0.5);
        transport.start();
        assert_eq!(transport.next_frame().left, 0.0);
        assert_eq!(transport.next_frame().left, 0.5);
        assert_eq!(transport.next_frame().left, 1.0);
    }

    #[test]
    fn test_non_looping_stops_at_end() {
        let mut transport = Transport::new();
        transport.load(ramp_source(3));
        transport.start();
        for _ in 0..3 {
            transport.next_frame();
        }
        assert_eq!(transport.next_frame(), StereoSample::silence());
        assert_eq!(transport.cursor(), 3);
        assert!(!transport.is_playing());
    }

    #[test]
    fn test_looping_wraps_to_start() {
        let mut transport = Transport::new();
        transport.load(ramp_source(3));
        transport.set_looping(true);
        transport.start();
        let lefts: Vec<f32> = (0..7).map(|_| transport.next_frame().left).collect();
        assert_eq!(lefts, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0]);
        assert!(transport.is_playing());
    }

    #[test]
    fn test_load_rewinds_and_keeps_settings() {
        let mut transport = Transport::new();
        transport.load(ramp_source(10));
        transport.set_looping(true);
        transport.set_gain(0.25);
        transport.seek(6);
        transport.start();

        let previous = transport.load(ramp_source(5));
        assert!(previous.is_some());
        assert_eq!(transport.cursor(), 0);
        assert!(!transport.is_playing());
        assert!(transport.is_looping());
        assert_eq!(transport.gain(), 0.25);
        assert_eq!(transport.length_frames(), 5);
    }

    #[test]
    fn test_seek_clamps_to_length() {
        let mut transport = Transport::new();
        transport.load(ramp_source(8));
        transport.seek(100);
        assert_eq!(transport.cursor(), 8);
        transport.unload();
        transport.seek(5);
        assert_eq!(transport.cursor(), 0);
    }

    #[test]
    fn test_seek_wraps_when_looping() {
        let mut transport = Transport::new();
        transport.load(ramp_source(8));
        transport.set_looping(true);
        transport.seek(21);
        assert_eq!(transport.cursor(), 5);
        transport.seek(8);
        assert_eq!(transport.cursor(), 0);
        transport.seek(3);
        assert_eq!(transport.cursor(), 3);

        transport.start();
        assert_eq!(transport.next_frame().left, 3.0);
    }

    #[test]
    fn test_seek_target() {
        assert_eq!(seek_target(100, 8, false), 8);
        assert_eq!(seek_target(100, 8, true), 4);
        assert_eq!(seek_target(7, 8, true), 7);
        assert_eq!(seek_target(5, 0, true), 0);
        assert_eq!(seek_target(5, 0, false), 0);
    }
}

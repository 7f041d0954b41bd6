//! Reader binding - opens audio locations and exposes decoded sources
//!
//! A load happens on the control thread: the file is opened, probed and fully
//! decoded into memory here, so the audio thread only ever receives a finished
//! [`DecodedSource`]. The decoded frames live behind a `basedrop::Shared`
//! pointer, so when the audio thread replaces a source the old frames are
//! handed to the GC thread instead of being freed in the render callback.
//!
//! # Usage
//!
//! ```ignore
//! use twindeck_core::source::{SourceReader, SymphoniaReader};
//!
//! let source = SymphoniaReader.open_for_read(Path::new("track.mp3"))?;
//! println!("{} frames @ {}Hz", source.length_frames(), source.sample_rate());
//! ```

mod duration;
mod error;
mod symphonia_reader;

use std::fmt;
use std::path::Path;

use basedrop::Shared;

use crate::engine::gc::gc_handle;
use crate::types::{StereoBuffer, StereoSample};

pub use duration::format_duration;
pub use error::{LoadError, LoadResult};
pub use symphonia_reader::{probe_duration, SymphoniaReader};

/// The reader binding consumed by the deck engine
///
/// Implementations turn a location into a finite, seekable source with a
/// known length and sample rate, or fail with [`LoadError::Unreadable`].
pub trait SourceReader: Send {
    /// Open and decode the audio at `location`
    fn open_for_read(&self, location: &Path) -> LoadResult<DecodedSource>;
}

/// A fully decoded stereo source
///
/// Cheap to clone (the frames are shared). Read access is random: the deck's
/// transport owns the read cursor, the source itself is stateless.
#[derive(Clone)]
pub struct DecodedSource {
    frames: Shared<StereoBuffer>,
    sample_rate: u32,
}

impl DecodedSource {
    /// Wrap decoded frames recorded at `sample_rate`
    pub fn new(frames: StereoBuffer, sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0, "decoded source needs a sample rate");
        Self {
            frames: Shared::new(&gc_handle(), frames),
            sample_rate,
        }
    }

    /// Source sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total length in frames
    #[inline]
    pub fn length_frames(&self) -> u64 {
        self.frames.len() as u64
    }

    /// Total length in seconds (0 for an empty source)
    pub fn length_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.length_frames() as f64 / self.sample_rate as f64
    }

    /// Block read access to the decoded frames
    #[inline]
    pub fn frames(&self) -> &[StereoSample] {
        self.frames.as_slice()
    }
}

impl fmt::Debug for DecodedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedSource")
            .field("frames", &self.frames.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_source_lengths() {
        let source = DecodedSource::new(StereoBuffer::silence(44100), 44100);
        assert_eq!(source.length_frames(), 44100);
        assert!((source.length_seconds() - 1.0).abs() < 1e-9);
        assert_eq!(source.frames().len(), 44100);
    }

    #[test]
    fn test_empty_source_has_zero_length() {
        let source = DecodedSource::new(StereoBuffer::default(), 48000);
        assert_eq!(source.length_frames(), 0);
        assert_eq!(source.length_seconds(), 0.0);
    }

    #[test]
    fn test_clone_shares_frames() {
        let source = DecodedSource::new(StereoBuffer::from_vec(vec![StereoSample::mono(0.25); 8]), 48000);
        let copy = source.clone();
        assert_eq!(copy.frames().as_ptr(), source.frames().as_ptr());
    }
}

//! Symphonia-backed reader binding
//!
//! Decodes any container/codec pair symphonia was built with (mp3, wav, flac,
//! ogg/vorbis) into an in-memory stereo buffer. Mono sources are duplicated
//! to both channels; channels beyond the first two are dropped.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{DecodedSource, LoadError, LoadResult, SourceReader};
use crate::types::{StereoBuffer, StereoSample};

/// Default reader: full decode through symphonia
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaReader;

impl SourceReader for SymphoniaReader {
    fn open_for_read(&self, location: &Path) -> LoadResult<DecodedSource> {
        let (frames, sample_rate) = decode_stereo(location)?;
        if frames.is_empty() {
            log::warn!("{:?} decoded to zero frames", location);
        }
        log::debug!(
            "Decoded {:?}: {} frames @ {}Hz",
            location,
            frames.len(),
            sample_rate
        );
        Ok(DecodedSource::new(frames, sample_rate))
    }
}

/// Total duration of the audio at `path`, in seconds
///
/// Reads the frame count from the container when it is declared; otherwise
/// the file is decoded to count frames.
pub fn probe_duration(path: &Path) -> LoadResult<f64> {
    let format = open_format(path)?;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::unreadable(path, "no audio track found"))?;

    if let (Some(n_frames), Some(rate)) = (track.codec_params.n_frames, track.codec_params.sample_rate) {
        if rate > 0 {
            return Ok(n_frames as f64 / rate as f64);
        }
    }

    let (frames, sample_rate) = decode_stereo(path)?;
    Ok(frames.len() as f64 / sample_rate as f64)
}

fn open_format(path: &Path) -> LoadResult<Box<dyn FormatReader>> {
    let file = File::open(path).map_err(|e| LoadError::unreadable(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| LoadError::unreadable(path, e))?;

    Ok(probed.format)
}

/// Decode the first audio track of `path` to stereo frames
fn decode_stereo(path: &Path) -> LoadResult<(StereoBuffer, u32)> {
    let mut format = open_format(path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::unreadable(path, "no audio track found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|&rate| rate > 0)
        .ok_or_else(|| LoadError::unreadable(path, "unknown sample rate"))?;
    let capacity = track.codec_params.n_frames.unwrap_or(0) as usize;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::unreadable(path, e))?;

    let mut frames: Vec<StereoSample> = Vec::with_capacity(capacity);
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet from {:?}: {}", path, e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Error decoding packet from {:?}: {}", path, e);
                continue;
            }
            Err(e) => return Err(LoadError::unreadable(path, e)),
        };

        let channels = decoded.spec().channels.count();
        if channels == 0 {
            continue;
        }

        // Packets may grow past the first one's capacity (e.g. vorbis)
        let needs_alloc = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * channels);
        if needs_alloc {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, *decoded.spec()));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            frames.extend(buf.samples().chunks_exact(channels).map(|frame| {
                if channels == 1 {
                    StereoSample::mono(frame[0])
                } else {
                    StereoSample::new(frame[0], frame[1])
                }
            }));
        }
    }

    Ok((StereoBuffer::from_vec(frames), sample_rate))
}

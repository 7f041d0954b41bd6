//! Variable-ratio resampler stage
//!
//! Pulls frames from the deck's transport at `speed * source_rate /
//! output_rate` source frames per output frame and interpolates between them,
//! so the output always runs at the pipeline rate whatever the playback speed.
//!
//! The interpolator keeps a four frame history window and a fractional read
//! phase. Both survive ratio changes, so a speed change between blocks only
//! bends the pitch and never jumps the read position.
//!
//! ## Interpolation Methods
//!
//! - **Linear**: 2-point, cheapest.
//! - **Cubic**: 4-point Catmull-Rom spline (default).

use super::transport::FrameSource;
use crate::types::{StereoSample, DEFAULT_SAMPLE_RATE};

/// Interpolation method for variable-speed playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMethod {
    /// Linear interpolation (2-point) - fast, acceptable quality
    Linear,
    /// Cubic Catmull-Rom interpolation (4-point) - better quality
    #[default]
    Cubic,
}

/// Linear interpolation between two samples
#[inline]
fn lerp_sample(s0: StereoSample, s1: StereoSample, t: f32) -> StereoSample {
    StereoSample {
        left: s0.left + (s1.left - s0.left) * t,
        right: s0.right + (s1.right - s0.right) * t,
    }
}

/// Catmull-Rom interpolation between `s1` and `s2`
#[inline]
fn cubic_interpolate(s0: StereoSample, s1: StereoSample, s2: StereoSample, s3: StereoSample, t: f32) -> StereoSample {
    let t2 = t * t;
    let t3 = t2 * t;

    // Catmull-Rom basis functions (tension = 0.5)
    let c0 = -0.5 * t3 + t2 - 0.5 * t;
    let c1 = 1.5 * t3 - 2.5 * t2 + 1.0;
    let c2 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
    let c3 = 0.5 * t3 - 0.5 * t2;

    StereoSample {
        left: s0.left * c0 + s1.left * c1 + s2.left * c2 + s3.left * c3,
        right: s0.right * c0 + s1.right * c1 + s2.right * c2 + s3.right * c3,
    }
}

/// Streaming resampler wrapping a [`FrameSource`]
#[derive(Debug, Clone)]
pub struct Resampler {
    /// History window: [x(n-1), x(n), x(n+1), x(n+2)], output lies between x(n) and x(n+1)
    history: [StereoSample; 4],
    /// Fractional position between history[1] and history[2]
    phase: f64,
    /// True once the history window holds source frames
    primed: bool,
    /// Playback speed factor (1.0 = unity)
    speed: f64,
    source_rate: u32,
    output_rate: u32,
    /// Source frames consumed per output frame
    step: f64,
    interpolation: InterpolationMethod,
}

impl Resampler {
    pub fn new() -> Self {
        Self {
            history: [StereoSample::silence(); 4],
            phase: 0.0,
            primed: false,
            speed: 1.0,
            source_rate: DEFAULT_SAMPLE_RATE,
            output_rate: DEFAULT_SAMPLE_RATE,
            step: 1.0,
            interpolation: InterpolationMethod::default(),
        }
    }

    /// Set the pipeline output rate negotiated at prepare time
    pub fn prepare(&mut self, output_rate: u32) {
        self.output_rate = output_rate.max(1);
        self.update_step();
        self.reset();
    }

    /// Set the rate of the source being read
    pub fn set_source_rate(&mut self, source_rate: u32) {
        if source_rate > 0 {
            self.source_rate = source_rate;
            self.update_step();
        }
    }

    /// Set the playback speed factor; takes effect on the next output frame
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
        self.update_step();
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_interpolation(&mut self, method: InterpolationMethod) {
        self.interpolation = method;
    }

    /// Source frames consumed per output frame
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Drop the history window (on load and seek)
    pub fn reset(&mut self) {
        self.history = [StereoSample::silence(); 4];
        self.phase = 0.0;
        self.primed = false;
    }

    fn update_step(&mut self) {
        self.step = self.speed * self.source_rate as f64 / self.output_rate as f64;
    }

    /// Fill `out` with resampled frames pulled from `source`
    pub fn process<S: FrameSource>(&mut self, source: &mut S, out: &mut [StereoSample]) {
        if !self.primed {
            // First output lands exactly on the first source frame
            self.history = [
                StereoSample::silence(),
                source.next_frame(),
                source.next_frame(),
                source.next_frame(),
            ];
            self.phase = 0.0;
            self.primed = true;
        }

        for frame in out.iter_mut() {
            let [s0, s1, s2, s3] = self.history;
            let t = self.phase as f32;
            *frame = match self.interpolation {
                InterpolationMethod::Linear => lerp_sample(s1, s2, t),
                InterpolationMethod::Cubic => cubic_interpolate(s0, s1, s2, s3, t),
            };

            self.phase += self.step;
            while self.phase >= 1.0 {
                self.phase -= 1.0;
                self.history = [self.history[1], self.history[2], self.history[3], source.next_frame()];
            }
        }
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}

//! Stereo reverb stage
//!
//! A Freeverb-style room simulation:
//! - 8 parallel comb filters per channel with one-pole damping
//! - 4 series all-pass filters per channel for diffusion
//! - right channel delay lines offset by a fixed stereo spread
//!
//! Room size and damping are the exposed parameters. Width and wet mix are
//! fixed.

use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::{StereoBuffer, DEFAULT_SAMPLE_RATE};

/// Comb filter delay line lengths (in samples at 44.1kHz)
const COMB_LENGTHS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];

/// Allpass filter delay line lengths (in samples at 44.1kHz)
const ALLPASS_LENGTHS: [usize; 4] = [225, 556, 441, 341];

/// Stereo spread offset for right channel (in samples at 44.1kHz)
const STEREO_SPREAD: usize = 23;

/// Rate the delay line lengths above are tuned for
const REFERENCE_RATE: f64 = 44100.0;

/// Allpass feedback coefficient
const ALLPASS_FEEDBACK: f32 = 0.5;

/// Gain compensation for comb filter summing
const COMB_GAIN: f32 = 0.2;

/// Fixed stereo width (full stereo)
const WIDTH: f32 = 1.0;

/// Fixed wet level; dry is `1 - WET`
///
/// Freeverb's usual dry default is 0.4. Here dry and wet sum to one so an
/// engaged stage keeps the deck's direct signal near unity gain, and the
/// stage stays bypassed until room size or damping is first set so gain
/// reaches the output unscaled.
const WET: f32 = 0.33;

/// Parameter indices
pub const PARAM_ROOM_SIZE: usize = 0;
pub const PARAM_DAMPING: usize = 1;

fn scaled_length(length: usize, sample_rate: u32) -> usize {
    ((length as f64 * sample_rate as f64 / REFERENCE_RATE) as usize).max(1)
}

/// Comb filter for reverb
struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    filter_state: f32,
}

impl CombFilter {
    fn new(length: usize, sample_rate: u32) -> Self {
        Self {
            buffer: vec![0.0; scaled_length(length, sample_rate)],
            pos: 0,
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.pos];

        // One-pole lowpass in the feedback path
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;

        self.buffer[self.pos] = input + self.filter_state * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();

        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
        self.filter_state = 0.0;
    }
}

/// Allpass filter for diffusion
struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllpassFilter {
    fn new(length: usize, sample_rate: u32) -> Self {
        Self {
            buffer: vec![0.0; scaled_length(length, sample_rate)],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let buffered = self.buffer[self.pos];
        let output = -input + buffered;
        self.buffer[self.pos] = input + buffered * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

/// Freeverb-style stereo reverb
///
/// Parameters:
/// - Room Size: decay time (0.0-1.0)
/// - Damping: high frequency damping (0.0 = bright, 1.0 = dark)
///
/// Starts bypassed; the owning deck engages it once a parameter is set.
pub struct ReverbEffect {
    base: EffectBase,
    combs_l: Vec<CombFilter>,
    combs_r: Vec<CombFilter>,
    allpass_l: Vec<AllpassFilter>,
    allpass_r: Vec<AllpassFilter>,
    sample_rate: u32,
}

impl ReverbEffect {
    pub fn new() -> Self {
        let info = EffectInfo::new("Reverb")
            .with_param(ParamInfo::new("Room Size", 0.5).with_range(0.0, 1.0))
            .with_param(ParamInfo::new("Damping", 0.5).with_range(0.0, 1.0));

        let mut base = EffectBase::new(info);
        base.set_bypass(true);

        let mut reverb = Self {
            base,
            combs_l: Vec::new(),
            combs_r: Vec::new(),
            allpass_l: Vec::new(),
            allpass_r: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        };
        reverb.build_filters(DEFAULT_SAMPLE_RATE);
        reverb
    }

    fn build_filters(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.combs_l = COMB_LENGTHS.iter().map(|&len| CombFilter::new(len, sample_rate)).collect();
        self.combs_r = COMB_LENGTHS
            .iter()
            .map(|&len| CombFilter::new(len + STEREO_SPREAD, sample_rate))
            .collect();
        self.allpass_l = ALLPASS_LENGTHS
            .iter()
            .map(|&len| AllpassFilter::new(len, sample_rate))
            .collect();
        self.allpass_r = ALLPASS_LENGTHS
            .iter()
            .map(|&len| AllpassFilter::new(len + STEREO_SPREAD, sample_rate))
            .collect();
    }

    /// Room size parameter (0.0-1.0)
    pub fn room_size(&self) -> f32 {
        self.base.param_actual(PARAM_ROOM_SIZE)
    }

    /// Damping parameter (0.0-1.0)
    pub fn damping(&self) -> f32 {
        self.base.param_actual(PARAM_DAMPING)
    }

    /// Rate the delay lines are currently sized for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Comb feedback derived from room size (0.7-0.98)
    fn feedback(&self) -> f32 {
        0.7 + self.room_size() * 0.28
    }
}

impl Default for ReverbEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ReverbEffect {
    fn prepare(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate && sample_rate > 0 {
            self.build_filters(sample_rate);
        } else {
            self.reset();
        }
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        if self.base.is_bypassed() {
            return;
        }

        let feedback = self.feedback();
        let damp = self.damping();
        let dry = 1.0 - WET;
        let wet1 = WET * (WIDTH / 2.0 + 0.5);
        let wet2 = WET * ((1.0 - WIDTH) / 2.0);

        for sample in buffer.iter_mut() {
            let input = (sample.left + sample.right) * 0.5;

            let mut out_l = 0.0f32;
            let mut out_r = 0.0f32;

            for comb in &mut self.combs_l {
                out_l += comb.process(input, feedback, damp);
            }
            for comb in &mut self.combs_r {
                out_r += comb.process(input, feedback, damp);
            }

            out_l *= COMB_GAIN;
            out_r *= COMB_GAIN;

            for ap in &mut self.allpass_l {
                out_l = ap.process(out_l, ALLPASS_FEEDBACK);
            }
            for ap in &mut self.allpass_r {
                out_r = ap.process(out_r, ALLPASS_FEEDBACK);
            }

            let out_left = out_l * wet1 + out_r * wet2 + sample.left * dry;
            let out_right = out_r * wet1 + out_l * wet2 + sample.right * dry;

            sample.left = out_left;
            sample.right = out_right;
        }
    }

    fn info(&self) -> &EffectInfo {
        self.base.info()
    }

    fn get_params(&self) -> &[ParamValue] {
        self.base.get_params()
    }

    fn set_param(&mut self, index: usize, value: f32) {
        self.base.set_param(index, value);
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.base.set_bypass(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.base.is_bypassed()
    }

    fn reset(&mut self) {
        for comb in self.combs_l.iter_mut().chain(self.combs_r.iter_mut()) {
            comb.reset();
        }
        for ap in self.allpass_l.iter_mut().chain(self.allpass_r.iter_mut()) {
            ap.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    fn impulse(len: usize) -> StereoBuffer {
        let mut buffer = StereoBuffer::silence(len);
        buffer[0] = StereoSample::new(1.0, 1.0);
        buffer
    }

    #[test]
    fn test_reverb_starts_bypassed() {
        let mut effect = ReverbEffect::new();
        assert!(effect.is_bypassed());
        assert_eq!(effect.info().param_count(), 2);

        let mut buffer = impulse(64);
        effect.process(&mut buffer);
        assert_eq!(buffer[0], StereoSample::new(1.0, 1.0));
        assert!(buffer.iter().skip(1).all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_reverb_dry_path() {
        let mut effect = ReverbEffect::new();
        effect.set_bypass(false);

        let mut buffer = impulse(64);
        effect.process(&mut buffer);

        // Comb delays exceed the block, so only the dry impulse is audible
        assert!((buffer[0].left - (1.0 - WET)).abs() < 1e-6);
        assert!((buffer[0].right - 0.67).abs() < 1e-6);
        assert!(buffer.iter().skip(1).all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_reverb_tail() {
        let mut effect = ReverbEffect::new();
        effect.set_bypass(false);

        let mut buffer = impulse(8192);
        effect.process(&mut buffer);

        let tail_energy: f32 = buffer.iter().skip(1300).map(|s| s.left.abs()).sum();
        assert!(tail_energy > 0.0, "Should have reverb energy after comb delays");

        let spread = buffer
            .iter()
            .skip(1300)
            .filter(|s| (s.left - s.right).abs() > 1e-6)
            .count();
        assert!(spread > 0, "Stereo spread should decorrelate channels");
    }

    #[test]
    fn test_room_size_and_damping_are_independent() {
        let mut effect = ReverbEffect::new();
        effect.set_param(PARAM_ROOM_SIZE, 0.9);
        assert!((effect.room_size() - 0.9).abs() < 1e-6);
        assert!((effect.damping() - 0.5).abs() < 1e-6);

        effect.set_param(PARAM_DAMPING, 0.1);
        assert!((effect.room_size() - 0.9).abs() < 1e-6);
        assert!((effect.damping() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_larger_room_decays_slower() {
        let tail = |room: f32| {
            let mut effect = ReverbEffect::new();
            effect.set_bypass(false);
            effect.set_param(PARAM_ROOM_SIZE, room);
            let mut buffer = impulse(16384);
            effect.process(&mut buffer);
            buffer.iter().skip(12000).map(|s| s.left.abs()).sum::<f32>()
        };
        assert!(tail(1.0) > tail(0.0));
    }

    #[test]
    fn test_prepare_resizes_and_clears() {
        let mut effect = ReverbEffect::new();
        effect.set_bypass(false);
        let mut buffer = StereoBuffer::from_vec(vec![StereoSample::mono(1.0); 4096]);
        effect.process(&mut buffer);

        effect.prepare(44100);
        assert_eq!(effect.sample_rate(), 44100);
        assert_eq!(effect.combs_l[0].buffer.len(), COMB_LENGTHS[0]);

        let mut silence = StereoBuffer::silence(256);
        effect.process(&mut silence);
        assert!(silence.iter().all(|s| *s == StereoSample::silence()));
    }

    #[test]
    fn test_parameter_change_keeps_tail() {
        let mut effect = ReverbEffect::new();
        effect.set_bypass(false);
        let mut buffer = impulse(2048);
        effect.process(&mut buffer);

        effect.set_param(PARAM_DAMPING, 0.9);
        let mut next = StereoBuffer::silence(2048);
        effect.process(&mut next);
        assert!(next.peak() > 0.0, "Tail should survive a parameter change");
    }
}

//! Control-side parameter validation
//!
//! Every deck write is validated before it is published to the audio thread.
//! Rejected writes leave the deck untouched.

use thiserror::Error;

/// Errors from deck control operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("{name} = {value} is outside {range}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("Engine command queue is full, {0} dropped")]
    QueueFull(&'static str),

    #[error("No deck with index {0}")]
    UnknownDeck(usize),
}

pub type ControlResult<T> = Result<T, ControlError>;

/// Highest accepted playback speed factor
pub const MAX_SPEED: f64 = 100.0;

/// Validate a value in the closed unit interval [0, 1]
///
/// Used for gain, reverb room size/damping and relative positions. NaN is
/// rejected.
pub fn validate_unit(name: &'static str, value: f64) -> ControlResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ControlError::InvalidParameter {
            name,
            value,
            range: "[0, 1]",
        })
    }
}

/// Validate a playback speed factor in (0, 100]
pub fn validate_speed(value: f64) -> ControlResult<f64> {
    if value > 0.0 && value <= MAX_SPEED {
        Ok(value)
    } else {
        Err(ControlError::InvalidParameter {
            name: "speed",
            value,
            range: "(0, 100]",
        })
    }
}

/// Validate an absolute position in seconds
///
/// Any finite value is accepted; the transport clamps it into the source.
pub fn validate_position(value: f64) -> ControlResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ControlError::InvalidParameter {
            name: "position",
            value,
            range: "finite seconds",
        })
    }
}

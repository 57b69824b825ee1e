//! Curve-based wave shaping with optional oversampling.
//!
//! The transfer curve spans input [-1, 1]: the first entry maps -1, the last
//! maps +1, and inputs in between are linearly interpolated. Inputs outside
//! the range take the nearest end value. With no curve the shaper passes
//! audio through unchanged.
//!
//! Oversampling runs the curve at 2x or 4x the context rate (linear
//! upsampling, averaging decimation). It trades CPU for less aliasing and
//! never changes the curve itself.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Oversampling factor applied around the curve lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverSample {
    /// Shape at the context rate.
    #[default]
    #[serde(rename = "none")]
    None,
    /// Shape at twice the context rate.
    #[serde(rename = "2x")]
    X2,
    /// Shape at four times the context rate.
    #[serde(rename = "4x")]
    X4,
}

impl OverSample {
    /// Returns the oversampling factor (1, 2 or 4).
    pub const fn factor(self) -> usize {
        match self {
            Self::None => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// Returns the display name (`"none"`, `"2x"`, `"4x"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::X2 => "2x",
            Self::X4 => "4x",
        }
    }
}

impl fmt::Display for OverSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown oversampling name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown oversample mode: {0}")]
pub struct UnknownOverSample(pub String);

impl FromStr for OverSample {
    type Err = UnknownOverSample;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "2x" => Ok(Self::X2),
            "4x" => Ok(Self::X4),
            other => Err(UnknownOverSample(other.to_string())),
        }
    }
}

/// Wave shaper state.
#[derive(Debug, Clone, Default)]
pub struct WaveShaper {
    curve: Option<Vec<f32>>,
    oversample: OverSample,
    prev_input: f32,
}

impl WaveShaper {
    /// Creates a passthrough shaper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transfer curve, if any.
    pub fn curve(&self) -> Option<&[f32]> {
        self.curve.as_deref()
    }

    /// Replaces the transfer curve. `None` restores passthrough.
    pub fn set_curve(&mut self, curve: Option<Vec<f32>>) {
        self.curve = curve.filter(|c| !c.is_empty());
    }

    /// Returns the oversampling mode.
    pub fn oversample(&self) -> OverSample {
        self.oversample
    }

    /// Sets the oversampling mode.
    pub fn set_oversample(&mut self, oversample: OverSample) {
        self.oversample = oversample;
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let Some(curve) = &self.curve else {
            self.prev_input = input;
            return input;
        };

        let factor = self.oversample.factor();
        let output = if factor == 1 {
            lookup(curve, input)
        } else {
            let step = 1.0 / factor as f32;
            let mut acc = 0.0;
            for k in 1..=factor {
                let t = k as f32 * step;
                let x = self.prev_input + (input - self.prev_input) * t;
                acc += lookup(curve, x);
            }
            acc * step
        };

        self.prev_input = input;
        output
    }
}

/// Maps `x` through `curve` with linear interpolation.
#[inline]
fn lookup(curve: &[f32], x: f32) -> f32 {
    let last = curve.len() - 1;
    if last == 0 {
        return curve[0];
    }
    let v = (last as f32) * (x + 1.0) * 0.5;
    if v <= 0.0 {
        return curve[0];
    }
    if v >= last as f32 {
        return curve[last];
    }
    let k = v as usize;
    let f = v - k as f32;
    curve[k] + (curve[k + 1] - curve[k]) * f
}

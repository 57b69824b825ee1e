//! Feed-forward dynamics compression.
//!
//! Signal flow: detect the instantaneous level in dB, run it through a
//! soft-knee gain computer, smooth the resulting gain reduction with separate
//! attack and release times, then apply it. Threshold, knee, ratio, attack
//! and release arrive per sample from the node's parameters, so they can be
//! automated like any other parameter.

use libm::expf;

use crate::math::{db_to_linear, linear_to_db};

/// Static compression curve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GainComputer {
    pub threshold_db: f32,
    pub ratio: f32,
    pub knee_db: f32,
}

impl GainComputer {
    /// Returns the gain change in dB (always <= 0) for an input level.
    #[inline]
    pub fn compute_gain_db(&self, input_db: f32) -> f32 {
        let ratio = self.ratio.max(1.0);
        let overshoot = input_db - self.threshold_db;
        let half_knee = self.knee_db / 2.0;

        let slope = 1.0 - 1.0 / ratio;

        if overshoot <= -half_knee {
            0.0
        } else if overshoot >= half_knee || self.knee_db <= 0.0 {
            -(overshoot * slope)
        } else {
            // quadratic blend between the two straight segments
            let into_knee = overshoot + half_knee;
            -(slope * into_knee * into_knee / (2.0 * self.knee_db))
        }
    }
}

/// Per-sample control values for [`DynamicsCompressor::process`].
#[derive(Debug, Clone, Copy)]
pub struct CompressorControls {
    /// Threshold in dB.
    pub threshold_db: f32,
    /// Knee width in dB.
    pub knee_db: f32,
    /// Ratio (values below 1 act as 1).
    pub ratio: f32,
    /// Attack time in seconds.
    pub attack_secs: f32,
    /// Release time in seconds.
    pub release_secs: f32,
}

/// Compressor state: the smoothed gain reduction.
#[derive(Debug, Clone, Default)]
pub struct DynamicsCompressor {
    reduction_db: f32,
}

impl DynamicsCompressor {
    /// Creates a compressor applying no reduction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current gain reduction in dB (0 or negative).
    pub fn reduction(&self) -> f32 {
        self.reduction_db
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32, controls: CompressorControls, sample_rate: f32) -> f32 {
        let computer = GainComputer {
            threshold_db: controls.threshold_db,
            ratio: controls.ratio,
            knee_db: controls.knee_db,
        };
        let target = computer.compute_gain_db(linear_to_db(input.abs()));

        // more reduction = attack, less = release
        let time = if target < self.reduction_db {
            controls.attack_secs
        } else {
            controls.release_secs
        };
        let coeff = smoothing_coeff(time, sample_rate);
        self.reduction_db = target + coeff * (self.reduction_db - target);

        input * db_to_linear(self.reduction_db)
    }

    /// Clears the smoothed reduction.
    pub fn reset(&mut self) {
        self.reduction_db = 0.0;
    }
}

/// One-pole coefficient for a time constant; zero time is instant.
#[inline]
fn smoothing_coeff(time_secs: f32, sample_rate: f32) -> f32 {
    if time_secs <= 0.0 {
        0.0
    } else {
        expf(-1.0 / (time_secs * sample_rate))
    }
}

//! Decoded audio held in memory.

use std::sync::Arc;

/// Length of the fade applied when a buffer is truncated.
const TRUNCATE_FADE_SECS: f32 = 0.005;

/// A mono buffer of decoded samples at a known sample rate.
///
/// Sample data is shared behind an [`Arc`], so cloning a buffer (for example
/// to hand the same impulse response to several convolvers) is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    sample_rate: f32,
}

impl AudioBuffer {
    /// Creates a buffer from samples and their sample rate.
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Returns the samples.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate
    }

    /// Returns a copy converted to `sample_rate` by linear interpolation.
    ///
    /// Returns a cheap clone when the rates already match.
    pub fn resampled(&self, sample_rate: f32) -> Self {
        if sample_rate == self.sample_rate || self.samples.is_empty() || self.sample_rate <= 0.0 {
            return Self {
                samples: Arc::clone(&self.samples),
                sample_rate,
            };
        }

        let ratio = self.sample_rate as f64 / sample_rate as f64;
        let out_len = ((self.samples.len() as f64) / ratio).round().max(1.0) as usize;
        let last = self.samples.len() - 1;
        let out: Vec<f32> = (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = (pos as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = (pos - idx as f64) as f32;
                let a = self.samples[idx];
                a + (self.samples[next] - a) * frac
            })
            .collect();

        Self::new(out, sample_rate)
    }

    /// Returns a copy no longer than `max_secs`, with a short fade-out at
    /// the cut to avoid a click.
    ///
    /// Non-positive durations and buffers already short enough come back
    /// unchanged.
    pub fn truncated(&self, max_secs: f32) -> Self {
        let max_len = (max_secs * self.sample_rate) as usize;
        if max_secs <= 0.0 || max_len >= self.samples.len() {
            return self.clone();
        }

        let mut out = self.samples[..max_len].to_vec();
        let fade_len = ((TRUNCATE_FADE_SECS * self.sample_rate) as usize).min(max_len);
        let fade_start = max_len - fade_len;
        for (i, s) in out[fade_start..].iter_mut().enumerate() {
            *s *= 1.0 - (i + 1) as f32 / fade_len as f32;
        }

        Self::new(out, self.sample_rate)
    }
}

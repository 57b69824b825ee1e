//! Delay line used by delay nodes.
//!
//! A circular buffer read with linear interpolation so delay time can be
//! automated smoothly. Delay nodes are the only place the graph may loop back
//! on itself: the renderer reads every delay line at the start of a frame and
//! writes it at the end, so a delay of at least one sample separates each
//! trip around a feedback cycle.

/// Interpolated delay line using a circular buffer.
///
/// # Example
///
/// ```rust
/// use patchcord_core::DelayLine;
///
/// let mut delay = DelayLine::new(16);
/// delay.write(1.0);
/// assert_eq!(delay.read(1.0), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Creates a delay line holding up to `max_delay_samples` samples.
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(1) + 1],
            write_pos: 0,
        }
    }

    /// Creates a delay line from sample rate and max delay time in seconds.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::new(libm::ceilf(sample_rate * max_seconds) as usize)
    }

    /// Reads the sample written `delay_samples` writes ago.
    ///
    /// `read(1.0)` returns the most recent write. Delays are clamped to
    /// `1..=capacity()`.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(1.0, (len - 1) as f32);

        let delay_int = delay as usize;
        let frac = delay - delay_int as f32;

        let read_pos = (self.write_pos + len - delay_int) % len;
        let older_pos = (read_pos + len - 1) % len;
        let a = self.buffer[read_pos];
        let b = self.buffer[older_pos];
        a + (b - a) * frac
    }

    /// Writes a sample and advances the write position.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Clears the delay line.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Returns the maximum delay in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_delay() {
        let mut delay = DelayLine::new(10);
        for i in 1..=5 {
            delay.write(i as f32);
        }
        assert_eq!(delay.read(1.0), 5.0);
        assert_eq!(delay.read(3.0), 3.0);
        assert_eq!(delay.read(5.0), 1.0);
    }

    #[test]
    fn test_fractional_delay_interpolates() {
        let mut delay = DelayLine::new(10);
        delay.write(0.0);
        delay.write(1.0);
        let mid = delay.read(1.5);
        assert!((mid - 0.5).abs() < 1e-6, "got {mid}");
    }

    #[test]
    fn test_delay_clamped_to_range() {
        let mut delay = DelayLine::new(4);
        for i in 1..=8 {
            delay.write(i as f32);
        }
        // below one sample reads the latest write
        assert_eq!(delay.read(0.0), 8.0);
        // beyond capacity reads the oldest retained sample
        assert_eq!(delay.read(100.0), 5.0);
        assert_eq!(delay.capacity(), 4);
    }

    #[test]
    fn test_wraparound() {
        let mut delay = DelayLine::new(3);
        for i in 0..100 {
            delay.write(i as f32);
        }
        assert_eq!(delay.read(2.0), 98.0);
    }

    #[test]
    fn test_clear() {
        let mut delay = DelayLine::new(4);
        delay.write(1.0);
        delay.clear();
        assert_eq!(delay.read(1.0), 0.0);
    }

    #[test]
    fn test_from_time() {
        let delay = DelayLine::from_time(48000.0, 0.5);
        assert_eq!(delay.capacity(), 24000);
    }
}

//! Uniformly partitioned convolution against an impulse response.
//!
//! The response is cut into partitions of [`BLOCK`] taps. The first partition
//! runs in direct form, so output has no latency. Every later partition is
//! applied in the frequency domain with overlap-save: once a block of input
//! is complete its spectrum enters a frequency-domain delay line, and the
//! products of each partition spectrum with the matching delayed input
//! spectrum give the tail for the next block.
//!
//! ```text
//! ir:     [ P0 | P1 | P2 | ... | Pk ]
//! out[n] = direct(P0, x)[n] + IFFT( Σ Pi · X[m - i + 1] )[n mod BLOCK]
//! ```
//!
//! Cost per sample is `BLOCK` multiply-adds plus an amortized
//! `O(partitions + log BLOCK)` share of one FFT pair per block.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::buffer::AudioBuffer;

/// Partition size in samples.
pub const BLOCK: usize = 128;

const ZERO: Complex<f32> = Complex { re: 0.0, im: 0.0 };

/// Convolution of the input with an [`AudioBuffer`].
///
/// Outputs silence until a buffer is assigned. The response is applied as
/// given, without normalization.
#[derive(Debug, Clone, Default)]
pub struct Convolver {
    buffer: Option<AudioBuffer>,
    history: Vec<f32>,
    pos: usize,
    tail: Option<PartitionedTail>,
}

impl Convolver {
    /// Creates a convolver with no impulse response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the impulse response, if one is assigned.
    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.buffer.as_ref()
    }

    /// Assigns the impulse response and clears the input history.
    pub fn set_buffer(&mut self, buffer: AudioBuffer) {
        let taps = buffer.samples();
        self.history = vec![0.0; taps.len().clamp(1, BLOCK)];
        self.pos = 0;
        self.tail = PartitionedTail::new(taps);
        self.buffer = Some(buffer);
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let Some(ir) = &self.buffer else {
            return 0.0;
        };
        let len = self.history.len();
        self.history[self.pos] = input;

        // history[pos - k] pairs with ir[k]
        let head = &ir.samples()[..ir.len().min(BLOCK)];
        let mut acc = 0.0;
        let mut idx = self.pos;
        for &h in head {
            acc += h * self.history[idx];
            idx = if idx == 0 { len - 1 } else { idx - 1 };
        }
        self.pos = (self.pos + 1) % len;

        match &mut self.tail {
            Some(tail) => acc + tail.process(input),
            None => acc,
        }
    }

    /// Clears the input history.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.pos = 0;
        if let Some(tail) = &mut self.tail {
            tail.reset();
        }
    }
}

/// Frequency-domain part of the convolution: every partition after the first.
#[derive(Clone)]
struct PartitionedTail {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    /// Spectra of partitions 1.. of the response.
    partitions: Vec<Vec<Complex<f32>>>,
    /// Spectra of recent input blocks; `newest` is the last completed one.
    delay_line: Vec<Vec<Complex<f32>>>,
    newest: usize,
    /// Previous block followed by the block being filled.
    input: Vec<f32>,
    /// Tail samples for the block being filled.
    output: Vec<f32>,
    fill: usize,
    work: Vec<Complex<f32>>,
    acc: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl PartitionedTail {
    /// Returns `None` when the response fits in the direct-form head.
    fn new(taps: &[f32]) -> Option<Self> {
        if taps.len() <= BLOCK {
            return None;
        }
        let size = 2 * BLOCK;
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        let mut scratch = vec![ZERO; scratch_len];

        let partitions: Vec<Vec<Complex<f32>>> = taps[BLOCK..]
            .chunks(BLOCK)
            .map(|chunk| {
                let mut spectrum = vec![ZERO; size];
                for (bin, &h) in spectrum.iter_mut().zip(chunk) {
                    *bin = Complex::new(h, 0.0);
                }
                forward.process_with_scratch(&mut spectrum, &mut scratch);
                spectrum
            })
            .collect();
        let count = partitions.len();

        #[cfg(feature = "tracing")]
        tracing::debug!(taps = taps.len(), partitions = count, "partitioned convolver");

        Some(Self {
            forward,
            inverse,
            partitions,
            delay_line: vec![vec![ZERO; size]; count],
            newest: 0,
            input: vec![0.0; size],
            output: vec![0.0; BLOCK],
            fill: 0,
            work: vec![ZERO; size],
            acc: vec![ZERO; size],
            scratch,
        })
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let out = self.output[self.fill];
        self.input[BLOCK + self.fill] = input;
        self.fill += 1;
        if self.fill == BLOCK {
            self.advance();
        }
        out
    }

    /// Pushes the completed block into the delay line and computes the tail
    /// for the next one.
    fn advance(&mut self) {
        self.fill = 0;

        for (bin, &x) in self.work.iter_mut().zip(&self.input) {
            *bin = Complex::new(x, 0.0);
        }
        self.forward.process_with_scratch(&mut self.work, &mut self.scratch);
        let count = self.delay_line.len();
        self.newest = (self.newest + 1) % count;
        self.delay_line[self.newest].copy_from_slice(&self.work);
        self.input.copy_within(BLOCK.., 0);

        // partition i + 1 meets the input block i blocks before the newest
        self.acc.fill(ZERO);
        for (i, partition) in self.partitions.iter().enumerate() {
            let spectrum = &self.delay_line[(self.newest + count - i) % count];
            for ((acc, &h), &x) in self.acc.iter_mut().zip(partition).zip(spectrum) {
                *acc += h * x;
            }
        }
        self.inverse.process_with_scratch(&mut self.acc, &mut self.scratch);

        // overlap-save: the second half is the valid linear part
        let scale = 1.0 / (2 * BLOCK) as f32;
        for (out, bin) in self.output.iter_mut().zip(&self.acc[BLOCK..]) {
            *out = bin.re * scale;
        }
    }

    fn reset(&mut self) {
        for spectrum in &mut self.delay_line {
            spectrum.fill(ZERO);
        }
        self.newest = 0;
        self.input.fill(0.0);
        self.output.fill(0.0);
        self.fill = 0;
    }
}

impl std::fmt::Debug for PartitionedTail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedTail")
            .field("partitions", &self.partitions.len())
            .field("fill", &self.fill)
            .finish_non_exhaustive()
    }
}

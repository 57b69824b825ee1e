//! Mathematical utility functions for DSP.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//!
//! # Pitch
//!
//! - [`transpose`] - Equal-tempered transposition by semitones
//! - [`midi_to_freq`] - MIDI note number to frequency (A4 = 440 Hz)
//! - [`cents_to_ratio`] - Detune in cents to a frequency ratio

use libm::{expf, log10f, powf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use patchcord_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Values at or below 1e-10 are floored to -200 dB instead of `-inf`.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 1e-10 {
        return -200.0;
    }
    20.0 * log10f(linear)
}

/// Transpose a frequency by a number of equal-tempered semitones.
///
/// `f * 2^(semitones / 12)`: twelve semitones double the frequency.
///
/// ```rust
/// use patchcord_core::transpose;
///
/// assert_eq!(transpose(440.0, 12.0), 880.0);
/// assert_eq!(transpose(440.0, 0.0), 440.0);
/// ```
#[inline]
pub fn transpose(freq: f32, semitones: f32) -> f32 {
    freq * powf(2.0, semitones / 12.0)
}

/// Convert a MIDI note number to frequency in Hz (note 69 = A4 = 440 Hz).
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    transpose(440.0, note - 69.0)
}

/// Convert a detune amount in cents to a frequency ratio.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}

/// Flush denormal values to zero.
///
/// Feedback paths (delay loops, IIR state) decay toward zero forever; values
/// below ~1e-20 are inaudible and slow on some CPUs.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

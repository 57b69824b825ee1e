//! Biquad (bi-quadratic) filter structure.
//!
//! Provides a second-order IIR filter configured for the eight response
//! types a filter node exposes (see [`FilterType`]).
//!
//! Coefficient calculation uses the RBJ Audio EQ Cookbook formulas.

use core::f32::consts::PI;
use core::fmt;
use core::str::FromStr;

use libm::{cosf, powf, sinf, sqrtf};
use serde::{Deserialize, Serialize};

/// Unnormalized biquad coefficients: `(b0, b1, b2, a0, a1, a2)`.
pub type Coefficients = (f32, f32, f32, f32, f32, f32);

/// Generic biquad filter coefficients and state.
///
/// Implements the Direct Form I biquad structure:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a new biquad with passthrough coefficients.
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Sets the biquad coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, (b0, b1, b2, a0, a1, a2): Coefficients) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Processes a single sample through the filter.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = crate::math::flush_denormal(output);

        output
    }

    /// Clears the filter state without changing coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// Response type of a filter node.
///
/// | Type | `Q` | `gain` |
/// |------|-----|--------|
/// | lowpass / highpass | resonance | unused |
/// | bandpass / notch / allpass | bandwidth | unused |
/// | lowshelf / highshelf | unused | boost/cut in dB |
/// | peaking | bandwidth | boost/cut in dB |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Passes everything below the cutoff.
    #[default]
    Lowpass,
    /// Passes everything above the cutoff.
    Highpass,
    /// Passes a band around the center frequency.
    Bandpass,
    /// Boosts or cuts below the cutoff.
    Lowshelf,
    /// Boosts or cuts above the cutoff.
    Highshelf,
    /// Boosts or cuts a band around the center frequency.
    Peaking,
    /// Removes a band around the center frequency.
    Notch,
    /// Passes all frequencies, shifting phase around the center frequency.
    Allpass,
}

impl FilterType {
    /// All filter types in declaration order.
    pub const ALL: [FilterType; 8] = [
        Self::Lowpass,
        Self::Highpass,
        Self::Bandpass,
        Self::Lowshelf,
        Self::Highshelf,
        Self::Peaking,
        Self::Notch,
        Self::Allpass,
    ];

    /// Returns the lowercase name of the filter type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Lowshelf => "lowshelf",
            Self::Highshelf => "highshelf",
            Self::Peaking => "peaking",
            Self::Notch => "notch",
            Self::Allpass => "allpass",
        }
    }

    /// Computes coefficients for this response type.
    pub fn coefficients(self, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
        let q = q.max(1e-4);
        match self {
            Self::Lowpass => lowpass_coefficients(frequency, q, sample_rate),
            Self::Highpass => highpass_coefficients(frequency, q, sample_rate),
            Self::Bandpass => bandpass_coefficients(frequency, q, sample_rate),
            Self::Lowshelf => lowshelf_coefficients(frequency, gain_db, sample_rate),
            Self::Highshelf => highshelf_coefficients(frequency, gain_db, sample_rate),
            Self::Peaking => peaking_eq_coefficients(frequency, q, gain_db, sample_rate),
            Self::Notch => notch_coefficients(frequency, q, sample_rate),
            Self::Allpass => allpass_coefficients(frequency, q, sample_rate),
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown filter type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter type: {0}")]
pub struct UnknownFilterType(pub String);

impl FromStr for FilterType {
    type Err = UnknownFilterType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFilterType(s.to_string()))
    }
}

#[inline]
fn omega_terms(frequency: f32, sample_rate: f32) -> (f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    (cosf(omega), sinf(omega))
}

/// Low-pass coefficients.
pub fn lowpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / (2.0 * q);

    let b0 = (1.0 - cos_omega) / 2.0;
    let b1 = 1.0 - cos_omega;
    let b2 = (1.0 - cos_omega) / 2.0;
    (b0, b1, b2, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// High-pass coefficients.
pub fn highpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / (2.0 * q);

    let b0 = (1.0 + cos_omega) / 2.0;
    let b1 = -(1.0 + cos_omega);
    let b2 = (1.0 + cos_omega) / 2.0;
    (b0, b1, b2, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// Band-pass coefficients (constant 0 dB peak gain).
pub fn bandpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / (2.0 * q);

    (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// Notch (band-reject) coefficients.
pub fn notch_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / (2.0 * q);

    (1.0, -2.0 * cos_omega, 1.0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// All-pass coefficients.
pub fn allpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / (2.0 * q);

    let b0 = 1.0 - alpha;
    let b1 = -2.0 * cos_omega;
    let b2 = 1.0 + alpha;
    (b0, b1, b2, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// Peaking EQ coefficients: boost or cut around a center frequency.
pub fn peaking_eq_coefficients(frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / (2.0 * q);

    (
        1.0 + alpha * a,
        -2.0 * cos_omega,
        1.0 - alpha * a,
        1.0 + alpha / a,
        -2.0 * cos_omega,
        1.0 - alpha / a,
    )
}

/// Low-shelf coefficients with shelf slope S = 1.
pub fn lowshelf_coefficients(frequency: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / 2.0 * core::f32::consts::SQRT_2;
    let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;

    (
        a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
        2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
        a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
        (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
        -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
        (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
    )
}

/// High-shelf coefficients with shelf slope S = 1.
pub fn highshelf_coefficients(frequency: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_omega, sin_omega) = omega_terms(frequency, sample_rate);
    let alpha = sin_omega / 2.0 * core::f32::consts::SQRT_2;
    let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;

    (
        a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
        -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
        a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
        (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
        2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
        (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
    )
}

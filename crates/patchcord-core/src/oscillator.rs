//! Periodic oscillator and start/stop scheduling shared by source nodes.

use core::f32::consts::TAU;
use core::fmt;
use core::str::FromStr;

use libm::sinf;
use serde::{Deserialize, Serialize};

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    /// Pure sine.
    #[default]
    Sine,
    /// Bipolar square.
    Square,
    /// Rising ramp from -1 to 1.
    Sawtooth,
    /// Triangle.
    Triangle,
}

impl Waveform {
    /// Returns the lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
            Self::Triangle => "triangle",
        }
    }

    /// Evaluates the waveform at `phase` in turns (`0.0..1.0`).
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Self::Sine => sinf(TAU * phase),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sawtooth => 2.0 * phase - 1.0,
            Self::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown waveform name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown waveform: {0}")]
pub struct UnknownWaveform(pub String);

impl FromStr for Waveform {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Sine, Self::Square, Self::Sawtooth, Self::Triangle]
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| UnknownWaveform(s.to_string()))
    }
}

/// Start/stop window of a source node.
///
/// A source is silent until started and silent again from its stop time on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Playback {
    start: Option<f64>,
    stop: Option<f64>,
}

impl Playback {
    /// Returns the scheduled start time.
    pub fn start_time(&self) -> Option<f64> {
        self.start
    }

    /// Returns the scheduled stop time.
    pub fn stop_time(&self) -> Option<f64> {
        self.stop
    }

    /// Returns `true` once a start has been scheduled.
    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    pub(crate) fn set_start(&mut self, when: f64) {
        self.start = Some(when);
    }

    pub(crate) fn set_stop(&mut self, when: f64) {
        self.stop = Some(when);
    }

    /// Returns `true` if the source sounds at `time`.
    #[inline]
    pub fn is_playing(&self, time: f64) -> bool {
        match self.start {
            Some(start) if time >= start => self.stop.is_none_or(|stop| time < stop),
            _ => false,
        }
    }
}

/// Phase-accumulating oscillator.
#[derive(Debug, Clone, Default)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
    playback: Playback,
}

impl Oscillator {
    /// Creates an unstarted sine oscillator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Sets the waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Returns the start/stop window.
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub(crate) fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }

    /// Renders one sample at `time` for an effective frequency in Hz.
    #[inline]
    pub fn process(&mut self, frequency: f32, time: f64, sample_rate: f32) -> f32 {
        if !self.playback.is_playing(time) {
            return 0.0;
        }
        let out = self.waveform.sample(self.phase);
        self.phase += frequency / sample_rate;
        self.phase -= libm::floorf(self.phase);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_shapes() {
        assert_eq!(Waveform::Sine.sample(0.0), 0.0);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-6);
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.6), -1.0);
        assert_eq!(Waveform::Sawtooth.sample(0.0), -1.0);
        assert_eq!(Waveform::Triangle.sample(0.25), 1.0);
        assert_eq!(Waveform::Triangle.sample(0.75), -1.0);
    }

    #[test]
    fn test_silent_until_started() {
        let mut osc = Oscillator::new();
        osc.set_waveform(Waveform::Square);
        assert_eq!(osc.process(440.0, 0.0, 48000.0), 0.0);
        osc.playback_mut().set_start(0.0);
        assert_eq!(osc.process(440.0, 0.0, 48000.0), 1.0);
    }

    #[test]
    fn test_playback_window() {
        let mut playback = Playback::default();
        playback.set_start(1.0);
        playback.set_stop(2.0);
        assert!(!playback.is_playing(0.5));
        assert!(playback.is_playing(1.0));
        assert!(playback.is_playing(1.999));
        assert!(!playback.is_playing(2.0));
    }

    #[test]
    fn test_phase_wraps() {
        let mut osc = Oscillator::new();
        osc.playback_mut().set_start(0.0);
        for i in 0..10_000 {
            let s = osc.process(1000.0, i as f64 / 48000.0, 48000.0);
            assert!(s.abs() <= 1.0);
        }
        assert!(osc.phase >= 0.0 && osc.phase < 1.0);
    }

    #[test]
    fn test_waveform_parse() {
        assert_eq!("sawtooth".parse::<Waveform>(), Ok(Waveform::Sawtooth));
        assert!("noise".parse::<Waveform>().is_err());
    }
}

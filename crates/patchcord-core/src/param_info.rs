//! Descriptors for effect parameters.
//!
//! A [`ParamDescriptor`] documents one parameter an effect exposes: display
//! names, the settings key it is stored under, its unit, and its conventional
//! range. Effects publish their descriptors as a `&'static` slice so
//! configuration tooling can validate values and fill in defaults without
//! constructing the effect.
//!
//! Ranges are conventional, not enforced. Effects accept out-of-range values
//! and the host clamps them to each node's nominal range at render time.
//!
//! ```rust
//! use patchcord_core::{ParamDescriptor, ParamUnit};
//!
//! const Q: ParamDescriptor =
//!     ParamDescriptor::new("Q", "q", ParamUnit::None, 0.0001, 1000.0, 1.0).with_step(0.01);
//! assert!(Q.contains(10.0));
//! assert!(!Q.contains(0.0));
//! assert_eq!(Q.clamp(5000.0), 1000.0);
//! assert_eq!(Q.format_value(2.5), "2.50");
//!
//! // coarse steps format as whole numbers
//! const FREQ: ParamDescriptor =
//!     ParamDescriptor::new("Frequency", "freq", ParamUnit::Hertz, 0.0, 20000.0, 440.0);
//! assert_eq!(FREQ.format_value(440.0), "440 Hz");
//! ```

/// Unit of a parameter value, used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamUnit {
    /// Decibels (dB).
    Decibels,
    /// Hertz (Hz).
    Hertz,
    /// Seconds (s).
    Seconds,
    /// Semitones (st).
    Semitones,
    /// Ratio (n:1).
    Ratio,
    /// Linear gain or fraction with no unit suffix.
    #[default]
    None,
}

impl ParamUnit {
    /// Returns the unit suffix string for display.
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Decibels => " dB",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Seconds => " s",
            ParamUnit::Semitones => " st",
            ParamUnit::Ratio => ":1",
            ParamUnit::None => "",
        }
    }
}

/// Metadata for one effect parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Full parameter name for display (e.g., "Delay Time").
    pub name: &'static str,

    /// Short name, max 8 characters (e.g., "Time").
    pub short_name: &'static str,

    /// Settings key the value is stored under (e.g., `"delay_time"`).
    pub key: &'static str,

    /// Unit type for formatting the value.
    pub unit: ParamUnit,

    /// Conventional minimum.
    pub min: f32,

    /// Conventional maximum.
    pub max: f32,

    /// Value used when the configuration omits the parameter.
    pub default: f32,

    /// Suggested increment for stepped controls.
    pub step: f32,
}

impl ParamDescriptor {
    /// Creates a descriptor whose short name equals its name and whose step
    /// is 1% of the range.
    pub const fn new(
        name: &'static str,
        key: &'static str,
        unit: ParamUnit,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name: name,
            key,
            unit,
            min,
            max,
            default,
            step: (max - min) / 100.0,
        }
    }

    /// Level parameter (0–1, default 0.5) shared by every effect.
    pub const fn level() -> Self {
        Self::new("Level", "level", ParamUnit::None, 0.0, 1.0, 0.5).with_step(0.01)
    }

    /// Time parameter in seconds.
    pub const fn time_secs(
        name: &'static str,
        key: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self::new(name, key, ParamUnit::Seconds, min, max, default).with_step(0.001)
    }

    /// Gain or threshold parameter in decibels.
    pub const fn gain_db(
        name: &'static str,
        key: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self::new(name, key, ParamUnit::Decibels, min, max, default).with_step(0.5)
    }

    /// Sets the short display name.
    pub const fn with_short_name(mut self, short_name: &'static str) -> Self {
        self.short_name = short_name;
        self
    }

    /// Sets the step increment.
    pub const fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    /// Returns `true` if `value` lies within the conventional range.
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamps a value to the conventional range.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Formats a value with its unit suffix.
    pub fn format_value(&self, value: f32) -> String {
        let precision = if self.step >= 1.0 { 0 } else { 2 };
        format!("{value:.precision$}{}", self.unit.suffix())
    }
}

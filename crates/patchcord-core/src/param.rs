//! Automatable node parameters.
//!
//! Every numeric control on a node (gain, cutoff, delay time, ...) is an
//! [`AudioParam`]: an intrinsic value plus a timeline of scheduled
//! [`AutomationEvent`]s evaluated against the context clock.
//!
//! ## Timeline semantics
//!
//! - `SetValue` jumps to a value at a time.
//! - `LinearRamp` / `ExponentialRamp` run from the previous event's time and
//!   value to their own. With no previous event they start at time 0 from the
//!   intrinsic value.
//! - `SetTarget` approaches a target exponentially from its start time with a
//!   time constant, and stays active until the next non-ramp event. A ramp
//!   scheduled right after it starts from the target event's start value.
//!
//! The computed value is clamped to the nominal range; the intrinsic value and
//! scheduled values are stored as given.
//!
//! ```rust
//! use patchcord_core::AudioParam;
//!
//! let mut gain = AudioParam::new(1.0, 0.0, 10.0);
//! gain.set_value_at_time(0.0, 1.0).unwrap();
//! gain.linear_ramp_to_value_at_time(1.0, 2.0).unwrap();
//! assert_eq!(gain.value_at(0.5), 1.0);
//! assert_eq!(gain.value_at(1.5), 0.5);
//! assert_eq!(gain.value_at(3.0), 1.0);
//! ```

use core::fmt;

use libm::{exp, pow};
use thiserror::Error;

/// Names of the automatable parameters exposed by host nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    /// Linear gain (gain node) or boost in dB (shelf and peaking filters).
    Gain,
    /// Frequency in Hz.
    Frequency,
    /// Detune in cents.
    Detune,
    /// Filter quality factor.
    Q,
    /// Delay time in seconds.
    DelayTime,
    /// Compressor threshold in dB.
    Threshold,
    /// Compressor knee width in dB.
    Knee,
    /// Compressor ratio (n:1).
    Ratio,
    /// Compressor attack time in seconds.
    Attack,
    /// Compressor release time in seconds.
    Release,
    /// Constant source output value.
    Offset,
}

impl ParamName {
    /// Returns the host-facing name of the parameter.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gain => "gain",
            Self::Frequency => "frequency",
            Self::Detune => "detune",
            Self::Q => "Q",
            Self::DelayTime => "delayTime",
            Self::Threshold => "threshold",
            Self::Knee => "knee",
            Self::Ratio => "ratio",
            Self::Attack => "attack",
            Self::Release => "release",
            Self::Offset => "offset",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when scheduling automation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AutomationError {
    /// A value or time was NaN or infinite.
    #[error("automation value {0} is not finite")]
    NonFinite(f64),
    /// Event times must not be negative.
    #[error("automation time {0} is negative")]
    NegativeTime(f64),
    /// `set_target_at_time` time constants must not be negative.
    #[error("time constant {0} is negative")]
    NegativeTimeConstant(f32),
    /// Exponential ramps cannot reach zero.
    #[error("exponential ramp target must be non-zero")]
    ZeroExponentialTarget,
}

/// A scheduled change on an [`AudioParam`] timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue {
        /// Value after the jump.
        value: f32,
        /// Time in seconds.
        time: f64,
    },
    /// Linear ramp from the previous event, arriving at `value` at `time`.
    LinearRamp {
        /// Value at the end of the ramp.
        value: f32,
        /// End time in seconds.
        time: f64,
    },
    /// Exponential ramp from the previous event, arriving at `value` at `time`.
    ExponentialRamp {
        /// Value at the end of the ramp (non-zero).
        value: f32,
        /// End time in seconds.
        time: f64,
    },
    /// Exponential approach toward `target` starting at `time`.
    SetTarget {
        /// Value being approached.
        target: f32,
        /// Start time in seconds.
        time: f64,
        /// Time constant in seconds; 0 jumps straight to the target.
        time_constant: f32,
    },
}

impl AutomationEvent {
    /// Returns the time at which the event is anchored.
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. }
            | Self::LinearRamp { time, .. }
            | Self::ExponentialRamp { time, .. }
            | Self::SetTarget { time, .. } => time,
        }
    }
}

/// An automatable parameter with a nominal range.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    value: f32,
    default: f32,
    min: f32,
    max: f32,
    events: Vec<AutomationEvent>,
}

impl AudioParam {
    /// Creates a parameter with a default value and nominal range.
    pub fn new(default: f32, min: f32, max: f32) -> Self {
        Self {
            value: default,
            default,
            min,
            max,
            events: Vec::new(),
        }
    }

    /// Returns the intrinsic value last assigned with [`set_value`](Self::set_value).
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Assigns the intrinsic value.
    ///
    /// Out-of-range values are stored as given and clamped only when the
    /// parameter is evaluated.
    pub fn set_value(&mut self, value: f32) -> Result<(), AutomationError> {
        check_finite(value as f64)?;
        self.value = value;
        Ok(())
    }

    /// Returns the default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Returns the nominal minimum.
    pub fn min_value(&self) -> f32 {
        self.min
    }

    /// Returns the nominal maximum.
    pub fn max_value(&self) -> f32 {
        self.max
    }

    /// Returns the scheduled events in time order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Returns `true` if any automation is scheduled.
    pub fn has_automation(&self) -> bool {
        !self.events.is_empty()
    }

    /// Schedules a jump to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<(), AutomationError> {
        check_finite(value as f64)?;
        check_time(time)?;
        self.insert(AutomationEvent::SetValue { value, time });
        Ok(())
    }

    /// Schedules a linear ramp ending at `value` at `end_time`.
    pub fn linear_ramp_to_value_at_time(
        &mut self,
        value: f32,
        end_time: f64,
    ) -> Result<(), AutomationError> {
        check_finite(value as f64)?;
        check_time(end_time)?;
        self.insert(AutomationEvent::LinearRamp {
            value,
            time: end_time,
        });
        Ok(())
    }

    /// Schedules an exponential ramp ending at `value` at `end_time`.
    ///
    /// `value` must be non-zero.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f32,
        end_time: f64,
    ) -> Result<(), AutomationError> {
        check_finite(value as f64)?;
        check_time(end_time)?;
        if value == 0.0 {
            return Err(AutomationError::ZeroExponentialTarget);
        }
        self.insert(AutomationEvent::ExponentialRamp {
            value,
            time: end_time,
        });
        Ok(())
    }

    /// Schedules an exponential approach toward `target` from `start_time`.
    pub fn set_target_at_time(
        &mut self,
        target: f32,
        start_time: f64,
        time_constant: f32,
    ) -> Result<(), AutomationError> {
        check_finite(target as f64)?;
        check_time(start_time)?;
        check_finite(time_constant as f64)?;
        if time_constant < 0.0 {
            return Err(AutomationError::NegativeTimeConstant(time_constant));
        }
        self.insert(AutomationEvent::SetTarget {
            target,
            time: start_time,
            time_constant,
        });
        Ok(())
    }

    /// Removes every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) -> Result<(), AutomationError> {
        check_time(time)?;
        self.events.retain(|e| e.time() < time);
        Ok(())
    }

    /// Removes every event at or after `time` and holds the value the
    /// timeline had at `time`.
    ///
    /// A ramp that was in progress at `time` is shortened to end there.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) -> Result<(), AutomationError> {
        check_time(time)?;
        let held = self.raw_value_at(time);
        let cut = self
            .events
            .iter()
            .position(|e| e.time() >= time)
            .unwrap_or(self.events.len());

        let hold = match self.events.get(cut) {
            Some(AutomationEvent::LinearRamp { .. }) => AutomationEvent::LinearRamp {
                value: held,
                time,
            },
            Some(AutomationEvent::ExponentialRamp { .. }) if held != 0.0 => {
                AutomationEvent::ExponentialRamp { value: held, time }
            }
            _ => AutomationEvent::SetValue { value: held, time },
        };
        self.events.truncate(cut);
        self.events.push(hold);
        Ok(())
    }

    /// Computes the parameter value at `time`, clamped to the nominal range.
    pub fn value_at(&self, time: f64) -> f32 {
        self.raw_value_at(time).clamp(self.min, self.max)
    }

    /// Evaluates the timeline without clamping.
    fn raw_value_at(&self, time: f64) -> f32 {
        // (value, time) the next segment starts from
        let mut v0 = self.value;
        let mut t0 = 0.0_f64;
        // active SetTarget: (target, time constant), anchored at (v0, t0)
        let mut target: Option<(f32, f32)> = None;

        for event in &self.events {
            match *event {
                AutomationEvent::SetValue { value, time: at } => {
                    if time < at {
                        return settle(v0, t0, target, time);
                    }
                    v0 = value;
                    t0 = at;
                    target = None;
                }
                AutomationEvent::LinearRamp { value, time: end } => {
                    target = None;
                    if time < end {
                        let span = end - t0;
                        if span <= 0.0 {
                            return value;
                        }
                        let frac = ((time - t0) / span) as f32;
                        return v0 + (value - v0) * frac;
                    }
                    v0 = value;
                    t0 = end;
                }
                AutomationEvent::ExponentialRamp { value, time: end } => {
                    target = None;
                    if time < end {
                        let span = end - t0;
                        if span <= 0.0 {
                            return value;
                        }
                        // opposite signs or a zero start hold until the end
                        if v0 == 0.0 || (v0 < 0.0) != (value < 0.0) {
                            return v0;
                        }
                        let frac = (time - t0) / span;
                        return v0 * pow((value / v0) as f64, frac) as f32;
                    }
                    v0 = value;
                    t0 = end;
                }
                AutomationEvent::SetTarget {
                    target: goal,
                    time: start,
                    time_constant,
                } => {
                    if time < start {
                        return settle(v0, t0, target, time);
                    }
                    v0 = settle(v0, t0, target, start);
                    t0 = start;
                    target = Some((goal, time_constant));
                }
            }
        }

        settle(v0, t0, target, time)
    }

    /// Inserts after every event with the same or an earlier time.
    fn insert(&mut self, event: AutomationEvent) {
        let at = event.time();
        let idx = self.events.partition_point(|e| e.time() <= at);
        self.events.insert(idx, event);
    }
}

/// Value of a held segment or an active exponential approach.
fn settle(v0: f32, t0: f64, target: Option<(f32, f32)>, time: f64) -> f32 {
    match target {
        None => v0,
        Some((goal, tau)) if tau == 0.0 => goal,
        Some((goal, tau)) => {
            let elapsed = (time - t0).max(0.0);
            goal + (v0 - goal) * exp(-elapsed / tau as f64) as f32
        }
    }
}

fn check_finite(value: f64) -> Result<(), AutomationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AutomationError::NonFinite(value))
    }
}

pub(crate) fn check_time(time: f64) -> Result<(), AutomationError> {
    check_finite(time)?;
    if time < 0.0 {
        return Err(AutomationError::NegativeTime(time));
    }
    Ok(())
}

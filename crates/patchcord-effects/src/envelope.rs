//! ADSR gain envelope.
//!
//! The envelope lives entirely on the automation timeline of one gain node.
//! Relative to the trigger time `t0`:
//!
//! ```text
//! t0                    gain = 0
//! t0 .. t0 + A·m        linear ramp to level
//! t0 + A·m ..           approach sustain·level, time constant D
//! note off at tr ..     hold, then approach 0, time constant R
//! ```
//!
//! where `m` is the attack multiplier. The multiplier scales the attack
//! stage only.
//!
//! ## Design Decisions
//!
//! - **Rebuild, don't patch**: every setter clears the timeline from `t0`
//!   and schedules the whole envelope again, so the live curve always
//!   matches the stored values.

use patchcord_core::{AudioContext, ParamDescriptor, ParamName, ParamUnit};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, unknown_param};
use crate::error::EffectError;
use crate::node_graph::NodeGraph;
use crate::store::ParameterStore;

/// Configuration for [`EnvelopeFilter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeSettings {
    /// Peak level (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    /// Attack time scale (default 2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f32>,
    /// Attack in seconds before scaling (default 0.8).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<f32>,
    /// Decay time constant in seconds (default 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay: Option<f32>,
    /// Sustain as a fraction of the level (default 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustain: Option<f32>,
    /// Release time constant in seconds (default 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<f32>,
}

/// Four-stage amplitude envelope on a single gain node.
///
/// The envelope is triggered when the effect is built. Call
/// [`trigger()`](Self::trigger) to restart it and [`release()`](Self::release)
/// for note off.
///
/// ## Parameters
///
/// | Key | Range | Default |
/// |-----|-------|---------|
/// | `level` | 0–1 | 0.5 |
/// | `multiplier` | 0–10 | 2 |
/// | `attack` | 0–10 s | 0.8 |
/// | `decay` | 0–10 s | 0 |
/// | `sustain` | 0–1 | 0 |
/// | `release` | 0–10 s | 0 |
#[derive(Debug, Clone)]
pub struct EnvelopeFilter {
    graph: NodeGraph,
    settings: ParameterStore,
    level: f32,
    multiplier: f32,
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    t0: f64,
    released_at: Option<f64>,
}

impl EnvelopeFilter {
    /// Numeric parameters.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::level(),
        ParamDescriptor::new("Multiplier", "multiplier", ParamUnit::Ratio, 0.0, 10.0, 2.0)
            .with_short_name("Mult"),
        ParamDescriptor::time_secs("Attack", "attack", 0.0, 10.0, 0.8),
        ParamDescriptor::time_secs("Decay", "decay", 0.0, 10.0, 0.0),
        ParamDescriptor::new("Sustain", "sustain", ParamUnit::None, 0.0, 1.0, 0.0),
        ParamDescriptor::time_secs("Release", "release", 0.0, 10.0, 0.0),
    ];

    /// Builds the envelope gain and triggers it at the current time.
    pub fn new(ctx: &mut AudioContext, settings: EnvelopeSettings) -> Result<Self, EffectError> {
        let level = settings.level.unwrap_or(0.5);
        let node = ctx.create_gain(level)?;
        let env = Self {
            graph: NodeGraph::single(node),
            settings: ParameterStore::from_settings(&settings),
            level,
            multiplier: settings.multiplier.unwrap_or(2.0),
            attack: settings.attack.unwrap_or(0.8),
            decay: settings.decay.unwrap_or(0.0),
            sustain: settings.sustain.unwrap_or(0.0),
            release: settings.release.unwrap_or(0.0),
            t0: ctx.current_time(),
            released_at: None,
        };
        env.schedule(ctx)?;
        tracing::debug!(
            attack = env.attack,
            multiplier = env.multiplier,
            "envelope created"
        );
        Ok(env)
    }

    /// Time the attack reaches its peak.
    pub fn peak_time(&self) -> f64 {
        self.t0 + (self.attack * self.multiplier).max(0.0) as f64
    }

    /// Returns the time of the last trigger.
    pub fn trigger_time(&self) -> f64 {
        self.t0
    }

    /// Returns the time of note off, if it happened.
    pub fn released_at(&self) -> Option<f64> {
        self.released_at
    }

    fn schedule(&self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        let peak = self.peak_time();
        let gain = ctx.param_mut(self.graph.main(), ParamName::Gain)?;
        gain.cancel_scheduled_values(self.t0)?;
        gain.set_value(self.level)?;
        gain.set_value_at_time(0.0, self.t0)?;
        gain.linear_ramp_to_value_at_time(self.level, peak)?;
        gain.set_target_at_time(self.sustain * self.level, peak, self.decay.max(0.0))?;

        if let Some(at) = self.released_at {
            gain.cancel_and_hold_at_time(at)?;
            gain.set_target_at_time(0.0, at, self.release.max(0.0))?;
        }
        Ok(())
    }

    /// Restarts the envelope at the current time.
    pub fn trigger(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        self.t0 = ctx.current_time();
        self.released_at = None;
        self.schedule(ctx)
    }

    /// Note off: holds the current value and decays to 0 with the release
    /// time constant.
    pub fn release(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        self.released_at = Some(ctx.current_time().max(self.t0));
        self.schedule(ctx)
    }

    /// Returns the attack multiplier.
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Sets the attack multiplier.
    pub fn set_multiplier(&mut self, ctx: &mut AudioContext, multiplier: f32) -> Result<(), EffectError> {
        self.update(ctx, "multiplier", multiplier, |env, v| env.multiplier = v)
    }

    /// Returns the attack in seconds.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Sets the attack in seconds.
    pub fn set_attack(&mut self, ctx: &mut AudioContext, secs: f32) -> Result<(), EffectError> {
        self.update(ctx, "attack", secs, |env, v| env.attack = v)
    }

    /// Returns the decay time constant.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Sets the decay time constant.
    pub fn set_decay(&mut self, ctx: &mut AudioContext, secs: f32) -> Result<(), EffectError> {
        self.update(ctx, "decay", secs, |env, v| env.decay = v)
    }

    /// Returns the sustain fraction.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Sets the sustain fraction.
    pub fn set_sustain(&mut self, ctx: &mut AudioContext, sustain: f32) -> Result<(), EffectError> {
        self.update(ctx, "sustain", sustain, |env, v| env.sustain = v)
    }

    /// Returns the release time constant.
    pub fn release_time(&self) -> f32 {
        self.release
    }

    /// Sets the release time constant.
    pub fn set_release_time(&mut self, ctx: &mut AudioContext, secs: f32) -> Result<(), EffectError> {
        self.update(ctx, "release", secs, |env, v| env.release = v)
    }

    /// Applies `value`, reschedules, and rolls back if the timeline refuses.
    fn update(
        &mut self,
        ctx: &mut AudioContext,
        key: &str,
        value: f32,
        apply: fn(&mut Self, f32),
    ) -> Result<(), EffectError> {
        let previous = self.values();
        apply(self, value);
        if let Err(e) = self.schedule(ctx) {
            self.set_values(previous);
            self.schedule(ctx)?;
            return Err(e);
        }
        self.settings.record(key, value);
        Ok(())
    }

    fn values(&self) -> [f32; 6] {
        [
            self.level,
            self.multiplier,
            self.attack,
            self.decay,
            self.sustain,
            self.release,
        ]
    }

    fn set_values(&mut self, values: [f32; 6]) {
        [
            self.level,
            self.multiplier,
            self.attack,
            self.decay,
            self.sustain,
            self.release,
        ] = values;
    }
}

impl Effect for EnvelopeFilter {
    fn kind(&self) -> EffectKind {
        EffectKind::EnvelopeFilter
    }

    fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut NodeGraph {
        &mut self.graph
    }

    fn settings(&self) -> &ParameterStore {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ParameterStore {
        &mut self.settings
    }

    fn level(&self) -> f32 {
        self.level
    }

    /// Sets the peak level and reschedules the envelope around it.
    fn set_level(&mut self, ctx: &mut AudioContext, level: f32) -> Result<(), EffectError> {
        self.update(ctx, "level", level, |env, v| env.level = v)
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "level" => Some(self.level),
            "multiplier" => Some(self.multiplier),
            "attack" => Some(self.attack),
            "decay" => Some(self.decay),
            "sustain" => Some(self.sustain),
            "release" => Some(self.release),
            _ => None,
        }
    }

    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32) -> Result<(), EffectError> {
        match name {
            "level" => self.set_level(ctx, value),
            "multiplier" => self.set_multiplier(ctx, value),
            "attack" => self.set_attack(ctx, value),
            "decay" => self.set_decay(ctx, value),
            "sustain" => self.set_sustain(ctx, value),
            "release" => self.set_release_time(ctx, value),
            _ => Err(unknown_param(self.kind(), name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain_at(ctx: &AudioContext, env: &EnvelopeFilter, t: f64) -> f32 {
        ctx.param_value_at(env.main_node(), ParamName::Gain, t).unwrap()
    }

    #[test]
    fn test_default_attack_is_scaled_by_multiplier() {
        let mut ctx = AudioContext::new(1000.0);
        let env = EnvelopeFilter::new(&mut ctx, EnvelopeSettings::default()).unwrap();

        assert!((env.peak_time() - 1.6).abs() < 1e-6);
        assert_eq!(gain_at(&ctx, &env, 0.0), 0.0);
        assert!((gain_at(&ctx, &env, 0.8) - 0.25).abs() < 1e-6);
        // decay 0 jumps straight to a sustain of 0
        assert_eq!(gain_at(&ctx, &env, 1.7), 0.0);
    }

    #[test]
    fn test_decay_approaches_sustain() {
        let mut ctx = AudioContext::new(1000.0);
        let env = EnvelopeFilter::new(
            &mut ctx,
            EnvelopeSettings {
                level: Some(1.0),
                multiplier: Some(1.0),
                attack: Some(0.1),
                decay: Some(0.2),
                sustain: Some(0.5),
                ..Default::default()
            },
        )
        .unwrap();

        assert!((gain_at(&ctx, &env, 0.1) - 1.0).abs() < 1e-6);
        let expected = 0.5 + 0.5 * (-1.0f64).exp() as f32;
        assert!((gain_at(&ctx, &env, 0.3) - expected).abs() < 1e-4);
        assert!((gain_at(&ctx, &env, 5.0) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decay_setter_reschedules_live_envelope() {
        let mut ctx = AudioContext::new(1000.0);
        let mut env = EnvelopeFilter::new(
            &mut ctx,
            EnvelopeSettings {
                level: Some(1.0),
                multiplier: Some(1.0),
                attack: Some(0.1),
                sustain: Some(0.5),
                ..Default::default()
            },
        )
        .unwrap();
        assert!((gain_at(&ctx, &env, 0.2) - 0.5).abs() < 1e-6);

        env.set_decay(&mut ctx, 0.5).unwrap();
        assert_eq!(env.decay(), 0.5);
        let expected = 0.5 + 0.5 * (-0.2f64).exp() as f32;
        assert!((gain_at(&ctx, &env, 0.2) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_release_holds_then_decays_to_zero() {
        let mut ctx = AudioContext::new(1000.0);
        let mut env = EnvelopeFilter::new(
            &mut ctx,
            EnvelopeSettings {
                level: Some(1.0),
                multiplier: Some(1.0),
                attack: Some(1.0),
                release: Some(0.1),
                ..Default::default()
            },
        )
        .unwrap();

        ctx.render(500);
        env.release(&mut ctx).unwrap();
        assert_eq!(env.released_at(), Some(0.5));

        let held = gain_at(&ctx, &env, 0.5);
        assert!((held - 0.5).abs() < 1e-3);
        let after = gain_at(&ctx, &env, 0.6);
        assert!((after - held * (-1.0f64).exp() as f32).abs() < 1e-3);
        assert!(gain_at(&ctx, &env, 3.0) < 1e-6);

        // the release survives a reschedule
        env.set_release_time(&mut ctx, 0.2).unwrap();
        let slower = gain_at(&ctx, &env, 0.6);
        assert!(slower > after);
    }

    #[test]
    fn test_retrigger_restarts_from_now() {
        let mut ctx = AudioContext::new(1000.0);
        let mut env = EnvelopeFilter::new(
            &mut ctx,
            EnvelopeSettings {
                level: Some(1.0),
                multiplier: Some(1.0),
                attack: Some(0.1),
                ..Default::default()
            },
        )
        .unwrap();
        ctx.render(1000);
        env.release(&mut ctx).unwrap();
        env.trigger(&mut ctx).unwrap();

        assert_eq!(env.trigger_time(), 1.0);
        assert_eq!(env.released_at(), None);
        assert_eq!(gain_at(&ctx, &env, 1.0), 0.0);
        assert!((gain_at(&ctx, &env, 1.05) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_rejected_value_is_not_stored() {
        let mut ctx = AudioContext::new(1000.0);
        let mut env = EnvelopeFilter::new(&mut ctx, EnvelopeSettings::default()).unwrap();
        assert!(env.set_sustain(&mut ctx, f32::INFINITY).is_err());
        assert_eq!(env.sustain(), 0.0);
        assert!((gain_at(&ctx, &env, 0.8) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_param_keys() {
        let mut ctx = AudioContext::new(1000.0);
        let mut env = EnvelopeFilter::new(&mut ctx, EnvelopeSettings::default()).unwrap();
        env.set_param(&mut ctx, "release", 0.3).unwrap();
        assert_eq!(env.release_time(), 0.3);
        assert_eq!(env.get_param("release"), Some(0.3));
        assert!(env.set_param(&mut ctx, "freq", 1.0).is_err());
    }
}

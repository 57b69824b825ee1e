//! Feedback delay effect and its presets.

use patchcord_core::{AudioContext, MAX_DELAY_SECS, NodeId, ParamDescriptor, ParamName, ParamUnit};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, unknown_param};
use crate::error::EffectError;
use crate::node_graph::NodeGraph;
use crate::store::ParameterStore;

/// A named bundle of delay settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayPreset {
    /// Preset name.
    pub name: &'static str,
    /// Delay time in seconds.
    pub delay_time: f32,
    /// Feedback fraction.
    pub feedback: f32,
    /// Level, when the preset sets one.
    pub level: Option<f32>,
}

/// Built-in delay presets.
///
/// Feedback generally wants to sit above 0.3 so repeats do not smear into
/// the dry note.
pub const DELAY_PRESETS: &[DelayPreset] = &[
    DelayPreset {
        name: "pingPong",
        delay_time: 0.03,
        feedback: 0.4,
        level: None,
    },
    DelayPreset {
        name: "echos",
        delay_time: 0.16,
        feedback: 0.65,
        level: None,
    },
    DelayPreset {
        name: "metalTail",
        delay_time: 0.11,
        feedback: 0.86,
        level: Some(0.03),
    },
];

/// Looks up a preset by name, ignoring ASCII case.
pub fn delay_preset(name: &str) -> Option<&'static DelayPreset> {
    DELAY_PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Configuration for [`Delay`].
///
/// When `preset` names one of [`DELAY_PRESETS`], its values fill every
/// field that is not set explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelaySettings {
    /// Level of the delayed signal (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    /// Delay time in seconds (default 0.5).
    #[serde(alias = "delayTime", skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<f32>,
    /// Fraction fed back into the line (default 0.3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f32>,
    /// Longest delay time the line can hold, in seconds (default 1, or the
    /// delay time if that is longer).
    #[serde(alias = "maxDelayTime", skip_serializing_if = "Option::is_none")]
    pub max_delay_time: Option<f32>,
    /// Preset to start from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl DelaySettings {
    /// Settings holding exactly the values of a named preset.
    pub fn from_preset(name: &str) -> Result<Self, EffectError> {
        let preset = delay_preset(name).ok_or_else(|| EffectError::UnknownPreset(name.to_owned()))?;
        Ok(Self {
            level: preset.level,
            delay_time: Some(preset.delay_time),
            feedback: Some(preset.feedback),
            max_delay_time: None,
            preset: Some(preset.name.to_owned()),
        })
    }

    /// Fills unset fields from the named preset, if any.
    pub fn resolved(mut self) -> Result<Self, EffectError> {
        let Some(name) = self.preset.as_deref() else {
            return Ok(self);
        };
        let preset = delay_preset(name).ok_or_else(|| EffectError::UnknownPreset(name.to_owned()))?;
        self.level = self.level.or(preset.level);
        self.delay_time = self.delay_time.or(Some(preset.delay_time));
        self.feedback = self.feedback.or(Some(preset.feedback));
        Ok(self)
    }
}

/// Delay line with a feedback loop.
///
/// ```text
/// input ──► delay ──► main ──► output
///            ▲  │
///            └──┴── feedback
/// ```
///
/// ## Parameters
///
/// | Key | Range | Default |
/// |-----|-------|---------|
/// | `level` | 0–1 | 0.5 |
/// | `delay_time` | 0–max s | 0.5 |
/// | `feedback` | 0–0.99 | 0.3 |
///
/// Feedback at or above 1.0 grows without bound; it is accepted but not
/// guarded against.
///
/// # Example
///
/// ```rust
/// use patchcord_core::AudioContext;
/// use patchcord_effects::{Delay, DelaySettings};
///
/// let mut ctx = AudioContext::new(48000.0);
/// let delay = Delay::new(&mut ctx, DelaySettings::from_preset("pingPong").unwrap()).unwrap();
/// assert_eq!(delay.delay_time(), 0.03);
/// assert_eq!(delay.feedback(), 0.4);
/// ```
#[derive(Debug, Clone)]
pub struct Delay {
    graph: NodeGraph,
    settings: ParameterStore,
    level: f32,
    delay_time: f32,
    feedback: f32,
    max_delay_time: f32,
}

impl Delay {
    /// Numeric parameters.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::level(),
        ParamDescriptor::time_secs("Delay Time", "delay_time", 0.0, 2.0, 0.5).with_short_name("Time"),
        ParamDescriptor::new("Feedback", "feedback", ParamUnit::None, 0.0, 0.99, 0.3)
            .with_short_name("Fdbk")
            .with_step(0.01),
    ];

    /// Builds the delay loop and applies `settings`.
    pub fn new(ctx: &mut AudioContext, settings: DelaySettings) -> Result<Self, EffectError> {
        let settings = settings.resolved()?;
        let level = settings.level.unwrap_or(0.5);
        let delay_time = settings.delay_time.unwrap_or(0.5);
        let feedback = settings.feedback.unwrap_or(0.3);
        let max_delay_time = settings
            .max_delay_time
            .unwrap_or_else(|| delay_time.clamp(1.0, MAX_DELAY_SECS));

        let delay = ctx.create_delay(max_delay_time)?;
        let fb = ctx.create_gain(feedback)?;
        let main = ctx.create_gain(level)?;
        ctx.set_param_value(delay, ParamName::DelayTime, delay_time)?;
        ctx.connect(delay, fb)?;
        ctx.connect(fb, delay)?;
        ctx.connect(delay, main)?;
        tracing::debug!(delay_time, feedback, "delay created");

        Ok(Self {
            graph: NodeGraph::new(main, delay)
                .with_node("delay", delay)
                .with_node("feedback", fb),
            settings: ParameterStore::from_settings(&settings),
            level,
            delay_time,
            feedback,
            max_delay_time,
        })
    }

    fn delay_node(&self) -> NodeId {
        self.graph.entry()
    }

    fn feedback_node(&self) -> Option<NodeId> {
        self.graph.node("feedback")
    }

    /// Returns the delay time in seconds.
    pub fn delay_time(&self) -> f32 {
        self.delay_time
    }

    /// Sets the delay time in seconds. The line clamps it to
    /// [`max_delay_time()`](Self::max_delay_time).
    pub fn set_delay_time(&mut self, ctx: &mut AudioContext, secs: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.delay_node(), ParamName::DelayTime, secs)?;
        self.delay_time = secs;
        self.settings.record("delay_time", secs);
        Ok(())
    }

    /// Returns the feedback fraction.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Sets the fraction of the delayed signal fed back into the line.
    pub fn set_feedback(&mut self, ctx: &mut AudioContext, amount: f32) -> Result<(), EffectError> {
        if let Some(node) = self.feedback_node() {
            ctx.set_param_value(node, ParamName::Gain, amount)?;
        }
        self.feedback = amount;
        self.settings.record("feedback", amount);
        Ok(())
    }

    /// Returns the longest delay the line holds.
    pub fn max_delay_time(&self) -> f32 {
        self.max_delay_time
    }

    /// Applies a preset's values to the live effect.
    pub fn apply_preset(
        &mut self,
        ctx: &mut AudioContext,
        preset: &DelayPreset,
    ) -> Result<(), EffectError> {
        self.set_delay_time(ctx, preset.delay_time)?;
        self.set_feedback(ctx, preset.feedback)?;
        if let Some(level) = preset.level {
            self.set_level(ctx, level)?;
        }
        tracing::debug!(preset = preset.name, "delay preset applied");
        Ok(())
    }
}

impl Effect for Delay {
    fn kind(&self) -> EffectKind {
        EffectKind::Delay
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

    /// Sets the gain of the delayed signal.
    fn set_level(&mut self, ctx: &mut AudioContext, level: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.graph.main(), ParamName::Gain, level)?;
        self.level = level;
        self.settings.record("level", level);
        Ok(())
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "level" => Some(self.level),
            "delay_time" => Some(self.delay_time),
            "feedback" => Some(self.feedback),
            _ => None,
        }
    }

    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32) -> Result<(), EffectError> {
        match name {
            "level" => self.set_level(ctx, value),
            "delay_time" => self.set_delay_time(ctx, value),
            "feedback" => self.set_feedback(ctx, value),
            _ => Err(unknown_param(self.kind(), name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_response(delay: &mut Delay, ctx: &mut AudioContext, frames: usize) -> Vec<f32> {
        let mut impulse = vec![0.0; frames];
        impulse[0] = 1.0;
        let src = ctx
            .create_buffer_source(patchcord_core::AudioBuffer::new(impulse, ctx.sample_rate()))
            .unwrap();
        let dest = ctx.destination();
        delay.set_input(ctx, src).unwrap();
        delay.set_output(ctx, dest).unwrap();
        ctx.start(src, 0.0).unwrap();
        ctx.render(frames)
    }

    #[test]
    fn test_defaults() {
        let mut ctx = AudioContext::new(48000.0);
        let delay = Delay::new(&mut ctx, DelaySettings::default()).unwrap();
        assert_eq!(delay.delay_time(), 0.5);
        assert_eq!(delay.feedback(), 0.3);
        assert_eq!(delay.level(), 0.5);
        assert_eq!(delay.max_delay_time(), 1.0);
        assert_eq!(ctx.param_value(delay.main_node(), ParamName::Gain).unwrap(), 0.5);
    }

    #[test]
    fn test_topology() {
        let mut ctx = AudioContext::new(48000.0);
        let delay = Delay::new(&mut ctx, DelaySettings::default()).unwrap();
        let line = delay.graph().node("delay").unwrap();
        let fb = delay.graph().node("feedback").unwrap();
        assert_eq!(delay.entry_node(), line);
        assert!(ctx.is_connected(line, fb));
        assert!(ctx.is_connected(fb, line));
        assert!(ctx.is_connected(line, delay.main_node()));
    }

    #[test]
    fn test_feedback_setter_writes_feedback_gain() {
        let mut ctx = AudioContext::new(48000.0);
        let mut delay = Delay::new(&mut ctx, DelaySettings::default()).unwrap();
        delay.set_feedback(&mut ctx, 0.7).unwrap();

        let fb = delay.graph().node("feedback").unwrap();
        assert_eq!(ctx.param_value(fb, ParamName::Gain).unwrap(), 0.7);
        assert_eq!(delay.feedback(), 0.7);
        // the delay time is untouched
        assert_eq!(delay.delay_time(), 0.5);
        let line = delay.graph().node("delay").unwrap();
        assert_eq!(ctx.param_value(line, ParamName::DelayTime).unwrap(), 0.5);
    }

    #[test]
    fn test_echoes_follow_delay_and_feedback() {
        let mut ctx = AudioContext::new(1000.0);
        let mut delay = Delay::new(
            &mut ctx,
            DelaySettings {
                delay_time: Some(0.1),
                feedback: Some(0.5),
                level: Some(1.0),
                ..Default::default()
            },
        )
        .unwrap();
        let out = impulse_response(&mut delay, &mut ctx, 350);
        assert!((out[100] - 1.0).abs() < 1e-6);
        assert!((out[200] - 0.5).abs() < 1e-6);
        assert!((out[300] - 0.25).abs() < 1e-6);
        assert_eq!(out[150], 0.0);
    }

    #[test]
    fn test_preset_at_construction() {
        let mut ctx = AudioContext::new(48000.0);
        let delay = Delay::new(
            &mut ctx,
            DelaySettings {
                preset: Some("pingPong".to_owned()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(delay.delay_time(), 0.03);
        assert_eq!(delay.feedback(), 0.4);
        assert_eq!(delay.level(), 0.5);
    }

    #[test]
    fn test_explicit_fields_beat_preset() {
        let settings = DelaySettings {
            preset: Some("metalTail".to_owned()),
            feedback: Some(0.2),
            ..Default::default()
        }
        .resolved()
        .unwrap();
        assert_eq!(settings.feedback, Some(0.2));
        assert_eq!(settings.delay_time, Some(0.11));
        assert_eq!(settings.level, Some(0.03));
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        let mut ctx = AudioContext::new(48000.0);
        let err = Delay::new(
            &mut ctx,
            DelaySettings {
                preset: Some("slapback".to_owned()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, EffectError::UnknownPreset("slapback".to_owned()));
    }

    #[test]
    fn test_apply_preset_to_live_delay() {
        let mut ctx = AudioContext::new(48000.0);
        let mut delay = Delay::new(&mut ctx, DelaySettings::default()).unwrap();
        delay
            .apply_preset(&mut ctx, delay_preset("metaltail").unwrap())
            .unwrap();
        assert_eq!(delay.delay_time(), 0.11);
        assert_eq!(delay.feedback(), 0.86);
        assert_eq!(delay.level(), 0.03);
        assert_eq!(ctx.param_value(delay.main_node(), ParamName::Gain).unwrap(), 0.03);
    }

    #[test]
    fn test_long_delay_raises_max() {
        let mut ctx = AudioContext::new(48000.0);
        let delay = Delay::new(
            &mut ctx,
            DelaySettings {
                delay_time: Some(2.5),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(delay.max_delay_time(), 2.5);
    }

    #[test]
    fn test_teardown_clears_feedback_loop() {
        let mut ctx = AudioContext::new(48000.0);
        let mut delay = Delay::new(&mut ctx, DelaySettings::default()).unwrap();
        delay.teardown(&mut ctx).unwrap();
        for (_, node) in delay.graph().nodes() {
            assert_eq!(ctx.outgoing_count(node), 0);
        }
        assert_eq!(ctx.outgoing_count(delay.main_node()), 0);
    }
}

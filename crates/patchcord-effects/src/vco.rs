//! Two-oscillator voice.

use patchcord_core::{AudioContext, NodeId, ParamDescriptor, ParamName, ParamUnit, Waveform, transpose};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, unknown_param};
use crate::error::EffectError;
use crate::node_graph::NodeGraph;
use crate::store::ParameterStore;

/// Configuration for [`Vco`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcoSettings {
    /// Output level (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    /// Base frequency in Hz (default 440).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<f32>,
    /// Interval of the second oscillator above the first (default 4).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semitones: Option<f32>,
    /// Waveform of both oscillators (default sine).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveform: Option<Waveform>,
}

/// Two oscillators summed into a shared gain (the VCA).
///
/// ```text
/// vco1 (freq) ────────────────┐
///                             ├──► vca (main) ──► output
/// vco2 (freq · 2^(st/12)) ────┘
/// ```
///
/// The oscillators are sources: nothing patched into the effect's input
/// reaches them, and they stay silent until [`start()`](Self::start).
/// Frequency and interval changes retune both oscillators immediately.
///
/// ## Parameters
///
/// | Key | Range | Default |
/// |-----|-------|---------|
/// | `level` | 0–1 | 0.5 |
/// | `freq` | 20–20000 Hz | 440 |
/// | `semitones` | −24–24 st | 4 |
#[derive(Debug, Clone)]
pub struct Vco {
    graph: NodeGraph,
    settings: ParameterStore,
    level: f32,
    freq: f32,
    semitones: f32,
    waveform: Waveform,
}

impl Vco {
    /// Numeric parameters.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::level(),
        ParamDescriptor::new("Frequency", "freq", ParamUnit::Hertz, 20.0, 20000.0, 440.0)
            .with_short_name("Freq")
            .with_step(1.0),
        ParamDescriptor::new("Semitones", "semitones", ParamUnit::Semitones, -24.0, 24.0, 4.0)
            .with_short_name("Semi")
            .with_step(1.0),
    ];

    /// Builds both oscillators and the VCA.
    pub fn new(ctx: &mut AudioContext, settings: VcoSettings) -> Result<Self, EffectError> {
        let level = settings.level.unwrap_or(0.5);
        let waveform = settings.waveform.unwrap_or_default();

        let vco1 = ctx.create_oscillator();
        let vco2 = ctx.create_oscillator();
        let vca = ctx.create_gain(level)?;
        ctx.set_waveform(vco1, waveform)?;
        ctx.set_waveform(vco2, waveform)?;
        ctx.connect(vco1, vca)?;
        ctx.connect(vco2, vca)?;

        let vco = Self {
            graph: NodeGraph::single(vca)
                .with_node("vco1", vco1)
                .with_node("vco2", vco2),
            settings: ParameterStore::from_settings(&settings),
            level,
            freq: settings.freq.unwrap_or(440.0),
            semitones: settings.semitones.unwrap_or(4.0),
            waveform,
        };
        vco.tune(ctx, vco.freq, vco.semitones)?;
        tracing::debug!(freq = vco.freq, semitones = vco.semitones, %waveform, "vco created");
        Ok(vco)
    }

    fn tune(&self, ctx: &mut AudioContext, freq: f32, semitones: f32) -> Result<(), EffectError> {
        if let Some(vco1) = self.graph.node("vco1") {
            ctx.set_param_value(vco1, ParamName::Frequency, freq)?;
        }
        if let Some(vco2) = self.graph.node("vco2") {
            ctx.set_param_value(vco2, ParamName::Frequency, transpose(freq, semitones))?;
        }
        Ok(())
    }

    fn oscillators(&self) -> impl Iterator<Item = NodeId> + '_ {
        ["vco1", "vco2"].into_iter().filter_map(|name| self.graph.node(name))
    }

    /// Returns the base frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Retunes both oscillators to a new base frequency.
    pub fn set_freq(&mut self, ctx: &mut AudioContext, freq: f32) -> Result<(), EffectError> {
        self.tune(ctx, freq, self.semitones)?;
        self.freq = freq;
        self.settings.record("freq", freq);
        Ok(())
    }

    /// Returns the interval of the second oscillator.
    pub fn semitones(&self) -> f32 {
        self.semitones
    }

    /// Retunes the second oscillator to a new interval.
    pub fn set_semitones(&mut self, ctx: &mut AudioContext, semitones: f32) -> Result<(), EffectError> {
        self.tune(ctx, self.freq, semitones)?;
        self.semitones = semitones;
        self.settings.record("semitones", semitones);
        Ok(())
    }

    /// Returns the waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Sets the waveform of both oscillators.
    pub fn set_waveform(&mut self, ctx: &mut AudioContext, waveform: Waveform) -> Result<(), EffectError> {
        for osc in self.oscillators() {
            ctx.set_waveform(osc, waveform)?;
        }
        self.waveform = waveform;
        self.settings.record("waveform", waveform.as_str());
        Ok(())
    }

    /// Starts both oscillators at `when` seconds.
    pub fn start(&self, ctx: &mut AudioContext, when: f64) -> Result<(), EffectError> {
        for osc in self.oscillators() {
            ctx.start(osc, when)?;
        }
        Ok(())
    }

    /// Stops both oscillators at `when` seconds.
    pub fn stop(&self, ctx: &mut AudioContext, when: f64) -> Result<(), EffectError> {
        for osc in self.oscillators() {
            ctx.stop(osc, when)?;
        }
        Ok(())
    }
}

impl Effect for Vco {
    fn kind(&self) -> EffectKind {
        EffectKind::Vco
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

    fn set_level(&mut self, ctx: &mut AudioContext, level: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.graph.main(), ParamName::Gain, level)?;
        self.level = level;
        self.settings.record("level", level);
        Ok(())
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "level" => Some(self.level),
            "freq" => Some(self.freq),
            "semitones" => Some(self.semitones),
            _ => None,
        }
    }

    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32) -> Result<(), EffectError> {
        match name {
            "level" => self.set_level(ctx, value),
            "freq" => self.set_freq(ctx, value),
            "semitones" => self.set_semitones(ctx, value),
            _ => Err(unknown_param(self.kind(), name)),
        }
    }

    /// Stops both oscillators now, then disconnects every node.
    fn teardown(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        tracing::debug!(effect = %self.kind(), "teardown");
        let now = ctx.current_time();
        for osc in self.oscillators() {
            // stopping an oscillator that never started is harmless
            ctx.stop(osc, now)?;
        }
        self.graph.teardown(ctx)?;
        Ok(())
    }
}

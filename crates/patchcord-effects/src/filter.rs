//! Single biquad filter effect.

use patchcord_core::{AudioContext, FilterType, NodeId, ParamDescriptor, ParamName, ParamUnit};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, unknown_param};
use crate::error::EffectError;
use crate::node_graph::NodeGraph;
use crate::store::ParameterStore;

/// Configuration for [`Filter`]. Missing fields take the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Level (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    /// Cutoff or center frequency in Hz (default 20000).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<f32>,
    /// Response shape (default lowpass).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FilterType>,
    /// Quality factor (default 1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<f32>,
    /// Boost or cut in dB for shelf and peaking types (default 10).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<f32>,
}

/// A biquad filter with no internal topology: the filter node is both the
/// input and the output.
///
/// ## Parameters
///
/// | Key | Range | Default |
/// |-----|-------|---------|
/// | `level` | 0–1 | 0.5 |
/// | `freq` | 10–20000 Hz | 20000 |
/// | `q` | 0.0001–1000 | 1.0 |
/// | `gain` | −40–40 dB | 10.0 |
///
/// Values outside these ranges are accepted and stored as given; the host
/// clamps what the node actually computes with.
///
/// # Example
///
/// ```rust
/// use patchcord_core::{AudioContext, FilterType, ParamName};
/// use patchcord_effects::{Filter, FilterSettings};
///
/// let mut ctx = AudioContext::new(48000.0);
/// let mut filter = Filter::new(&mut ctx, FilterSettings {
///     filter_type: Some(FilterType::Highpass),
///     freq: Some(200.0),
///     ..Default::default()
/// }).unwrap();
///
/// filter.set_q(&mut ctx, 4.0).unwrap();
/// assert_eq!(filter.q(), 4.0);
/// assert_eq!(ctx.param_value(filter.node(), ParamName::Q).unwrap(), 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    graph: NodeGraph,
    settings: ParameterStore,
    level: f32,
    freq: f32,
    filter_type: FilterType,
    q: f32,
    gain: f32,
}

impl Filter {
    /// Numeric parameters.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::level(),
        ParamDescriptor::new("Frequency", "freq", ParamUnit::Hertz, 10.0, 20000.0, 20000.0)
            .with_short_name("Freq")
            .with_step(1.0),
        ParamDescriptor::new("Resonance", "q", ParamUnit::Ratio, 0.0001, 1000.0, 1.0)
            .with_short_name("Q")
            .with_step(0.01),
        ParamDescriptor::gain_db("Gain", "gain", -40.0, 40.0, 10.0),
    ];

    /// Builds the filter node and applies `settings`.
    pub fn new(ctx: &mut AudioContext, settings: FilterSettings) -> Result<Self, EffectError> {
        let level = settings.level.unwrap_or(0.5);
        let freq = settings.freq.unwrap_or(20000.0);
        let filter_type = settings.filter_type.unwrap_or(FilterType::Lowpass);
        let q = settings.q.unwrap_or(1.0);
        let gain = settings.gain.unwrap_or(10.0);

        let node = ctx.create_biquad_filter();
        ctx.set_filter_type(node, filter_type)?;
        ctx.set_param_value(node, ParamName::Frequency, freq)?;
        ctx.set_param_value(node, ParamName::Q, q)?;
        ctx.set_param_value(node, ParamName::Gain, gain)?;
        tracing::debug!(%filter_type, freq, q, gain, "filter created");

        Ok(Self {
            graph: NodeGraph::single(node),
            settings: ParameterStore::from_settings(&settings),
            level,
            freq,
            filter_type,
            q,
            gain,
        })
    }

    /// Returns the filter node.
    pub fn node(&self) -> NodeId {
        self.graph.main()
    }

    /// Returns the frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Sets the frequency in Hz.
    pub fn set_freq(&mut self, ctx: &mut AudioContext, freq: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Frequency, freq)?;
        self.freq = freq;
        self.settings.record("freq", freq);
        Ok(())
    }

    /// Returns the response shape.
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Sets the response shape.
    pub fn set_filter_type(
        &mut self,
        ctx: &mut AudioContext,
        filter_type: FilterType,
    ) -> Result<(), EffectError> {
        ctx.set_filter_type(self.node(), filter_type)?;
        self.filter_type = filter_type;
        self.settings.record("type", filter_type.as_str());
        Ok(())
    }

    /// Returns the quality factor.
    pub fn q(&self) -> f32 {
        self.q
    }

    /// Sets the quality factor.
    pub fn set_q(&mut self, ctx: &mut AudioContext, q: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Q, q)?;
        self.q = q;
        self.settings.record("q", q);
        Ok(())
    }

    /// Returns the boost or cut in dB.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Sets the boost or cut in dB (shelf and peaking types).
    pub fn set_gain(&mut self, ctx: &mut AudioContext, gain: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Gain, gain)?;
        self.gain = gain;
        self.settings.record("gain", gain);
        Ok(())
    }
}

impl Effect for Filter {
    fn kind(&self) -> EffectKind {
        EffectKind::Filter
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

    /// Stores the level; the filter node has nothing it maps to.
    fn set_level(&mut self, _ctx: &mut AudioContext, level: f32) -> Result<(), EffectError> {
        self.level = level;
        self.settings.record("level", level);
        Ok(())
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "level" => Some(self.level),
            "freq" => Some(self.freq),
            "q" => Some(self.q),
            "gain" => Some(self.gain),
            _ => None,
        }
    }

    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32) -> Result<(), EffectError> {
        match name {
            "level" => self.set_level(ctx, value),
            "freq" => self.set_freq(ctx, value),
            "q" => self.set_q(ctx, value),
            "gain" => self.set_gain(ctx, value),
            _ => Err(unknown_param(self.kind(), name)),
        }
    }
}

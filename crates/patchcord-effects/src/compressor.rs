//! Dynamics compressor effect.

use patchcord_core::{AudioContext, NodeId, ParamDescriptor, ParamName, ParamUnit};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, unknown_param};
use crate::error::EffectError;
use crate::node_graph::NodeGraph;
use crate::store::ParameterStore;

/// Configuration for [`Compressor`]. Every control defaults to 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorSettings {
    /// Level (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    /// Threshold in dB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    /// Knee width in dB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knee: Option<f32>,
    /// Ratio (n:1); values up to 1 leave the signal uncompressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f32>,
    /// Attack in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<f32>,
    /// Release in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<f32>,
}

/// Pass-through configuration of a single dynamics-compressor node.
///
/// With everything at its default of 0 the node runs at a 0 dB threshold
/// with a hard knee, and the ratio of 0 computes as 1:1, so the compressor
/// is transparent until configured.
///
/// ## Parameters
///
/// | Key | Range | Default |
/// |-----|-------|---------|
/// | `level` | 0–1 | 0.5 |
/// | `threshold` | −100–0 dB | 0 |
/// | `knee` | 0–40 dB | 0 |
/// | `ratio` | 1–20 | 0 |
/// | `attack` | 0–1 s | 0 |
/// | `release` | 0–1 s | 0 |
#[derive(Debug, Clone)]
pub struct Compressor {
    graph: NodeGraph,
    settings: ParameterStore,
    level: f32,
    threshold: f32,
    knee: f32,
    ratio: f32,
    attack: f32,
    release: f32,
}

impl Compressor {
    /// Numeric parameters.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::level(),
        ParamDescriptor::gain_db("Threshold", "threshold", -100.0, 0.0, 0.0).with_short_name("Thresh"),
        ParamDescriptor::gain_db("Knee", "knee", 0.0, 40.0, 0.0),
        // ratios of 1 or less leave the signal uncompressed
        ParamDescriptor::new("Ratio", "ratio", ParamUnit::Ratio, 0.0, 20.0, 0.0).with_step(0.1),
        ParamDescriptor::time_secs("Attack", "attack", 0.0, 1.0, 0.0),
        ParamDescriptor::time_secs("Release", "release", 0.0, 1.0, 0.0),
    ];

    /// Builds the compressor node and applies `settings`.
    pub fn new(ctx: &mut AudioContext, settings: CompressorSettings) -> Result<Self, EffectError> {
        let node = ctx.create_dynamics_compressor();
        let comp = Self {
            graph: NodeGraph::single(node),
            settings: ParameterStore::from_settings(&settings),
            level: settings.level.unwrap_or(0.5),
            threshold: settings.threshold.unwrap_or(0.0),
            knee: settings.knee.unwrap_or(0.0),
            ratio: settings.ratio.unwrap_or(0.0),
            attack: settings.attack.unwrap_or(0.0),
            release: settings.release.unwrap_or(0.0),
        };
        comp.push_all(ctx)?;
        tracing::debug!(
            threshold = comp.threshold,
            ratio = comp.ratio,
            "compressor created"
        );
        Ok(comp)
    }

    fn push_all(&self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        let node = self.node();
        ctx.set_param_value(node, ParamName::Threshold, self.threshold)?;
        ctx.set_param_value(node, ParamName::Knee, self.knee)?;
        ctx.set_param_value(node, ParamName::Ratio, self.ratio)?;
        ctx.set_param_value(node, ParamName::Attack, self.attack)?;
        ctx.set_param_value(node, ParamName::Release, self.release)?;
        Ok(())
    }

    /// Returns the compressor node.
    pub fn node(&self) -> NodeId {
        self.graph.main()
    }

    /// Returns the gain reduction the node is currently applying, in dB.
    pub fn reduction(&self, ctx: &AudioContext) -> Result<f32, EffectError> {
        Ok(ctx.compressor_reduction(self.node())?)
    }

    /// Returns the threshold in dB.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Sets the threshold in dB.
    pub fn set_threshold(&mut self, ctx: &mut AudioContext, db: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Threshold, db)?;
        self.threshold = db;
        self.settings.record("threshold", db);
        Ok(())
    }

    /// Returns the knee width in dB.
    pub fn knee(&self) -> f32 {
        self.knee
    }

    /// Sets the knee width in dB.
    pub fn set_knee(&mut self, ctx: &mut AudioContext, db: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Knee, db)?;
        self.knee = db;
        self.settings.record("knee", db);
        Ok(())
    }

    /// Returns the ratio.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Sets the ratio.
    pub fn set_ratio(&mut self, ctx: &mut AudioContext, ratio: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Ratio, ratio)?;
        self.ratio = ratio;
        self.settings.record("ratio", ratio);
        Ok(())
    }

    /// Returns the attack in seconds.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Sets the attack in seconds.
    pub fn set_attack(&mut self, ctx: &mut AudioContext, secs: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Attack, secs)?;
        self.attack = secs;
        self.settings.record("attack", secs);
        Ok(())
    }

    /// Returns the release in seconds.
    pub fn release(&self) -> f32 {
        self.release
    }

    /// Sets the release in seconds.
    pub fn set_release(&mut self, ctx: &mut AudioContext, secs: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.node(), ParamName::Release, secs)?;
        self.release = secs;
        self.settings.record("release", secs);
        Ok(())
    }
}

impl Effect for Compressor {
    fn kind(&self) -> EffectKind {
        EffectKind::Compressor
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

    fn set_level(&mut self, _ctx: &mut AudioContext, level: f32) -> Result<(), EffectError> {
        self.level = level;
        self.settings.record("level", level);
        Ok(())
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "level" => Some(self.level),
            "threshold" => Some(self.threshold),
            "knee" => Some(self.knee),
            "ratio" => Some(self.ratio),
            "attack" => Some(self.attack),
            "release" => Some(self.release),
            _ => None,
        }
    }

    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32) -> Result<(), EffectError> {
        match name {
            "level" => self.set_level(ctx, value),
            "threshold" => self.set_threshold(ctx, value),
            "knee" => self.set_knee(ctx, value),
            "ratio" => self.set_ratio(ctx, value),
            "attack" => self.set_attack(ctx, value),
            "release" => self.set_release(ctx, value),
            _ => Err(unknown_param(self.kind(), name)),
        }
    }
}

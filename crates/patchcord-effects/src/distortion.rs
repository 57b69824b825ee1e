//! Wave-shaping distortion effect.
//!
//! The transfer curve is a fixed soft-clipping function of a drive amount
//! `k`, sampled at [`CURVE_SAMPLES`] points across [-1, 1):
//!
//! ```text
//! x = 2i/N - 1
//! curve[i] = (3 + k) · x · 20° / (π + k·|x|)
//! ```
//!
//! Oversampling only changes how finely the host evaluates the curve, never
//! its shape.

use core::f64::consts::PI;

use patchcord_core::{AudioContext, NodeId, OverSample, ParamDescriptor, ParamName, ParamUnit};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, unknown_param};
use crate::error::EffectError;
use crate::node_graph::NodeGraph;
use crate::store::ParameterStore;

/// Resolution of generated curves.
pub const CURVE_SAMPLES: usize = 44100;

/// Largest accepted drive; anything above falls back to [`DEFAULT_DRIVE`].
pub const MAX_DRIVE: f32 = 400.0;

/// Drive used when none is given or the given one is out of range.
pub const DEFAULT_DRIVE: f32 = 50.0;

/// Generates the soft-clipping transfer curve for `drive`.
///
/// Drives above [`MAX_DRIVE`] (and NaN) use [`DEFAULT_DRIVE`]; negative
/// drives are treated as 0. The result is deterministic: the same drive and
/// resolution always give the same curve. `curve[0]` is the response at
/// `x = -1` and `curve[samples - 1]` at `x = 1 - 2/samples`.
pub fn make_distortion_curve(drive: f32, samples: usize) -> Vec<f32> {
    let k = effective_drive(drive) as f64;
    let deg = PI / 180.0;
    let n = samples as f64;
    (0..samples)
        .map(|i| {
            let x = (i as f64 * 2.0) / n - 1.0;
            ((3.0 + k) * x * 20.0 * deg / (PI + k * x.abs())) as f32
        })
        .collect()
}

fn effective_drive(drive: f32) -> f32 {
    if drive.is_nan() || drive > MAX_DRIVE {
        DEFAULT_DRIVE
    } else {
        drive.max(0.0)
    }
}

/// Configuration for [`Distortion`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionSettings {
    /// Output level (default 0.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f32>,
    /// Curve drive, 0–400 (default 50).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive: Option<f32>,
    /// Oversampling (default 4x).
    #[serde(alias = "oversamples", skip_serializing_if = "Option::is_none")]
    pub oversample: Option<OverSample>,
}

/// Wave-shaping distortion.
///
/// ```text
/// input ──► pre ──► shaper ──► post (main) ──► output
/// ```
///
/// ## Parameters
///
/// | Key | Range | Default |
/// |-----|-------|---------|
/// | `level` | 0–1 | 0.5 |
/// | `drive` | 0–400 | 50 |
#[derive(Debug, Clone)]
pub struct Distortion {
    graph: NodeGraph,
    settings: ParameterStore,
    level: f32,
    drive: f32,
    oversample: OverSample,
}

impl Distortion {
    /// Numeric parameters.
    pub const PARAMS: &'static [ParamDescriptor] = &[
        ParamDescriptor::level(),
        ParamDescriptor::new("Drive", "drive", ParamUnit::None, 0.0, MAX_DRIVE, DEFAULT_DRIVE)
            .with_step(1.0),
    ];

    /// Builds the shaping chain and applies `settings`.
    pub fn new(ctx: &mut AudioContext, settings: DistortionSettings) -> Result<Self, EffectError> {
        let level = settings.level.unwrap_or(0.5);
        let drive = settings.drive.unwrap_or(DEFAULT_DRIVE);
        let oversample = settings.oversample.unwrap_or(OverSample::X4);

        let pre = ctx.create_gain(1.0)?;
        let shaper = ctx.create_wave_shaper();
        let post = ctx.create_gain(level)?;
        ctx.set_curve(shaper, Some(make_distortion_curve(drive, CURVE_SAMPLES)))?;
        ctx.set_oversample(shaper, oversample)?;
        ctx.connect(pre, shaper)?;
        ctx.connect(shaper, post)?;
        tracing::debug!(drive, %oversample, "distortion created");

        Ok(Self {
            graph: NodeGraph::new(post, pre)
                .with_node("pre", pre)
                .with_node("shaper", shaper),
            settings: ParameterStore::from_settings(&settings),
            level,
            drive,
            oversample,
        })
    }

    fn shaper(&self) -> Option<NodeId> {
        self.graph.node("shaper")
    }

    /// Returns the drive.
    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Sets the drive and regenerates the curve.
    pub fn set_drive(&mut self, ctx: &mut AudioContext, drive: f32) -> Result<(), EffectError> {
        if let Some(shaper) = self.shaper() {
            ctx.set_curve(shaper, Some(make_distortion_curve(drive, CURVE_SAMPLES)))?;
        }
        self.drive = drive;
        self.settings.record("drive", drive);
        Ok(())
    }

    /// Returns the oversampling mode.
    pub fn oversample(&self) -> OverSample {
        self.oversample
    }

    /// Sets the oversampling mode.
    pub fn set_oversample(
        &mut self,
        ctx: &mut AudioContext,
        oversample: OverSample,
    ) -> Result<(), EffectError> {
        if let Some(shaper) = self.shaper() {
            ctx.set_oversample(shaper, oversample)?;
        }
        self.oversample = oversample;
        self.settings.record("oversample", oversample.as_str());
        Ok(())
    }
}

impl Effect for Distortion {
    fn kind(&self) -> EffectKind {
        EffectKind::Distortion
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

    /// Sets the post-shaper gain.
    fn set_level(&mut self, ctx: &mut AudioContext, level: f32) -> Result<(), EffectError> {
        ctx.set_param_value(self.graph.main(), ParamName::Gain, level)?;
        self.level = level;
        self.settings.record("level", level);
        Ok(())
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "level" => Some(self.level),
            "drive" => Some(self.drive),
            _ => None,
        }
    }

    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32) -> Result<(), EffectError> {
        match name {
            "level" => self.set_level(ctx, value),
            "drive" => self.set_drive(ctx, value),
            _ => Err(unknown_param(self.kind(), name)),
        }
    }
}

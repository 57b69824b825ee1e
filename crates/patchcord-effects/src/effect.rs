//! The [`Effect`] capability interface and shared helpers.
//!
//! ## Design Decisions
//!
//! - **Composition over inheritance**: every variant owns a [`NodeGraph`]
//!   and a [`ParameterStore`]; the trait supplies the uniform
//!   input/output/teardown behavior on top of those two accessors.
//!
//! - **Explicit context**: effects never hold the [`AudioContext`]. Every
//!   operation that touches a live node takes `&mut AudioContext`, so the
//!   side effect is visible at the call site.
//!
//! - **Object-safe**: effect chains store `Box<dyn Effect>`.

use core::fmt;
use core::str::FromStr;

use patchcord_core::{AudioContext, EdgeId, GraphError, NodeId, NodeKind, ParamDescriptor, ParamName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compressor::Compressor;
use crate::delay::Delay;
use crate::distortion::Distortion;
use crate::envelope::EnvelopeFilter;
use crate::error::EffectError;
use crate::filter::Filter;
use crate::node_graph::NodeGraph;
use crate::reverb::Reverb;
use crate::store::ParameterStore;
use crate::vco::Vco;

/// Floor an exponential fade ramps down to.
pub const FADE_FLOOR: f32 = 0.0001;

/// Default duration of [`fade_out`], in seconds.
pub const DEFAULT_FADE_SECS: f64 = 0.05;

/// The effect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Dynamics compressor.
    Compressor,
    /// Single biquad filter.
    Filter,
    /// Feedback delay.
    Delay,
    /// Wave-shaping distortion.
    Distortion,
    /// ADSR gain envelope.
    EnvelopeFilter,
    /// Convolution reverb.
    Reverb,
    /// Two-oscillator voice.
    Vco,
}

impl EffectKind {
    /// Every variant.
    pub const ALL: [Self; 7] = [
        Self::Compressor,
        Self::Filter,
        Self::Delay,
        Self::Distortion,
        Self::EnvelopeFilter,
        Self::Reverb,
        Self::Vco,
    ];

    /// Returns the stable snake_case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compressor => "compressor",
            Self::Filter => "filter",
            Self::Delay => "delay",
            Self::Distortion => "distortion",
            Self::EnvelopeFilter => "envelope_filter",
            Self::Reverb => "reverb",
            Self::Vco => "vco",
        }
    }

    /// Returns the numeric parameters the variant exposes.
    pub fn params(self) -> &'static [ParamDescriptor] {
        match self {
            Self::Compressor => Compressor::PARAMS,
            Self::Filter => Filter::PARAMS,
            Self::Delay => Delay::PARAMS,
            Self::Distortion => Distortion::PARAMS,
            Self::EnvelopeFilter => EnvelopeFilter::PARAMS,
            Self::Reverb => Reverb::PARAMS,
            Self::Vco => Vco::PARAMS,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown effect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown effect: {0}")]
pub struct UnknownEffect(pub String);

impl FromStr for EffectKind {
    type Err = UnknownEffect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownEffect(s.to_owned()))
    }
}

/// A composable unit wrapping one or more host nodes behind a single
/// input/output pair.
///
/// Implementors provide the graph, the settings store, level handling and
/// named parameter access; everything else has a default built on those.
///
/// # Example
///
/// ```rust
/// use patchcord_core::AudioContext;
/// use patchcord_effects::{Effect, Filter, FilterSettings};
///
/// let mut ctx = AudioContext::new(48000.0);
/// let src = ctx.create_oscillator();
/// let mut filter = Filter::new(&mut ctx, FilterSettings::default()).unwrap();
///
/// let dest = ctx.destination();
/// filter.set_input(&mut ctx, src).unwrap();
/// filter.set_output(&mut ctx, dest).unwrap();
/// filter.set_param(&mut ctx, "freq", 800.0).unwrap();
/// assert_eq!(filter.get_param("freq"), Some(800.0));
///
/// filter.teardown(&mut ctx).unwrap();
/// assert_eq!(ctx.outgoing_count(filter.main_node()), 0);
/// ```
pub trait Effect: Send {
    /// Returns which variant this is.
    fn kind(&self) -> EffectKind;

    /// Returns the effect's nodes.
    fn graph(&self) -> &NodeGraph;

    /// Returns the effect's nodes mutably.
    fn graph_mut(&mut self) -> &mut NodeGraph;

    /// Returns the stored configuration.
    fn settings(&self) -> &ParameterStore;

    /// Returns the stored configuration mutably.
    fn settings_mut(&mut self) -> &mut ParameterStore;

    /// Returns the level (conventionally 0–1).
    fn level(&self) -> f32;

    /// Sets the level. Each variant decides what, if anything, it drives.
    fn set_level(&mut self, ctx: &mut AudioContext, level: f32) -> Result<(), EffectError>;

    /// Returns the numeric parameters this effect exposes.
    fn params(&self) -> &'static [ParamDescriptor] {
        self.kind().params()
    }

    /// Reads a numeric parameter by key.
    fn get_param(&self, name: &str) -> Option<f32>;

    /// Writes a numeric parameter by key, pushing it to the live node.
    fn set_param(&mut self, ctx: &mut AudioContext, name: &str, value: f32)
    -> Result<(), EffectError>;

    /// Applies any finished background work. Most effects have none.
    fn poll(&mut self, _ctx: &mut AudioContext) -> Result<(), EffectError> {
        Ok(())
    }

    /// Returns the node exposed downstream.
    fn main_node(&self) -> NodeId {
        self.graph().main()
    }

    /// Returns the node an input attaches to.
    fn entry_node(&self) -> NodeId {
        self.graph().entry()
    }

    /// Patches `source` into the effect, replacing the previous input.
    fn set_input(&mut self, ctx: &mut AudioContext, source: NodeId) -> Result<EdgeId, EffectError> {
        Ok(self.graph_mut().attach_input(ctx, source)?)
    }

    /// Returns the current input source.
    fn input(&self) -> Option<NodeId> {
        self.graph().input()
    }

    /// Patches the effect into `sink`, replacing the previous output.
    fn set_output(&mut self, ctx: &mut AudioContext, sink: NodeId) -> Result<EdgeId, EffectError> {
        Ok(self.graph_mut().attach_output(ctx, sink)?)
    }

    /// Returns the current output sink.
    fn output(&self) -> Option<NodeId> {
        self.graph().output()
    }

    /// Adds an edge from the main node to `node` and returns the main node.
    ///
    /// Unlike [`set_output()`](Self::set_output) the edge is not recorded,
    /// so several sinks can be fed. Connecting twice is a no-op.
    fn connect(&self, ctx: &mut AudioContext, node: NodeId) -> Result<NodeId, EffectError> {
        let main = self.main_node();
        if !ctx.is_connected(main, node) {
            ctx.connect(main, node)?;
        }
        Ok(main)
    }

    /// Severs every outward edge of the main node.
    fn disconnect(&mut self, ctx: &mut AudioContext) -> Result<NodeId, EffectError> {
        self.graph_mut().disconnect_main(ctx)?;
        Ok(self.main_node())
    }

    /// Severs every outward edge of every internal node.
    fn disconnect_all(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        self.graph_mut().disconnect_internal(ctx)?;
        Ok(())
    }

    /// Disconnects the main node only.
    ///
    /// Internal nodes keep their wiring; use [`teardown()`](Self::teardown)
    /// to release everything.
    fn destroy(&mut self, ctx: &mut AudioContext) -> Result<NodeId, EffectError> {
        self.disconnect(ctx)
    }

    /// Closes the input and disconnects the main node and every internal
    /// node.
    fn teardown(&mut self, ctx: &mut AudioContext) -> Result<(), EffectError> {
        tracing::debug!(effect = %self.kind(), "teardown");
        self.graph_mut().teardown(ctx)?;
        Ok(())
    }

    /// Updates a stored setting. The live graph is not touched.
    fn update_setting(&mut self, name: &str, value: Value) -> Result<(), EffectError> {
        self.settings_mut().update(name, value)
    }

    /// Replaces the whole stored configuration.
    fn replace_settings(&mut self, settings: ParameterStore) {
        self.settings_mut().replace(settings);
    }
}

/// Fades an effect out by ramping its main gain exponentially to
/// [`FADE_FLOOR`] over `duration` seconds from now.
///
/// The main node must be a gain node.
pub fn fade_out(
    ctx: &mut AudioContext,
    effect: &dyn Effect,
    duration: f64,
) -> Result<(), EffectError> {
    let main = effect.main_node();
    match ctx.kind(main) {
        Some(NodeKind::Gain) => {}
        Some(actual) => {
            return Err(GraphError::WrongNodeKind {
                node: main,
                expected: "gain",
                actual,
            }
            .into());
        }
        None => return Err(GraphError::NodeNotFound(main).into()),
    }

    let now = ctx.current_time();
    let gain = ctx.param_mut(main, ParamName::Gain)?;
    gain.cancel_and_hold_at_time(now)?;
    gain.exponential_ramp_to_value_at_time(FADE_FLOOR, now + duration.max(0.0))?;
    Ok(())
}

/// Looks up a descriptor by key.
pub fn find_param(params: &'static [ParamDescriptor], name: &str) -> Option<&'static ParamDescriptor> {
    params.iter().find(|p| p.key == name)
}

pub(crate) fn unknown_param(effect: EffectKind, name: &str) -> EffectError {
    EffectError::UnknownParam {
        effect,
        name: name.to_owned(),
    }
}

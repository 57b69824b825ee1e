//! Graph node types.
//!
//! Each node has a [`NodeId`] and a [`NodeKind`] naming its primitive. The
//! crate-private `NodeData` bundles the kind with its automatable parameters,
//! DSP state, adjacency lists and the sample it produced last.

use core::fmt;

use crate::biquad::{Biquad, FilterType};
use crate::compressor::DynamicsCompressor;
use crate::convolver::Convolver;
use crate::delay::DelayLine;
use crate::oscillator::{Oscillator, Playback};
use crate::param::{AudioParam, ParamName};
use crate::shaper::WaveShaper;
use crate::source::{BufferSource, ConstantSource};

use super::edge::EdgeId;

/// Unique identifier for a node in an [`AudioContext`](super::AudioContext).
///
/// Node IDs are assigned sequentially and never reused within a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The primitive a node implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Final sink; sums its inputs.
    Destination,
    /// Scales its input by `gain`.
    Gain,
    /// Second-order filter.
    BiquadFilter,
    /// Delay line; the only node allowed on a feedback cycle.
    Delay,
    /// Convolution with an impulse response.
    Convolver,
    /// Curve-based distortion.
    WaveShaper,
    /// Periodic waveform source.
    Oscillator,
    /// Feed-forward compressor.
    DynamicsCompressor,
    /// Plays a decoded buffer.
    BufferSource,
    /// Emits a constant offset.
    ConstantSource,
}

impl NodeKind {
    /// Returns `true` for nodes that generate signal and accept no input.
    pub const fn is_source(self) -> bool {
        matches!(
            self,
            Self::Oscillator | Self::BufferSource | Self::ConstantSource
        )
    }

    /// Returns the node kind's name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Destination => "destination",
            Self::Gain => "gain",
            Self::BiquadFilter => "biquad filter",
            Self::Delay => "delay",
            Self::Convolver => "convolver",
            Self::WaveShaper => "wave shaper",
            Self::Oscillator => "oscillator",
            Self::DynamicsCompressor => "dynamics compressor",
            Self::BufferSource => "buffer source",
            Self::ConstantSource => "constant source",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last coefficient inputs a biquad was tuned for.
pub(crate) type BiquadTuning = (FilterType, f32, f32, f32);

/// DSP state owned by a node.
#[derive(Debug)]
pub(crate) enum Processor {
    /// Destination and gain nodes are stateless.
    Stateless,
    Biquad {
        filter: Biquad,
        filter_type: FilterType,
        tuned: Option<BiquadTuning>,
    },
    Delay(DelayLine),
    Convolver(Convolver),
    WaveShaper(WaveShaper),
    Oscillator(Oscillator),
    Compressor(DynamicsCompressor),
    BufferSource(BufferSource),
    ConstantSource(ConstantSource),
}

impl Processor {
    pub fn playback_mut(&mut self) -> Option<&mut Playback> {
        match self {
            Self::Oscillator(osc) => Some(osc.playback_mut()),
            Self::BufferSource(src) => Some(src.playback_mut()),
            Self::ConstantSource(src) => Some(src.playback_mut()),
            _ => None,
        }
    }

    pub fn playback(&self) -> Option<&Playback> {
        match self {
            Self::Oscillator(osc) => Some(osc.playback()),
            Self::BufferSource(src) => Some(src.playback()),
            Self::ConstantSource(src) => Some(src.playback()),
            _ => None,
        }
    }
}

/// Internal bookkeeping for a node in the graph.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub params: Vec<(ParamName, AudioParam)>,
    pub processor: Processor,
    /// Edges arriving at this node.
    pub incoming: Vec<EdgeId>,
    /// Edges leaving this node.
    pub outgoing: Vec<EdgeId>,
    /// Sample produced in the current frame.
    pub output: f32,
}

impl NodeData {
    pub fn new(kind: NodeKind, params: Vec<(ParamName, AudioParam)>, processor: Processor) -> Self {
        Self {
            kind,
            params,
            processor,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            output: 0.0,
        }
    }

    pub fn param(&self, name: ParamName) -> Option<&AudioParam> {
        self.params.iter().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    pub fn param_mut(&mut self, name: ParamName) -> Option<&mut AudioParam> {
        self.params
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| p)
    }

    /// Computed value of a parameter at `time`; 0 when the node lacks it.
    #[inline]
    pub fn param_at(&self, name: ParamName, time: f64) -> f32 {
        self.param(name).map_or(0.0, |p| p.value_at(time))
    }
}

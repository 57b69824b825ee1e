//! Audio context: node arena, connection API and node-specific state.
//!
//! [`AudioContext`] owns every node and edge. Effects hold [`NodeId`]s into
//! it and mutate their nodes through the context, so a single owner sees
//! every topology change. Rendering lives in the sibling `render` module.

use crate::biquad::{Biquad, FilterType};
use crate::buffer::AudioBuffer;
use crate::compressor::DynamicsCompressor;
use crate::convolver::Convolver;
use crate::delay::DelayLine;
use crate::oscillator::{Oscillator, Playback, Waveform};
use crate::param::{AudioParam, AutomationError, ParamName, check_time};
use crate::shaper::{OverSample, WaveShaper};
use crate::source::{BufferSource, ConstantSource};

use super::edge::{Edge, EdgeId};
use super::node::{NodeData, NodeId, NodeKind, Processor};
use super::render::RenderPlan;

/// Longest delay a delay node accepts, in seconds.
pub const MAX_DELAY_SECS: f32 = 180.0;

/// Nominal range of unbounded parameters (gain, offset).
const UNBOUNDED: f32 = f32::MAX;

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// The specified node was not found in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    /// The specified edge was not found in the graph.
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),
    /// No edge runs between the two nodes.
    #[error("{0} is not connected to {1}")]
    NotConnected(NodeId, NodeId),
    /// The edge would close a cycle with no delay node on it.
    #[error("connecting {0} to {1} would create a cycle without a delay")]
    CycleDetected(NodeId, NodeId),
    /// The connection is structurally invalid (e.g., into a source).
    #[error("invalid connection: {0}")]
    InvalidConnection(String),
    /// A duplicate edge already exists between these nodes.
    #[error("edge from {0} to {1} already exists")]
    DuplicateEdge(NodeId, NodeId),
    /// The node has no parameter of that name.
    #[error("{kind} node {node} has no {param} parameter")]
    NoSuchParam {
        /// Node that was addressed.
        node: NodeId,
        /// Its kind.
        kind: NodeKind,
        /// Parameter requested.
        param: ParamName,
    },
    /// The operation does not apply to this kind of node.
    #[error("{node} is a {actual} node, expected {expected}")]
    WrongNodeKind {
        /// Node that was addressed.
        node: NodeId,
        /// What the operation needs.
        expected: &'static str,
        /// What the node is.
        actual: NodeKind,
    },
    /// A convolver's impulse response can only be assigned once.
    #[error("convolver {0} already has a buffer; create a new convolver instead")]
    BufferReassigned(NodeId),
    /// Buffers must be resampled to the context rate before use.
    #[error("buffer sample rate {buffer} Hz does not match context rate {context} Hz")]
    SampleRateMismatch {
        /// Rate of the buffer.
        buffer: f32,
        /// Rate of the context.
        context: f32,
    },
    /// Maximum delay time outside (0, 180] seconds.
    #[error("invalid maximum delay time: {0} s")]
    InvalidDelayTime(f32),
    /// Invalid automation or start/stop time.
    #[error(transparent)]
    Automation(#[from] AutomationError),
}

/// Mono audio graph with a sample clock.
///
/// # Usage
///
/// 1. Create a context with [`new()`](Self::new)
/// 2. Create nodes: [`create_gain()`](Self::create_gain),
///    [`create_biquad_filter()`](Self::create_biquad_filter), ...
/// 3. Connect nodes: [`connect()`](Self::connect), ending at
///    [`destination()`](Self::destination)
/// 4. Render: [`render()`](Self::render)
///
/// ```rust
/// use patchcord_core::{AudioContext, ParamName};
///
/// let mut ctx = AudioContext::new(48000.0);
/// let src = ctx.create_constant_source(1.0).unwrap();
/// let gain = ctx.create_gain(0.5).unwrap();
/// ctx.connect(src, gain).unwrap();
/// ctx.connect(gain, ctx.destination()).unwrap();
/// ctx.start(src, 0.0).unwrap();
///
/// let out = ctx.render(4);
/// assert_eq!(out, vec![0.5; 4]);
/// assert_eq!(ctx.param_value(gain, ParamName::Gain).unwrap(), 0.5);
/// ```
#[derive(Debug)]
pub struct AudioContext {
    pub(super) nodes: Vec<Option<NodeData>>,
    pub(super) edges: Vec<Option<Edge>>,
    pub(super) sample_rate: f32,
    pub(super) frame: u64,
    pub(super) plan: Option<RenderPlan>,
    destination: NodeId,
}

impl AudioContext {
    /// Creates a context running at `sample_rate` Hz with its destination node.
    pub fn new(sample_rate: f32) -> Self {
        let mut ctx = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            sample_rate,
            frame: 0,
            plan: None,
            destination: NodeId(0),
        };
        ctx.destination = ctx.add_node(NodeData::new(
            NodeKind::Destination,
            Vec::new(),
            Processor::Stateless,
        ));
        ctx
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Returns the clock reading in seconds (rendered frames / sample rate).
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Returns the number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frame
    }

    /// Returns the final sink node.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    // --- Node factories ---

    /// Creates a gain node with an initial gain.
    pub fn create_gain(&mut self, gain: f32) -> Result<NodeId, GraphError> {
        let mut param = AudioParam::new(1.0, -UNBOUNDED, UNBOUNDED);
        param.set_value(gain)?;
        Ok(self.add_node(NodeData::new(
            NodeKind::Gain,
            vec![(ParamName::Gain, param)],
            Processor::Stateless,
        )))
    }

    /// Creates a lowpass biquad filter (350 Hz, Q 1).
    pub fn create_biquad_filter(&mut self) -> NodeId {
        let nyquist = self.sample_rate / 2.0;
        self.add_node(NodeData::new(
            NodeKind::BiquadFilter,
            vec![
                (ParamName::Frequency, AudioParam::new(350.0, 0.0, nyquist)),
                (ParamName::Q, AudioParam::new(1.0, 0.0001, 1000.0)),
                (ParamName::Gain, AudioParam::new(0.0, -40.0, 40.0)),
                (ParamName::Detune, AudioParam::new(0.0, -153_600.0, 153_600.0)),
            ],
            Processor::Biquad {
                filter: Biquad::new(),
                filter_type: FilterType::default(),
                tuned: None,
            },
        ))
    }

    /// Creates a delay node holding up to `max_delay_secs` seconds.
    pub fn create_delay(&mut self, max_delay_secs: f32) -> Result<NodeId, GraphError> {
        if !(max_delay_secs > 0.0 && max_delay_secs <= MAX_DELAY_SECS) {
            return Err(GraphError::InvalidDelayTime(max_delay_secs));
        }
        let line = DelayLine::from_time(self.sample_rate, max_delay_secs);
        Ok(self.add_node(NodeData::new(
            NodeKind::Delay,
            vec![(
                ParamName::DelayTime,
                AudioParam::new(0.0, 0.0, max_delay_secs),
            )],
            Processor::Delay(line),
        )))
    }

    /// Creates a convolver with no impulse response.
    pub fn create_convolver(&mut self) -> NodeId {
        self.add_node(NodeData::new(
            NodeKind::Convolver,
            Vec::new(),
            Processor::Convolver(Convolver::new()),
        ))
    }

    /// Creates a passthrough wave shaper.
    pub fn create_wave_shaper(&mut self) -> NodeId {
        self.add_node(NodeData::new(
            NodeKind::WaveShaper,
            Vec::new(),
            Processor::WaveShaper(WaveShaper::new()),
        ))
    }

    /// Creates an unstarted 440 Hz sine oscillator.
    pub fn create_oscillator(&mut self) -> NodeId {
        let nyquist = self.sample_rate / 2.0;
        self.add_node(NodeData::new(
            NodeKind::Oscillator,
            vec![
                (ParamName::Frequency, AudioParam::new(440.0, -nyquist, nyquist)),
                (ParamName::Detune, AudioParam::new(0.0, -153_600.0, 153_600.0)),
            ],
            Processor::Oscillator(Oscillator::new()),
        ))
    }

    /// Creates a compressor with the standard defaults.
    pub fn create_dynamics_compressor(&mut self) -> NodeId {
        self.add_node(NodeData::new(
            NodeKind::DynamicsCompressor,
            vec![
                (ParamName::Threshold, AudioParam::new(-24.0, -100.0, 0.0)),
                (ParamName::Knee, AudioParam::new(30.0, 0.0, 40.0)),
                (ParamName::Ratio, AudioParam::new(12.0, 1.0, 20.0)),
                (ParamName::Attack, AudioParam::new(0.003, 0.0, 1.0)),
                (ParamName::Release, AudioParam::new(0.25, 0.0, 1.0)),
            ],
            Processor::Compressor(DynamicsCompressor::new()),
        ))
    }

    /// Creates an unstarted source playing `buffer`.
    pub fn create_buffer_source(&mut self, buffer: AudioBuffer) -> Result<NodeId, GraphError> {
        self.check_rate(&buffer)?;
        Ok(self.add_node(NodeData::new(
            NodeKind::BufferSource,
            Vec::new(),
            Processor::BufferSource(BufferSource::new(Some(buffer))),
        )))
    }

    /// Creates an unstarted source emitting `offset`.
    pub fn create_constant_source(&mut self, offset: f32) -> Result<NodeId, GraphError> {
        let mut param = AudioParam::new(1.0, -UNBOUNDED, UNBOUNDED);
        param.set_value(offset)?;
        Ok(self.add_node(NodeData::new(
            NodeKind::ConstantSource,
            vec![(ParamName::Offset, param)],
            Processor::ConstantSource(ConstantSource::new()),
        )))
    }

    // --- Topology ---

    /// Connects `from`'s output to `to`'s input.
    ///
    /// Returns the new edge's ID, or an error if:
    /// - Either node doesn't exist
    /// - A duplicate edge already exists
    /// - The connection is structurally invalid (into a source, out of the
    ///   destination, or a self-loop)
    /// - The edge would close a cycle that passes through no delay node
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        self.validate_connection(from, to)?;

        if self.find_edge(from, to).is_some() {
            return Err(GraphError::DuplicateEdge(from, to));
        }

        // A cycle exists if `to` can already reach `from`; edges into delay
        // nodes break cycles.
        if self.reaches_without_delay(to, from) {
            return Err(GraphError::CycleDetected(from, to));
        }

        let edge_id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge { from, to }));

        if let Some(node) = self.node_mut(from) {
            node.outgoing.push(edge_id);
        }
        if let Some(node) = self.node_mut(to) {
            node.incoming.push(edge_id);
        }
        self.plan = None;

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {from} → {to}");
        Ok(edge_id)
    }

    /// Removes every outgoing edge of `node`. Returns how many were removed.
    pub fn disconnect(&mut self, node: NodeId) -> Result<usize, GraphError> {
        let outgoing = self.get_node(node)?.outgoing.clone();
        for &edge_id in &outgoing {
            self.disconnect_internal(edge_id);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: {node} ({} edges)", outgoing.len());
        Ok(outgoing.len())
    }

    /// Removes the edge from `from` to `to`.
    pub fn disconnect_from(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.get_node(from)?;
        self.get_node(to)?;
        let edge_id = self
            .find_edge(from, to)
            .ok_or(GraphError::NotConnected(from, to))?;
        self.disconnect_internal(edge_id);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: {from} → {to}");
        Ok(())
    }

    /// Removes an edge by ID.
    pub fn disconnect_edge(&mut self, id: EdgeId) -> Result<(), GraphError> {
        if !self.contains_edge(id) {
            return Err(GraphError::EdgeNotFound(id));
        }
        self.disconnect_internal(id);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: edge {id}");
        Ok(())
    }

    /// Removes a node and all its connected edges.
    ///
    /// The destination cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if id == self.destination {
            return Err(GraphError::InvalidConnection(
                "the destination cannot be removed".to_string(),
            ));
        }
        let node = self.get_node(id)?;
        let edge_ids: Vec<EdgeId> = node
            .incoming
            .iter()
            .chain(node.outgoing.iter())
            .copied()
            .collect();

        for edge_id in edge_ids {
            self.disconnect_internal(edge_id);
        }

        self.nodes[id.0 as usize] = None;
        self.plan = None;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: node {id}");
        Ok(())
    }

    /// Finds the edge connecting `from` to `to`, if one exists.
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        let node = self.node(from)?;
        node.outgoing
            .iter()
            .copied()
            .find(|edge_id| self.edge(*edge_id).is_some_and(|e| e.to == to))
    }

    /// Returns `true` if an edge runs from `from` to `to`.
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.find_edge(from, to).is_some()
    }

    /// Returns `true` if the edge still exists.
    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge(id).is_some()
    }

    /// Returns the endpoints of an edge.
    pub fn edge_endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.edge(id).map(|e| (e.from, e.to))
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Returns the node's kind.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    /// Number of outgoing edges (0 for unknown nodes).
    pub fn outgoing_count(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.outgoing.len())
    }

    /// Number of incoming edges (0 for unknown nodes).
    pub fn incoming_count(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.incoming.len())
    }

    /// Targets of the node's outgoing edges, in connection order.
    pub fn outgoing_targets(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map_or_else(Vec::new, |n| {
            n.outgoing
                .iter()
                .filter_map(|e| self.edge(*e).map(|edge| edge.to))
                .collect()
        })
    }

    /// Number of live nodes, including the destination.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    // --- Parameters ---

    /// Returns a node parameter.
    pub fn param(&self, node: NodeId, name: ParamName) -> Result<&AudioParam, GraphError> {
        let data = self.get_node(node)?;
        data.param(name).ok_or(GraphError::NoSuchParam {
            node,
            kind: data.kind,
            param: name,
        })
    }

    /// Returns a node parameter for scheduling automation.
    pub fn param_mut(
        &mut self,
        node: NodeId,
        name: ParamName,
    ) -> Result<&mut AudioParam, GraphError> {
        let data = self.get_node_mut(node)?;
        let kind = data.kind;
        data.param_mut(name).ok_or(GraphError::NoSuchParam {
            node,
            kind,
            param: name,
        })
    }

    /// Returns a parameter's intrinsic value.
    pub fn param_value(&self, node: NodeId, name: ParamName) -> Result<f32, GraphError> {
        Ok(self.param(node, name)?.value())
    }

    /// Assigns a parameter's intrinsic value.
    ///
    /// On a parameter with scheduled automation the value is also scheduled
    /// at the current time, so it takes effect immediately either way.
    pub fn set_param_value(
        &mut self,
        node: NodeId,
        name: ParamName,
        value: f32,
    ) -> Result<(), GraphError> {
        let now = self.current_time();
        let param = self.param_mut(node, name)?;
        param.set_value(value)?;
        if param.has_automation() {
            param.set_value_at_time(value, now)?;
        }
        Ok(())
    }

    /// Returns a parameter's computed value at `time`.
    pub fn param_value_at(
        &self,
        node: NodeId,
        name: ParamName,
        time: f64,
    ) -> Result<f32, GraphError> {
        Ok(self.param(node, name)?.value_at(time))
    }

    // --- Node-specific state ---

    /// Returns a biquad filter's type.
    pub fn filter_type(&self, node: NodeId) -> Result<FilterType, GraphError> {
        let data = self.get_node(node)?;
        match &data.processor {
            Processor::Biquad { filter_type, .. } => Ok(*filter_type),
            _ => Err(wrong_kind(node, "biquad filter", data.kind)),
        }
    }

    /// Sets a biquad filter's type.
    pub fn set_filter_type(&mut self, node: NodeId, kind: FilterType) -> Result<(), GraphError> {
        let data = self.get_node_mut(node)?;
        match &mut data.processor {
            Processor::Biquad { filter_type, .. } => {
                *filter_type = kind;
                Ok(())
            }
            _ => Err(wrong_kind(node, "biquad filter", data.kind)),
        }
    }

    /// Returns a wave shaper's curve.
    pub fn curve(&self, node: NodeId) -> Result<Option<&[f32]>, GraphError> {
        let data = self.get_node(node)?;
        match &data.processor {
            Processor::WaveShaper(shaper) => Ok(shaper.curve()),
            _ => Err(wrong_kind(node, "wave shaper", data.kind)),
        }
    }

    /// Replaces a wave shaper's curve; `None` restores passthrough.
    pub fn set_curve(&mut self, node: NodeId, curve: Option<Vec<f32>>) -> Result<(), GraphError> {
        let data = self.get_node_mut(node)?;
        match &mut data.processor {
            Processor::WaveShaper(shaper) => {
                shaper.set_curve(curve);
                Ok(())
            }
            _ => Err(wrong_kind(node, "wave shaper", data.kind)),
        }
    }

    /// Returns a wave shaper's oversampling mode.
    pub fn oversample(&self, node: NodeId) -> Result<OverSample, GraphError> {
        let data = self.get_node(node)?;
        match &data.processor {
            Processor::WaveShaper(shaper) => Ok(shaper.oversample()),
            _ => Err(wrong_kind(node, "wave shaper", data.kind)),
        }
    }

    /// Sets a wave shaper's oversampling mode.
    pub fn set_oversample(
        &mut self,
        node: NodeId,
        oversample: OverSample,
    ) -> Result<(), GraphError> {
        let data = self.get_node_mut(node)?;
        match &mut data.processor {
            Processor::WaveShaper(shaper) => {
                shaper.set_oversample(oversample);
                Ok(())
            }
            _ => Err(wrong_kind(node, "wave shaper", data.kind)),
        }
    }

    /// Returns the buffer of a convolver or buffer source.
    pub fn buffer(&self, node: NodeId) -> Result<Option<&AudioBuffer>, GraphError> {
        let data = self.get_node(node)?;
        match &data.processor {
            Processor::Convolver(conv) => Ok(conv.buffer()),
            Processor::BufferSource(src) => Ok(src.buffer()),
            _ => Err(wrong_kind(node, "convolver or buffer source", data.kind)),
        }
    }

    /// Assigns the buffer of a convolver or buffer source.
    ///
    /// A convolver accepts exactly one buffer in its lifetime; swapping an
    /// impulse response means building a new convolver.
    pub fn set_buffer(&mut self, node: NodeId, buffer: AudioBuffer) -> Result<(), GraphError> {
        self.check_rate(&buffer)?;
        let data = self.get_node_mut(node)?;
        match &mut data.processor {
            Processor::Convolver(conv) => {
                if conv.buffer().is_some() {
                    return Err(GraphError::BufferReassigned(node));
                }
                conv.set_buffer(buffer);
                Ok(())
            }
            Processor::BufferSource(src) => {
                src.set_buffer(buffer);
                Ok(())
            }
            _ => Err(wrong_kind(node, "convolver or buffer source", data.kind)),
        }
    }

    /// Enables or disables looping on a buffer source.
    pub fn set_loop(&mut self, node: NodeId, looping: bool) -> Result<(), GraphError> {
        let data = self.get_node_mut(node)?;
        match &mut data.processor {
            Processor::BufferSource(src) => {
                src.set_looping(looping);
                Ok(())
            }
            _ => Err(wrong_kind(node, "buffer source", data.kind)),
        }
    }

    /// Returns an oscillator's waveform.
    pub fn waveform(&self, node: NodeId) -> Result<Waveform, GraphError> {
        let data = self.get_node(node)?;
        match &data.processor {
            Processor::Oscillator(osc) => Ok(osc.waveform()),
            _ => Err(wrong_kind(node, "oscillator", data.kind)),
        }
    }

    /// Sets an oscillator's waveform.
    pub fn set_waveform(&mut self, node: NodeId, waveform: Waveform) -> Result<(), GraphError> {
        let data = self.get_node_mut(node)?;
        match &mut data.processor {
            Processor::Oscillator(osc) => {
                osc.set_waveform(waveform);
                Ok(())
            }
            _ => Err(wrong_kind(node, "oscillator", data.kind)),
        }
    }

    /// Schedules a source node to start sounding at `when` seconds.
    pub fn start(&mut self, node: NodeId, when: f64) -> Result<(), GraphError> {
        check_time(when)?;
        let data = self.get_node_mut(node)?;
        let kind = data.kind;
        match data.processor.playback_mut() {
            Some(playback) => {
                playback.set_start(when);
                Ok(())
            }
            None => Err(wrong_kind(node, "source", kind)),
        }
    }

    /// Schedules a source node to fall silent at `when` seconds.
    pub fn stop(&mut self, node: NodeId, when: f64) -> Result<(), GraphError> {
        check_time(when)?;
        let data = self.get_node_mut(node)?;
        let kind = data.kind;
        match data.processor.playback_mut() {
            Some(playback) => {
                playback.set_stop(when);
                Ok(())
            }
            None => Err(wrong_kind(node, "source", kind)),
        }
    }

    /// Returns a source node's start/stop window.
    pub fn playback(&self, node: NodeId) -> Result<Playback, GraphError> {
        let data = self.get_node(node)?;
        data.processor
            .playback()
            .copied()
            .ok_or(wrong_kind(node, "source", data.kind))
    }

    /// Returns a compressor's current gain reduction in dB.
    pub fn compressor_reduction(&self, node: NodeId) -> Result<f32, GraphError> {
        let data = self.get_node(node)?;
        match &data.processor {
            Processor::Compressor(comp) => Ok(comp.reduction()),
            _ => Err(wrong_kind(node, "dynamics compressor", data.kind)),
        }
    }

    // --- Internal helpers ---

    fn add_node(&mut self, node: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: {} node {id}", node.kind);
        self.nodes.push(Some(node));
        self.plan = None;
        id
    }

    pub(super) fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0 as usize).and_then(|n| n.as_mut())
    }

    pub(super) fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0 as usize).and_then(|e| e.as_ref())
    }

    fn get_node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.node(id).ok_or(GraphError::NodeNotFound(id))
    }

    fn get_node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, GraphError> {
        self.node_mut(id).ok_or(GraphError::NodeNotFound(id))
    }

    fn check_rate(&self, buffer: &AudioBuffer) -> Result<(), GraphError> {
        if buffer.sample_rate() != self.sample_rate {
            return Err(GraphError::SampleRateMismatch {
                buffer: buffer.sample_rate(),
                context: self.sample_rate,
            });
        }
        Ok(())
    }

    /// Validates structural constraints for a connection.
    fn validate_connection(&self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        let from_node = self.get_node(from)?;
        let to_node = self.get_node(to)?;

        if from == to {
            return Err(GraphError::InvalidConnection(format!(
                "cannot connect {from} to itself"
            )));
        }
        if from_node.kind == NodeKind::Destination {
            return Err(GraphError::InvalidConnection(format!(
                "cannot connect from the destination {from}→{to}"
            )));
        }
        if to_node.kind.is_source() {
            return Err(GraphError::InvalidConnection(format!(
                "{} node {to} accepts no input",
                to_node.kind
            )));
        }
        Ok(())
    }

    /// DFS reachability from `from` to `to`, not following edges into delay
    /// nodes.
    fn reaches_without_delay(&self, from: NodeId, to: NodeId) -> bool {
        if self.kind(from) == Some(NodeKind::Delay) {
            // the new edge itself ends in a delay
            return false;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.0 as usize;
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            if let Some(node) = self.node(current) {
                for edge_id in &node.outgoing {
                    if let Some(edge) = self.edge(*edge_id)
                        && self.kind(edge.to) != Some(NodeKind::Delay)
                    {
                        stack.push(edge.to);
                    }
                }
            }
        }
        false
    }

    /// Disconnects an edge without error checking.
    fn disconnect_internal(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };
        if let Some(node) = self.node_mut(edge.from) {
            node.outgoing.retain(|e| *e != id);
        }
        if let Some(node) = self.node_mut(edge.to) {
            node.incoming.retain(|e| *e != id);
        }
        self.plan = None;
    }
}

fn wrong_kind(node: NodeId, expected: &'static str, actual: NodeKind) -> GraphError {
    GraphError::WrongNodeKind {
        node,
        expected,
        actual,
    }
}

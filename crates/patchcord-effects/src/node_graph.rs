//! The private node topology an effect owns.

use std::collections::BTreeMap;

use patchcord_core::{AudioContext, EdgeId, GraphError, NodeId};

/// A connection an effect made on behalf of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// The external node on the other end.
    pub node: NodeId,
    /// The edge that was opened.
    pub edge: EdgeId,
}

/// An effect's nodes and its two external attachment points.
///
/// - The **main** node is the only node exposed downstream: `output` and
///   `connect` always start from it.
/// - The **entry** node is where an upstream source attaches via `input`.
///   For single-node effects it is the main node itself.
/// - Named internal nodes are everything else the effect built.
///
/// Assigning a new input or output closes the edge recorded for the previous
/// one first, so re-patching an effect never leaves a stale connection
/// behind.
#[derive(Debug, Clone)]
pub struct NodeGraph {
    main: NodeId,
    entry: NodeId,
    nodes: BTreeMap<&'static str, NodeId>,
    input: Option<Attachment>,
    output: Option<Attachment>,
}

impl NodeGraph {
    /// Creates a graph around `main`, with `entry` as the input point.
    pub fn new(main: NodeId, entry: NodeId) -> Self {
        Self {
            main,
            entry,
            nodes: BTreeMap::new(),
            input: None,
            output: None,
        }
    }

    /// Creates a graph whose single node is both main and entry.
    pub fn single(node: NodeId) -> Self {
        Self::new(node, node)
    }

    /// Adds a named internal node.
    pub fn with_node(mut self, name: &'static str, node: NodeId) -> Self {
        self.nodes.insert(name, node);
        self
    }

    /// Registers or replaces a named internal node, returning the old one.
    pub fn insert(&mut self, name: &'static str, node: NodeId) -> Option<NodeId> {
        self.nodes.insert(name, node)
    }

    /// Returns the main node.
    pub fn main(&self) -> NodeId {
        self.main
    }

    /// Returns the entry node.
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the internal node registered under `name`.
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    /// Iterates over the internal nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = (&'static str, NodeId)> + '_ {
        self.nodes.iter().map(|(&name, &id)| (name, id))
    }

    /// Returns the source currently attached as input.
    pub fn input(&self) -> Option<NodeId> {
        self.input.map(|a| a.node)
    }

    /// Returns the sink currently attached as output.
    pub fn output(&self) -> Option<NodeId> {
        self.output.map(|a| a.node)
    }

    /// Returns the recorded input connection.
    pub fn input_attachment(&self) -> Option<Attachment> {
        self.input
    }

    /// Returns the recorded output connection.
    pub fn output_attachment(&self) -> Option<Attachment> {
        self.output
    }

    /// Connects `source` into the entry node, replacing any previous input.
    pub fn attach_input(
        &mut self,
        ctx: &mut AudioContext,
        source: NodeId,
    ) -> Result<EdgeId, GraphError> {
        let entry = self.entry;
        attach_edge(ctx, &mut self.input, source, source, entry)
    }

    /// Connects the main node into `sink`, replacing any previous output.
    pub fn attach_output(
        &mut self,
        ctx: &mut AudioContext,
        sink: NodeId,
    ) -> Result<EdgeId, GraphError> {
        let main = self.main;
        attach_edge(ctx, &mut self.output, sink, main, sink)
    }

    /// Closes the recorded input connection, returning the old source.
    pub fn detach_input(&mut self, ctx: &mut AudioContext) -> Result<Option<NodeId>, GraphError> {
        match self.input.take() {
            Some(current) => {
                close(ctx, current.edge)?;
                Ok(Some(current.node))
            }
            None => Ok(None),
        }
    }

    /// Closes the recorded output connection, returning the old sink.
    pub fn detach_output(&mut self, ctx: &mut AudioContext) -> Result<Option<NodeId>, GraphError> {
        match self.output.take() {
            Some(current) => {
                close(ctx, current.edge)?;
                Ok(Some(current.node))
            }
            None => Ok(None),
        }
    }

    /// Severs every outward edge of the main node, the recorded output
    /// included.
    pub fn disconnect_main(&mut self, ctx: &mut AudioContext) -> Result<usize, GraphError> {
        let removed = ctx.disconnect(self.main)?;
        self.output = None;
        Ok(removed)
    }

    /// Severs every outward edge of every named internal node.
    pub fn disconnect_internal(&mut self, ctx: &mut AudioContext) -> Result<usize, GraphError> {
        let mut removed = 0;
        for &node in self.nodes.values() {
            if node != self.main {
                removed += ctx.disconnect(node)?;
            }
        }
        Ok(removed)
    }

    /// Full teardown: closes the input, then disconnects the main node and
    /// every internal node.
    pub fn teardown(&mut self, ctx: &mut AudioContext) -> Result<(), GraphError> {
        self.detach_input(ctx)?;
        self.disconnect_main(ctx)?;
        self.disconnect_internal(ctx)?;
        Ok(())
    }
}

/// Records `from -> to` in `slot`, closing whatever the slot held before.
fn attach_edge(
    ctx: &mut AudioContext,
    slot: &mut Option<Attachment>,
    external: NodeId,
    from: NodeId,
    to: NodeId,
) -> Result<EdgeId, GraphError> {
    if let Some(current) = *slot {
        if current.node == external && ctx.contains_edge(current.edge) {
            return Ok(current.edge);
        }
        close(ctx, current.edge)?;
        *slot = None;
    }

    let edge = match ctx.find_edge(from, to) {
        Some(edge) => edge,
        None => ctx.connect(from, to)?,
    };
    *slot = Some(Attachment {
        node: external,
        edge,
    });
    Ok(edge)
}

/// Closes an edge that may already be gone.
fn close(ctx: &mut AudioContext, edge: EdgeId) -> Result<(), GraphError> {
    match ctx.disconnect_edge(edge) {
        Ok(()) | Err(GraphError::EdgeNotFound(_)) => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(ctx: &mut AudioContext) -> NodeGraph {
        let pre = ctx.create_gain(1.0).unwrap();
        let main = ctx.create_gain(0.5).unwrap();
        ctx.connect(pre, main).unwrap();
        NodeGraph::new(main, pre).with_node("pre", pre)
    }

    #[test]
    fn test_input_attaches_to_entry() {
        let mut ctx = AudioContext::new(48000.0);
        let mut graph = pair(&mut ctx);
        let src = ctx.create_oscillator();

        graph.attach_input(&mut ctx, src).unwrap();
        assert!(ctx.is_connected(src, graph.entry()));
        assert!(!ctx.is_connected(src, graph.main()));
        assert_eq!(graph.input(), Some(src));
    }

    #[test]
    fn test_reassigning_input_closes_previous_edge() {
        let mut ctx = AudioContext::new(48000.0);
        let mut graph = pair(&mut ctx);
        let a = ctx.create_oscillator();
        let b = ctx.create_oscillator();

        graph.attach_input(&mut ctx, a).unwrap();
        graph.attach_input(&mut ctx, b).unwrap();
        assert!(!ctx.is_connected(a, graph.entry()));
        assert!(ctx.is_connected(b, graph.entry()));
        assert_eq!(ctx.incoming_count(graph.entry()), 1);
    }

    #[test]
    fn test_reattaching_same_output_is_noop() {
        let mut ctx = AudioContext::new(48000.0);
        let mut graph = pair(&mut ctx);
        let dest = ctx.destination();

        let first = graph.attach_output(&mut ctx, dest).unwrap();
        let second = graph.attach_output(&mut ctx, dest).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.outgoing_count(graph.main()), 1);
    }

    #[test]
    fn test_output_survives_external_disconnect() {
        let mut ctx = AudioContext::new(48000.0);
        let mut graph = pair(&mut ctx);
        let a = ctx.create_gain(1.0).unwrap();
        let b = ctx.create_gain(1.0).unwrap();

        graph.attach_output(&mut ctx, a).unwrap();
        ctx.disconnect(graph.main()).unwrap();
        graph.attach_output(&mut ctx, b).unwrap();
        assert!(ctx.is_connected(graph.main(), b));
        assert_eq!(graph.output(), Some(b));
    }

    #[test]
    fn test_teardown_leaves_no_outward_edges() {
        let mut ctx = AudioContext::new(48000.0);
        let mut graph = pair(&mut ctx);
        let src = ctx.create_oscillator();
        let dest = ctx.destination();
        graph.attach_input(&mut ctx, src).unwrap();
        graph.attach_output(&mut ctx, dest).unwrap();

        graph.teardown(&mut ctx).unwrap();
        assert_eq!(ctx.outgoing_count(graph.main()), 0);
        assert_eq!(ctx.outgoing_count(graph.entry()), 0);
        assert_eq!(ctx.outgoing_count(src), 0);
        assert_eq!(graph.input(), None);
        assert_eq!(graph.output(), None);
    }

    #[test]
    fn test_insert_replaces_named_node() {
        let mut ctx = AudioContext::new(48000.0);
        let mut graph = pair(&mut ctx);
        let old = graph.node("pre").unwrap();
        let fresh = ctx.create_gain(1.0).unwrap();
        assert_eq!(graph.insert("pre", fresh), Some(old));
        assert_eq!(graph.node("pre"), Some(fresh));
        assert_eq!(graph.nodes().count(), 1);
    }
}

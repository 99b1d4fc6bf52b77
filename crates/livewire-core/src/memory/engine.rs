//! Topology-only engine that mirrors a real-time host's mutation rules.

use std::collections::BTreeMap;

use thiserror::Error;

use super::node::{MemoryNode, NodeKind};
use crate::engine::AudioEngine;
use crate::format::SignalFormat;
use crate::node::{AudioNode, Bus, ConnectionPoint, EngineId, NodeId};

/// Errors raised by [`MemoryEngine`] primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The node is not attached to this engine.
    #[error("{0} is not attached to this engine")]
    NotAttached(NodeId),
    /// The node already belongs to another engine.
    #[error("{node} is already attached to {engine}")]
    AttachedElsewhere {
        /// The node being attached.
        node: NodeId,
        /// Its current engine.
        engine: EngineId,
    },
    /// The destination cannot receive audio.
    #[error("{0} has no inputs")]
    NoInputs(NodeId),
    /// The input slot does not exist and cannot be created here.
    #[error("bus {bus} out of range on {node} ({inputs} inputs)")]
    BusOutOfRange {
        /// The destination node.
        node: NodeId,
        /// Requested slot.
        bus: Bus,
        /// Current input count.
        inputs: usize,
    },
    /// Every node has exactly one output port.
    #[error("{node} has a single output, bus {bus} requested")]
    OutputOutOfRange {
        /// The source node.
        node: NodeId,
        /// Requested output port.
        bus: Bus,
    },
    /// The format cannot be negotiated.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(SignalFormat),
    /// Starting requires at least one attached node.
    #[error("cannot start: no nodes attached")]
    NothingAttached,
}

/// Live-mutation defects emulated by [`MemoryEngine`].
///
/// Both are on by default, matching the hosts this crate targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// While running, bulk connects reject slots at or beyond a mixer's
    /// input count instead of growing it.
    pub strict_bulk_inputs: bool,
    /// While running, wiring the output of a mixer with no inputs makes it
    /// silently drop every later inbound edge until the engine stops.
    pub deaf_empty_mixers: bool,
}

impl Quirks {
    /// A well-behaved engine.
    pub const fn none() -> Self {
        Self {
            strict_bulk_inputs: false,
            deaf_empty_mixers: false,
        }
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            strict_bulk_inputs: true,
            deaf_empty_mixers: true,
        }
    }
}

/// A directed edge held by [`MemoryEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Source node.
    pub source: NodeId,
    /// Source output port.
    pub from_bus: Bus,
    /// Destination node.
    pub destination: NodeId,
    /// Destination input slot.
    pub to_bus: Bus,
    /// Negotiated format.
    pub format: SignalFormat,
}

struct Slot {
    node: MemoryNode,
    inputs: usize,
    deaf: bool,
}

/// In-process [`AudioEngine`] that tracks attachment and edges only.
///
/// Useful for planning a topology offline and for exercising the guard: it
/// reproduces the running-engine defects described on [`Quirks`].
pub struct MemoryEngine {
    id: EngineId,
    running: bool,
    quirks: Quirks,
    nodes: BTreeMap<NodeId, Slot>,
    edges: Vec<Edge>,
    placeholders_created: usize,
}

impl MemoryEngine {
    /// Creates a stopped engine with default [`Quirks`].
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    /// Creates a stopped engine with the given quirks.
    pub fn with_quirks(quirks: Quirks) -> Self {
        Self {
            id: EngineId::fresh(),
            running: false,
            quirks,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            placeholders_created: 0,
        }
    }

    /// Emulated defects.
    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Every edge, in creation order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether `node` is attached to this engine.
    pub fn is_attached(&self, node: &MemoryNode) -> bool {
        self.nodes.contains_key(&node.id())
    }

    /// Number of attached nodes.
    pub fn attached_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total placeholders handed out by [`create_placeholder()`](AudioEngine::create_placeholder).
    pub fn placeholders_created(&self) -> usize {
        self.placeholders_created
    }

    fn slot(&self, node: &MemoryNode) -> Result<&Slot, EngineError> {
        self.nodes
            .get(&node.id())
            .ok_or(EngineError::NotAttached(node.id()))
    }

    fn has_inbound(&self, id: NodeId) -> bool {
        self.edges.iter().any(|e| e.destination == id)
    }

    fn is_deaf(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|s| s.deaf)
    }

    fn check_source(&self, source: &MemoryNode, from_bus: Bus) -> Result<(), EngineError> {
        self.slot(source)?;
        if from_bus != 0 {
            return Err(EngineError::OutputOutOfRange {
                node: source.id(),
                bus: from_bus,
            });
        }
        Ok(())
    }

    /// Validates a destination slot. `may_grow` says whether a missing slot
    /// would be created by the calling primitive.
    fn check_destination(
        &self,
        destination: &MemoryNode,
        bus: Bus,
        may_grow: bool,
    ) -> Result<(), EngineError> {
        let slot = self.slot(destination)?;
        if slot.node.kind() == NodeKind::Source {
            return Err(EngineError::NoInputs(destination.id()));
        }
        if bus >= slot.inputs && !(may_grow && destination.has_growable_inputs()) {
            return Err(EngineError::BusOutOfRange {
                node: destination.id(),
                bus,
                inputs: slot.inputs,
            });
        }
        Ok(())
    }

    fn mark_deaf_if_empty(&mut self, source: NodeId) {
        if !self.running || !self.quirks.deaf_empty_mixers || self.has_inbound(source) {
            return;
        }
        if let Some(slot) = self.nodes.get_mut(&source)
            && slot.node.kind() == NodeKind::Mixer
            && !slot.deaf
        {
            slot.deaf = true;
            tracing::debug!(node = %source, "mixer output wired with no inputs, inbound edges will drop");
        }
    }

    fn grow(&mut self, id: NodeId, bus: Bus) {
        if let Some(slot) = self.nodes.get_mut(&id)
            && bus >= slot.inputs
        {
            slot.inputs = bus + 1;
        }
    }

    fn insert_edge(&mut self, edge: Edge) {
        self.edges
            .retain(|e| !(e.destination == edge.destination && e.to_bus == edge.to_bus));
        tracing::trace!(
            source = %edge.source,
            destination = %edge.destination,
            to_bus = edge.to_bus,
            "edge added"
        );
        self.edges.push(edge);
    }

    fn point(&self, id: NodeId, bus: Bus) -> Option<ConnectionPoint<MemoryNode>> {
        self.nodes
            .get(&id)
            .map(|slot| ConnectionPoint::new(slot.node.clone(), bus))
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryEngine {
    fn drop(&mut self) {
        for slot in self.nodes.values() {
            slot.node.bind(None);
        }
    }
}

impl core::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("id", &self.id)
            .field("running", &self.running)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges)
            .finish()
    }
}

impl AudioEngine for MemoryEngine {
    type Node = MemoryNode;
    type Error = EngineError;

    fn id(&self) -> EngineId {
        self.id
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn attach(&mut self, node: &MemoryNode) -> Result<(), EngineError> {
        match node.engine() {
            Some(engine) if engine == self.id => Ok(()),
            Some(engine) => Err(EngineError::AttachedElsewhere {
                node: node.id(),
                engine,
            }),
            None => {
                self.nodes.insert(
                    node.id(),
                    Slot {
                        node: node.clone(),
                        inputs: node.initial_inputs(),
                        deaf: false,
                    },
                );
                node.bind(Some(self.id));
                tracing::trace!(node = %node.id(), engine = %self.id, "attached");
                Ok(())
            }
        }
    }

    fn detach(&mut self, node: &MemoryNode) -> Result<(), EngineError> {
        let id = node.id();
        if self.nodes.remove(&id).is_none() {
            return Err(EngineError::NotAttached(id));
        }
        self.edges.retain(|e| e.source != id && e.destination != id);
        node.bind(None);
        tracing::trace!(node = %id, engine = %self.id, "detached");
        Ok(())
    }

    fn create_placeholder(&mut self) -> MemoryNode {
        self.placeholders_created += 1;
        MemoryNode::source()
    }

    fn number_of_inputs(&self, node: &MemoryNode) -> usize {
        self.nodes.get(&node.id()).map_or(0, |slot| slot.inputs)
    }

    fn next_available_input_bus(&self, node: &MemoryNode) -> Bus {
        let id = node.id();
        let inputs = self.number_of_inputs(node);
        (0..inputs)
            .find(|&bus| {
                !self
                    .edges
                    .iter()
                    .any(|e| e.destination == id && e.to_bus == bus)
            })
            .unwrap_or(inputs)
    }

    fn connect(
        &mut self,
        source: &MemoryNode,
        destination: &MemoryNode,
        from_bus: Bus,
        to_bus: Bus,
        format: SignalFormat,
    ) -> Result<(), EngineError> {
        if !format.is_valid() {
            return Err(EngineError::UnsupportedFormat(format));
        }
        self.check_source(source, from_bus)?;
        self.check_destination(destination, to_bus, true)?;

        if self.is_deaf(destination.id()) {
            tracing::trace!(destination = %destination.id(), "edge dropped by deaf mixer");
            return Ok(());
        }

        self.mark_deaf_if_empty(source.id());
        self.grow(destination.id(), to_bus);
        let source_id = source.id();
        self.edges
            .retain(|e| !(e.source == source_id && e.from_bus == from_bus));
        self.insert_edge(Edge {
            source: source_id,
            from_bus,
            destination: destination.id(),
            to_bus,
            format,
        });
        Ok(())
    }

    fn connect_points(
        &mut self,
        source: &MemoryNode,
        points: &[ConnectionPoint<MemoryNode>],
        from_bus: Bus,
        format: SignalFormat,
    ) -> Result<(), EngineError> {
        if !format.is_valid() {
            return Err(EngineError::UnsupportedFormat(format));
        }
        self.check_source(source, from_bus)?;
        let may_grow = !(self.running && self.quirks.strict_bulk_inputs);
        for point in points {
            self.check_destination(&point.node, point.bus, may_grow)?;
        }

        self.mark_deaf_if_empty(source.id());
        let source_id = source.id();
        self.edges
            .retain(|e| !(e.source == source_id && e.from_bus == from_bus));
        for point in points {
            let destination = point.node.id();
            if self.is_deaf(destination) {
                tracing::trace!(%destination, "edge dropped by deaf mixer");
                continue;
            }
            self.grow(destination, point.bus);
            self.insert_edge(Edge {
                source: source_id,
                from_bus,
                destination,
                to_bus: point.bus,
                format,
            });
        }
        Ok(())
    }

    fn disconnect_output(&mut self, node: &MemoryNode) {
        let id = node.id();
        let before = self.edges.len();
        self.edges.retain(|e| e.source != id);
        tracing::trace!(node = %id, removed = before - self.edges.len(), "output disconnected");
    }

    fn output_connection_points(
        &self,
        node: &MemoryNode,
        bus: Bus,
    ) -> Vec<ConnectionPoint<MemoryNode>> {
        let id = node.id();
        self.edges
            .iter()
            .filter(|e| e.source == id && e.from_bus == bus)
            .filter_map(|e| self.point(e.destination, e.to_bus))
            .collect()
    }

    fn input_connection_point(
        &self,
        node: &MemoryNode,
        bus: Bus,
    ) -> Option<ConnectionPoint<MemoryNode>> {
        let id = node.id();
        self.edges
            .iter()
            .find(|e| e.destination == id && e.to_bus == bus)
            .and_then(|e| self.point(e.source, e.from_bus))
    }

    fn start(&mut self) -> Result<(), EngineError> {
        if self.nodes.is_empty() {
            return Err(EngineError::NothingAttached);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        for slot in self.nodes.values_mut() {
            slot.deaf = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: SignalFormat = SignalFormat::standard(44_100, 2);

    fn attached(engine: &mut MemoryEngine, node: MemoryNode) -> MemoryNode {
        engine.attach(&node).unwrap();
        node
    }

    #[test]
    fn attach_is_idempotent_and_exclusive() {
        let mut a = MemoryEngine::new();
        let mut b = MemoryEngine::new();
        let node = MemoryNode::effect();

        a.attach(&node).unwrap();
        a.attach(&node).unwrap();
        assert_eq!(a.attached_count(), 1);
        assert_eq!(node.engine(), Some(a.id()));
        assert!(matches!(
            b.attach(&node),
            Err(EngineError::AttachedElsewhere { .. })
        ));
    }

    #[test]
    fn single_connect_grows_mixer() {
        let mut engine = MemoryEngine::new();
        let src = attached(&mut engine, MemoryNode::source());
        let mixer = attached(&mut engine, MemoryNode::mixer());
        engine.start().unwrap();

        engine.connect(&src, &mixer, 0, 3, FORMAT).unwrap();
        assert_eq!(engine.number_of_inputs(&mixer), 4);
        assert_eq!(engine.next_available_input_bus(&mixer), 0);
    }

    #[test]
    fn bulk_connect_rejects_missing_slot_while_running() {
        let mut engine = MemoryEngine::new();
        let src = attached(&mut engine, MemoryNode::source());
        let fx = attached(&mut engine, MemoryNode::effect());
        let mixer = attached(&mut engine, MemoryNode::mixer());
        engine.start().unwrap();

        let points = [
            ConnectionPoint::new(fx.clone(), 0),
            ConnectionPoint::new(mixer.clone(), 1),
        ];
        let err = engine.connect_points(&src, &points, 0, FORMAT).unwrap_err();
        assert_eq!(
            err,
            EngineError::BusOutOfRange {
                node: mixer.id(),
                bus: 1,
                inputs: 0
            }
        );
        assert_eq!(engine.edge_count(), 0, "rejection leaves no partial edges");
    }

    #[test]
    fn bulk_connect_grows_while_stopped() {
        let mut engine = MemoryEngine::new();
        let src = attached(&mut engine, MemoryNode::source());
        let mixer = attached(&mut engine, MemoryNode::mixer());

        engine
            .connect_points(&src, &[ConnectionPoint::new(mixer.clone(), 2)], 0, FORMAT)
            .unwrap();
        assert_eq!(engine.number_of_inputs(&mixer), 3);
    }

    #[test]
    fn bulk_connect_replaces_outbound_set() {
        let mut engine = MemoryEngine::new();
        let src = attached(&mut engine, MemoryNode::source());
        let a = attached(&mut engine, MemoryNode::effect());
        let b = attached(&mut engine, MemoryNode::effect());

        engine
            .connect_points(&src, &[ConnectionPoint::new(a.clone(), 0)], 0, FORMAT)
            .unwrap();
        engine
            .connect_points(&src, &[ConnectionPoint::new(b.clone(), 0)], 0, FORMAT)
            .unwrap();

        let outputs = engine.output_connection_points(&src, 0);
        assert_eq!(outputs, vec![ConnectionPoint::new(b, 0)]);
        assert!(engine.input_connection_point(&a, 0).is_none());
    }

    #[test]
    fn slot_holds_one_edge() {
        let mut engine = MemoryEngine::new();
        let first = attached(&mut engine, MemoryNode::source());
        let second = attached(&mut engine, MemoryNode::source());
        let fx = attached(&mut engine, MemoryNode::effect());

        engine.connect(&first, &fx, 0, 0, FORMAT).unwrap();
        engine.connect(&second, &fx, 0, 0, FORMAT).unwrap();

        assert_eq!(engine.edge_count(), 1);
        let feeder = engine.input_connection_point(&fx, 0).unwrap();
        assert_eq!(feeder.node, second);
    }

    #[test]
    fn empty_mixer_goes_deaf_while_running() {
        let mut engine = MemoryEngine::new();
        let src = attached(&mut engine, MemoryNode::source());
        let mixer = attached(&mut engine, MemoryNode::mixer());
        let out = attached(&mut engine, MemoryNode::effect());
        engine.start().unwrap();

        engine.connect(&mixer, &out, 0, 0, FORMAT).unwrap();
        engine.connect(&src, &mixer, 0, 0, FORMAT).unwrap();
        assert!(!engine.has_inputs(&mixer), "inbound edge silently dropped");

        engine.stop();
        engine.connect(&src, &mixer, 0, 0, FORMAT).unwrap();
        assert!(engine.has_inputs(&mixer));
    }

    #[test]
    fn quirks_can_be_disabled() {
        assert_eq!(MemoryEngine::new().quirks(), Quirks::default());
        let mut engine = MemoryEngine::with_quirks(Quirks::none());
        assert!(!engine.quirks().strict_bulk_inputs);
        let src = attached(&mut engine, MemoryNode::source());
        let mixer = attached(&mut engine, MemoryNode::mixer());
        let out = attached(&mut engine, MemoryNode::effect());
        engine.start().unwrap();

        engine.connect(&mixer, &out, 0, 0, FORMAT).unwrap();
        engine
            .connect_points(&src, &[ConnectionPoint::new(mixer.clone(), 5)], 0, FORMAT)
            .unwrap();
        assert_eq!(engine.number_of_inputs(&mixer), 6);
        assert!(engine.has_inputs(&mixer));
    }

    #[test]
    fn rejects_invalid_targets() {
        let mut engine = MemoryEngine::new();
        let src = attached(&mut engine, MemoryNode::source());
        let other = attached(&mut engine, MemoryNode::source());
        let fx = attached(&mut engine, MemoryNode::effect());
        let stray = MemoryNode::effect();

        assert_eq!(
            engine.connect(&src, &other, 0, 0, FORMAT),
            Err(EngineError::NoInputs(other.id()))
        );
        assert!(matches!(
            engine.connect(&src, &fx, 0, 1, FORMAT),
            Err(EngineError::BusOutOfRange { bus: 1, .. })
        ));
        assert!(matches!(
            engine.connect(&src, &fx, 1, 0, FORMAT),
            Err(EngineError::OutputOutOfRange { bus: 1, .. })
        ));
        assert_eq!(
            engine.connect(&src, &stray, 0, 0, FORMAT),
            Err(EngineError::NotAttached(stray.id()))
        );
        let mono_zero = SignalFormat::standard(44_100, 0);
        assert_eq!(
            engine.connect(&src, &fx, 0, 0, mono_zero),
            Err(EngineError::UnsupportedFormat(mono_zero))
        );
    }

    #[test]
    fn detach_breaks_edges_and_unbinds() {
        let mut engine = MemoryEngine::new();
        let src = attached(&mut engine, MemoryNode::source());
        let fx = attached(&mut engine, MemoryNode::effect());
        engine.connect(&src, &fx, 0, 0, FORMAT).unwrap();

        engine.detach(&fx).unwrap();
        assert_eq!(engine.edge_count(), 0);
        assert_eq!(fx.engine(), None);
        assert_eq!(engine.detach(&fx), Err(EngineError::NotAttached(fx.id())));
    }

    #[test]
    fn start_requires_attached_nodes() {
        let mut engine = MemoryEngine::new();
        assert_eq!(engine.start(), Err(EngineError::NothingAttached));
        assert!(!engine.is_running());
    }

    #[test]
    fn dropping_engine_releases_nodes() {
        let node = MemoryNode::mixer();
        {
            let mut engine = MemoryEngine::new();
            engine.attach(&node).unwrap();
            assert!(node.engine().is_some());
        }
        assert_eq!(node.engine(), None);
    }
}

//! The engine capability consumed by the guard.
//!
//! [`AudioEngine`] is the boundary to the host: it owns attachment, edges,
//! and the running state. Implementations are expected to behave like a
//! real-time engine, including its rough edges when the graph is mutated
//! while running:
//!
//! - [`connect()`](AudioEngine::connect) grows a mixer's input count when the
//!   requested slot does not exist yet.
//! - [`connect_points()`](AudioEngine::connect_points) does not grow anything
//!   and may reject slots beyond the current input count while running.
//!
//! The [`guard`](crate::guard) functions exist to paper over exactly those
//! differences.

use crate::format::SignalFormat;
use crate::node::{AudioNode, Bus, ConnectionPoint, EngineId};

/// A live (or stopped) container of nodes and directed edges.
///
/// All mutation takes `&mut self`, so topology changes are serialized by the
/// borrow checker. Implementations may still drive a real-time render thread
/// internally.
pub trait AudioEngine {
    /// Node handle type.
    type Node: AudioNode;
    /// Error produced by the engine's own primitives.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Identity of this engine instance.
    fn id(&self) -> EngineId;

    /// Whether the engine is currently rendering.
    fn is_running(&self) -> bool;

    /// Attaches `node`. Attaching a node already attached here is a no-op.
    fn attach(&mut self, node: &Self::Node) -> Result<(), Self::Error>;

    /// Breaks every edge touching `node` and detaches it.
    fn detach(&mut self, node: &Self::Node) -> Result<(), Self::Error>;

    /// Creates a fresh, unattached source node for temporary wiring.
    fn create_placeholder(&mut self) -> Self::Node;

    /// Current number of input slots on `node` (0 if unattached).
    fn number_of_inputs(&self, node: &Self::Node) -> usize;

    /// Lowest input slot on `node` with no edge; may equal the input count.
    fn next_available_input_bus(&self, node: &Self::Node) -> Bus;

    /// Connects one output port to one input slot.
    ///
    /// Grows a mixer's input count when `to_bus` is beyond it.
    fn connect(
        &mut self,
        source: &Self::Node,
        destination: &Self::Node,
        from_bus: Bus,
        to_bus: Bus,
        format: SignalFormat,
    ) -> Result<(), Self::Error>;

    /// Replaces every outbound edge on `from_bus` of `source` with edges to
    /// `points`.
    ///
    /// Does not grow mixer inputs.
    fn connect_points(
        &mut self,
        source: &Self::Node,
        points: &[ConnectionPoint<Self::Node>],
        from_bus: Bus,
        format: SignalFormat,
    ) -> Result<(), Self::Error>;

    /// Removes every outbound edge of `node`.
    fn disconnect_output(&mut self, node: &Self::Node);

    /// Destinations currently fed by `node`'s output port `bus`.
    fn output_connection_points(
        &self,
        node: &Self::Node,
        bus: Bus,
    ) -> Vec<ConnectionPoint<Self::Node>>;

    /// The source feeding `node`'s input slot `bus`, if any.
    fn input_connection_point(
        &self,
        node: &Self::Node,
        bus: Bus,
    ) -> Option<ConnectionPoint<Self::Node>>;

    /// Starts rendering.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Stops rendering.
    fn stop(&mut self);

    /// Whether any input slot of `node` is populated.
    fn has_inputs(&self, node: &Self::Node) -> bool {
        (0..self.number_of_inputs(node)).any(|bus| self.input_connection_point(node, bus).is_some())
    }

    /// Every populated input slot of `node`, in slot order.
    fn input_connection_points(&self, node: &Self::Node) -> Vec<ConnectionPoint<Self::Node>> {
        (0..self.number_of_inputs(node))
            .filter_map(|bus| self.input_connection_point(node, bus))
            .collect()
    }
}

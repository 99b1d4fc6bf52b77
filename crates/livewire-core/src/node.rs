//! Node handles, identities, and connection points.
//!
//! A node is an opaque processing unit owned by the host engine. This layer
//! only needs three things from it: a stable identity, the engine it is
//! currently attached to, and whether its input count can grow (mixers).
//! Everything else is asked of the [`AudioEngine`](crate::AudioEngine).

use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};

/// Index of an input slot or output port on a node.
pub type Bus = usize;

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(0);
static NEXT_ENGINE_ID: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a node.
///
/// Ids from [`fresh()`](Self::fresh) are process-unique and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Wraps a raw id supplied by an engine binding.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Allocates a new process-unique id.
    pub fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Unique identifier for an engine instance. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineId(NonZeroU32);

impl EngineId {
    /// Wraps a raw id supplied by an engine binding. Returns `None` for zero.
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Allocates a new process-unique id.
    pub fn fresh() -> Self {
        let raw = NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MIN))
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl core::fmt::Display for EngineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EngineId({})", self.0)
    }
}

/// A handle to a node living in (or destined for) an audio engine.
///
/// Handles are cheap to clone and compare by [`id()`](Self::id).
pub trait AudioNode: Clone + core::fmt::Debug {
    /// Stable identity of the node.
    fn id(&self) -> NodeId;

    /// The engine this node is attached to, or `None` if unattached.
    fn engine(&self) -> Option<EngineId>;

    /// Whether the node's input count grows on demand (mixer-type nodes).
    fn has_growable_inputs(&self) -> bool;
}

/// One end of an existing edge: a node and one of its buses.
#[derive(Clone, Debug)]
pub struct ConnectionPoint<N> {
    /// The node on this end of the edge.
    pub node: N,
    /// The input slot (for destinations) or output port (for sources).
    pub bus: Bus,
}

impl<N> ConnectionPoint<N> {
    /// Creates a connection point.
    pub fn new(node: N, bus: Bus) -> Self {
        Self { node, bus }
    }
}

impl<N: AudioNode> PartialEq for ConnectionPoint<N> {
    fn eq(&self, other: &Self) -> bool {
        self.node.id() == other.node.id() && self.bus == other.bus
    }
}

impl<N: AudioNode> Eq for ConnectionPoint<N> {}

/// A requested fan-out target.
///
/// The node may be missing (for example a lookup that found nothing); such
/// entries are skipped by [`guard::connect_points`](crate::guard::connect_points)
/// instead of failing the whole request.
#[derive(Clone, Debug)]
pub struct Destination<N> {
    /// Target node, if it resolved.
    pub node: Option<N>,
    /// Target input slot.
    pub bus: Bus,
}

impl<N> Destination<N> {
    /// Targets `bus` on `node`.
    pub fn to(node: N, bus: Bus) -> Self {
        Self {
            node: Some(node),
            bus,
        }
    }

    /// A target whose node did not resolve.
    pub fn unresolved(bus: Bus) -> Self {
        Self { node: None, bus }
    }

    /// Converts into a [`ConnectionPoint`] if the node is present.
    pub fn resolve(self) -> Option<ConnectionPoint<N>> {
        self.node.map(|node| ConnectionPoint::new(node, self.bus))
    }
}

impl<N> From<ConnectionPoint<N>> for Destination<N> {
    fn from(point: ConnectionPoint<N>) -> Self {
        Self::to(point.node, point.bus)
    }
}

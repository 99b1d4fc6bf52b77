//! Node handles for the in-memory engine.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::node::{AudioNode, EngineId, NodeId};

/// The role of a node, which fixes its input slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Produces audio, has no inputs (players, generators, placeholders).
    Source,
    /// Processes one input.
    Effect,
    /// Sums any number of inputs; the input count grows on demand.
    Mixer,
}

struct NodeCell {
    id: NodeId,
    kind: NodeKind,
    initial_inputs: usize,
    /// Raw [`EngineId`], 0 while unattached.
    engine: AtomicU32,
}

/// Shared handle to a node usable with [`MemoryEngine`](super::MemoryEngine).
///
/// Clones refer to the same node. The attachment is stored on the node so a
/// handle can tell which engine owns it without asking any engine.
#[derive(Clone)]
pub struct MemoryNode {
    cell: Arc<NodeCell>,
}

impl MemoryNode {
    fn with_kind(kind: NodeKind, initial_inputs: usize) -> Self {
        Self {
            cell: Arc::new(NodeCell {
                id: NodeId::fresh(),
                kind,
                initial_inputs,
                engine: AtomicU32::new(0),
            }),
        }
    }

    /// A source node (no inputs).
    pub fn source() -> Self {
        Self::with_kind(NodeKind::Source, 0)
    }

    /// A single-input effect node.
    pub fn effect() -> Self {
        Self::with_kind(NodeKind::Effect, 1)
    }

    /// A mixer that starts with no input slots.
    pub fn mixer() -> Self {
        Self::with_kind(NodeKind::Mixer, 0)
    }

    /// A mixer that starts with `inputs` input slots.
    pub fn mixer_with_inputs(inputs: usize) -> Self {
        Self::with_kind(NodeKind::Mixer, inputs)
    }

    /// The node's role.
    pub fn kind(&self) -> NodeKind {
        self.cell.kind
    }

    /// Input slots the node declares before any growth.
    pub fn initial_inputs(&self) -> usize {
        self.cell.initial_inputs
    }

    pub(super) fn bind(&self, engine: Option<EngineId>) {
        self.cell
            .engine
            .store(engine.map_or(0, EngineId::get), Ordering::Release);
    }
}

impl AudioNode for MemoryNode {
    fn id(&self) -> NodeId {
        self.cell.id
    }

    fn engine(&self) -> Option<EngineId> {
        EngineId::new(self.cell.engine.load(Ordering::Acquire))
    }

    fn has_growable_inputs(&self) -> bool {
        self.cell.kind == NodeKind::Mixer
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        self.cell.id == other.cell.id
    }
}

impl Eq for MemoryNode {}

impl core::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryNode")
            .field("id", &self.cell.id)
            .field("kind", &self.cell.kind)
            .field("engine", &self.engine())
            .finish()
    }
}

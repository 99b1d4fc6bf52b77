//! In-memory reference engine.
//!
//! [`MemoryEngine`] implements [`AudioEngine`](crate::AudioEngine) without
//! rendering any audio. It keeps attachment, input counts, and edges, and it
//! reproduces the two live-mutation defects the [`guard`](crate::guard)
//! works around (see [`Quirks`]). Handy for offline topology planning and
//! for tests that need to observe what the guard actually did.
//!
//! ```rust
//! use livewire_core::memory::{MemoryEngine, MemoryNode};
//! use livewire_core::{AudioEngine, SignalFormat, guard};
//!
//! let mut engine = MemoryEngine::new();
//! let player = MemoryNode::source();
//! let mixer = MemoryNode::mixer();
//! engine.attach(&mixer).unwrap();
//! engine.start().unwrap();
//!
//! guard::connect(&mut engine, &player, &mixer, 0, 0, SignalFormat::default()).unwrap();
//! assert_eq!(engine.edge_count(), 1);
//! ```

mod engine;
mod node;

pub use engine::{Edge, EngineError, MemoryEngine, Quirks};
pub use node::{MemoryNode, NodeKind};

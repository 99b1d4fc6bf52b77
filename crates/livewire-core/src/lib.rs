//! Livewire Core - safe topology mutation for running audio engines
//!
//! Real-time audio engines let you attach nodes and wire edges while they
//! render, but not every primitive behaves the same once the engine is
//! running. This crate wraps edge insertion and removal so the running case
//! works like the stopped one.
//!
//! # Core Abstractions
//!
//! - [`AudioEngine`] - the host engine capability (attach, connect, query)
//! - [`AudioNode`] - node handles with identity, attachment, and the mixer flag
//! - [`guard`] - guarded connect/disconnect over any [`AudioEngine`]
//! - [`Patchbay`] - an owned engine plus [`WiringConfig`] defaults, with
//!   slot inference and a fluent [`Chain`]
//! - [`memory::MemoryEngine`] - topology-only reference engine
//!
//! # Example
//!
//! ```rust
//! use livewire_core::memory::{MemoryEngine, MemoryNode};
//! use livewire_core::{AudioEngine, Patchbay};
//!
//! let mut bay: Patchbay<MemoryEngine> = Patchbay::default();
//! let main = MemoryNode::mixer();
//! bay.attach(&main)?;
//! bay.start();
//!
//! // Wire into slot 3 of an empty mixer while running.
//! let player = MemoryNode::source();
//! bay.connect_to_bus(&player, &main, 3)?;
//! assert_eq!(bay.engine().number_of_inputs(&main), 4);
//! assert_eq!(bay.engine().attached_count(), 2);
//! # Ok::<(), livewire_core::GuardError<livewire_core::memory::EngineError>>(())
//! ```
//!
//! # Threading
//!
//! Topology mutation is single-writer: every mutating call takes `&mut`.
//! Node handles may be created anywhere.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod guard;
pub mod memory;
pub mod node;
pub mod patchbay;

pub use config::WiringConfig;
pub use engine::AudioEngine;
pub use error::{ConfigError, GuardError};
pub use format::SignalFormat;
pub use guard::GuardResult;
pub use node::{AudioNode, Bus, ConnectionPoint, Destination, EngineId, NodeId};
pub use patchbay::{Chain, Patchbay};

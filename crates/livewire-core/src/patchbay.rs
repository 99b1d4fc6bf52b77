//! Owned engine plus wiring defaults, with a fluent connection API.
//!
//! [`Patchbay`] is the convenience layer over [`guard`](crate::guard): it
//! owns one engine and a [`WiringConfig`], infers input slots for mixers,
//! and appends edges instead of replacing them.
//!
//! ```rust
//! use livewire_core::memory::{MemoryEngine, MemoryNode};
//! use livewire_core::Patchbay;
//!
//! let mut bay: Patchbay<MemoryEngine> = Patchbay::default();
//! let synth = MemoryNode::source();
//! let reverb = MemoryNode::effect();
//! let main = MemoryNode::mixer();
//!
//! bay.chain(&synth).to(&reverb)?.to(&main)?;
//! assert_eq!(bay.engine().edge_count(), 2);
//! # Ok::<(), livewire_core::GuardError<livewire_core::memory::EngineError>>(())
//! ```

use crate::config::WiringConfig;
use crate::engine::AudioEngine;
use crate::error::GuardError;
use crate::guard::{self, GuardResult};
use crate::node::{AudioNode, Bus, ConnectionPoint, Destination};

/// One engine and the defaults used to wire it.
///
/// Every mutation takes `&mut self`; share a patchbay across threads behind
/// a single mutex or a single-writer queue.
#[derive(Debug)]
pub struct Patchbay<E: AudioEngine> {
    engine: E,
    config: WiringConfig,
}

impl<E: AudioEngine + Default> Default for Patchbay<E> {
    fn default() -> Self {
        Self::new(E::default(), WiringConfig::default())
    }
}

impl<E: AudioEngine> Patchbay<E> {
    /// Wraps `engine` with the given defaults.
    pub fn new(engine: E, config: WiringConfig) -> Self {
        Self { engine, config }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the underlying engine. Mutations made here bypass
    /// the guard.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The wiring defaults.
    pub fn config(&self) -> &WiringConfig {
        &self.config
    }

    /// Replaces the wiring defaults.
    pub fn set_config(&mut self, config: WiringConfig) {
        self.config = config;
    }

    /// Unwraps the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Whether the engine is rendering.
    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Starts the engine. A failure is logged and otherwise ignored.
    pub fn start(&mut self) {
        if let Err(err) = self.engine.start() {
            tracing::error!(engine = %self.engine.id(), %err, "engine failed to start");
        }
    }

    /// Stops the engine.
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Attaches `node` unless it already belongs to this engine.
    ///
    /// A node attached to another engine is rejected with
    /// [`GuardError::ForeignNode`].
    pub fn attach(&mut self, node: &E::Node) -> GuardResult<(), E> {
        self.ensure_local(node)?;
        if node.engine().is_none() {
            self.engine.attach(node).map_err(GuardError::Engine)?;
        }
        Ok(())
    }

    /// The slot a new edge into `node` should use: the next free input of a
    /// mixer, 0 for anything else.
    pub fn next_input(&self, node: &E::Node) -> Bus {
        if node.has_growable_inputs() && node.engine() == Some(self.engine.id()) {
            self.engine.next_available_input_bus(node)
        } else {
            0
        }
    }

    /// Destinations fed by `node` on the default output port.
    pub fn output_connections(&self, node: &E::Node) -> Vec<ConnectionPoint<E::Node>> {
        if node.engine() != Some(self.engine.id()) {
            return Vec::new();
        }
        self.engine
            .output_connection_points(node, self.config.source_bus)
    }

    /// Populated inputs of `node`, in slot order.
    pub fn input_connections(&self, node: &E::Node) -> Vec<ConnectionPoint<E::Node>> {
        if node.engine() != Some(self.engine.id()) {
            return Vec::new();
        }
        self.engine.input_connection_points(node)
    }

    /// Replaces `node`'s outbound edges with `destinations`.
    pub fn set_output_connections(
        &mut self,
        node: &E::Node,
        destinations: &[Destination<E::Node>],
    ) -> GuardResult<(), E> {
        self.ensure_local(node)?;
        for destination in destinations.iter().filter_map(|d| d.node.as_ref()) {
            self.ensure_local(destination)?;
        }
        guard::connect_points(
            &mut self.engine,
            node,
            destinations,
            self.config.source_bus,
            self.config.format,
        )
    }

    /// Wires `node` to `to` through the single-edge path, replacing `node`'s
    /// outbound edges. The slot is inferred when `to_bus` is `None`.
    pub fn set_output(
        &mut self,
        node: &E::Node,
        to: &E::Node,
        to_bus: Option<Bus>,
    ) -> GuardResult<E::Node, E> {
        self.ensure_local(node)?;
        self.ensure_local(to)?;
        let bus = to_bus.unwrap_or_else(|| self.next_input(to));
        guard::connect(
            &mut self.engine,
            node,
            to,
            self.config.source_bus,
            bus,
            self.config.format,
        )?;
        Ok(to.clone())
    }

    /// Adds an edge from `node` to `to`, keeping existing outbound edges.
    ///
    /// Returns `to` so calls can be chained.
    pub fn connect(&mut self, node: &E::Node, to: &E::Node) -> GuardResult<E::Node, E> {
        let bus = self.next_input(to);
        self.connect_to_bus(node, to, bus)
    }

    /// Adds an edge from `node` to slot `bus` of `to`, keeping existing
    /// outbound edges.
    pub fn connect_to_bus(
        &mut self,
        node: &E::Node,
        to: &E::Node,
        bus: Bus,
    ) -> GuardResult<E::Node, E> {
        self.append(node, vec![Destination::to(to.clone(), bus)])?;
        Ok(to.clone())
    }

    /// Adds one edge from `node` to each of `targets`.
    pub fn connect_many(
        &mut self,
        node: &E::Node,
        targets: &[E::Node],
    ) -> GuardResult<Vec<E::Node>, E> {
        let additions = self.plan_slots(targets);
        self.append(node, additions)?;
        Ok(targets.to_vec())
    }

    /// Connects each of `sources` to `into`, each on its own slot.
    pub fn merge(&mut self, sources: &[E::Node], into: &E::Node) -> GuardResult<E::Node, E> {
        for source in sources {
            self.connect(source, into)?;
        }
        Ok(into.clone())
    }

    /// Starts a fluent chain at `node`.
    pub fn chain(&mut self, node: &E::Node) -> Chain<'_, E> {
        Chain {
            bay: self,
            node: node.clone(),
        }
    }

    /// Removes every outbound edge of `node`.
    pub fn disconnect_output(&mut self, node: &E::Node) -> GuardResult<(), E> {
        self.ensure_local(node)?;
        guard::disconnect_output(&mut self.engine, node);
        Ok(())
    }

    /// Removes the edges from `node` into `other`, keeping the rest.
    pub fn disconnect_output_from(
        &mut self,
        node: &E::Node,
        other: &E::Node,
    ) -> GuardResult<(), E> {
        self.ensure_local(node)?;
        self.ensure_local(other)?;
        guard::disconnect_output_from(
            &mut self.engine,
            node,
            other,
            self.config.source_bus,
            self.config.format,
        )
    }

    /// Infers a slot for each target. Repeated mixers get consecutive free
    /// slots rather than the same one.
    fn plan_slots(&self, targets: &[E::Node]) -> Vec<Destination<E::Node>> {
        let mut planned: Vec<Destination<E::Node>> = Vec::with_capacity(targets.len());
        for target in targets {
            let mut bus = self.next_input(target);
            if target.has_growable_inputs() {
                while planned
                    .iter()
                    .any(|d| d.bus == bus && d.node.as_ref().is_some_and(|n| n.id() == target.id()))
                    || self.slot_taken(target, bus)
                {
                    bus += 1;
                }
            }
            planned.push(Destination::to(target.clone(), bus));
        }
        planned
    }

    fn slot_taken(&self, node: &E::Node, bus: Bus) -> bool {
        node.engine() == Some(self.engine.id())
            && self.engine.input_connection_point(node, bus).is_some()
    }

    fn append(
        &mut self,
        node: &E::Node,
        additions: Vec<Destination<E::Node>>,
    ) -> GuardResult<(), E> {
        let mut destinations: Vec<Destination<E::Node>> = self
            .output_connections(node)
            .into_iter()
            .map(Destination::from)
            .collect();
        destinations.extend(additions);
        self.set_output_connections(node, &destinations)
    }

    fn ensure_local(&self, node: &E::Node) -> GuardResult<(), E> {
        match node.engine() {
            Some(attached) if attached != self.engine.id() => Err(GuardError::ForeignNode {
                node: node.id(),
                attached,
                expected: self.engine.id(),
            }),
            _ => Ok(()),
        }
    }
}

/// A position in a fluent wiring chain, created by [`Patchbay::chain`].
pub struct Chain<'a, E: AudioEngine> {
    bay: &'a mut Patchbay<E>,
    node: E::Node,
}

impl<'a, E: AudioEngine> Chain<'a, E> {
    /// Connects the current node to `next` and moves the chain to `next`.
    pub fn to(self, next: &E::Node) -> GuardResult<Chain<'a, E>, E> {
        let node = self.bay.connect(&self.node, next)?;
        Ok(Chain {
            bay: self.bay,
            node,
        })
    }

    /// Connects the current node to every node in `targets`, ending the chain.
    pub fn fan_out(self, targets: &[E::Node]) -> GuardResult<Vec<E::Node>, E> {
        self.bay.connect_many(&self.node, targets)
    }

    /// The node the chain is positioned at.
    pub fn node(&self) -> &E::Node {
        &self.node
    }

    /// Ends the chain, returning its current node.
    pub fn into_node(self) -> E::Node {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SignalFormat;
    use crate::memory::{EngineError, MemoryEngine, MemoryNode};

    fn bay() -> Patchbay<MemoryEngine> {
        Patchbay::default()
    }

    #[test]
    fn next_input_only_advances_for_mixers() {
        let mut bay = bay();
        let mixer = MemoryNode::mixer();
        let fx = MemoryNode::effect();
        let a = MemoryNode::source();
        assert_eq!(bay.next_input(&mixer), 0);

        bay.connect(&a, &mixer).unwrap();
        assert_eq!(bay.next_input(&mixer), 1);
        assert_eq!(bay.next_input(&fx), 0);
    }

    #[test]
    fn connect_appends_to_existing_outputs() {
        let mut bay = bay();
        let src = MemoryNode::source();
        let a = MemoryNode::effect();
        let b = MemoryNode::effect();

        bay.connect(&src, &a).unwrap();
        bay.connect(&src, &b).unwrap();

        let outputs = bay.output_connections(&src);
        assert_eq!(
            outputs,
            vec![ConnectionPoint::new(a, 0), ConnectionPoint::new(b, 0)]
        );
    }

    #[test]
    fn set_output_replaces_existing_outputs() {
        let mut bay = bay();
        let src = MemoryNode::source();
        let a = MemoryNode::effect();
        let b = MemoryNode::effect();

        bay.connect(&src, &a).unwrap();
        let returned = bay.set_output(&src, &b, None).unwrap();

        assert_eq!(returned, b);
        assert_eq!(bay.output_connections(&src), vec![ConnectionPoint::new(b, 0)]);
    }

    #[test]
    fn connect_many_spreads_over_mixer_slots() {
        let mut bay = bay();
        let src = MemoryNode::source();
        let mixer = MemoryNode::mixer();
        bay.start_with(&src);

        bay.connect_many(&src, &[mixer.clone(), mixer.clone()]).unwrap();

        let inputs = bay.input_connections(&mixer);
        assert_eq!(inputs.len(), 2);
        assert_eq!(bay.engine().number_of_inputs(&mixer), 2);
    }

    #[test]
    fn merge_feeds_one_destination() {
        let mut bay = bay();
        let sources = [MemoryNode::source(), MemoryNode::source(), MemoryNode::source()];
        let mixer = MemoryNode::mixer();

        bay.merge(&sources, &mixer).unwrap();

        let feeders: Vec<_> = bay
            .input_connections(&mixer)
            .into_iter()
            .map(|p| p.node)
            .collect();
        assert_eq!(feeders, sources.to_vec());
    }

    #[test]
    fn chain_walks_forward() {
        let mut bay = bay();
        let synth = MemoryNode::source();
        let fx = MemoryNode::effect();
        let mixer = MemoryNode::mixer();

        let end = bay.chain(&synth).to(&fx).unwrap().to(&mixer).unwrap();
        assert_eq!(end.node(), &mixer);
        assert_eq!(end.into_node(), mixer);
        assert_eq!(bay.engine().edge_count(), 2);
    }

    #[test]
    fn chain_fan_out_ends_at_targets() {
        let mut bay = bay();
        let synth = MemoryNode::source();
        let left = MemoryNode::effect();
        let right = MemoryNode::effect();

        let targets = bay
            .chain(&synth)
            .fan_out(&[left.clone(), right.clone()])
            .unwrap();
        assert_eq!(targets, vec![left, right]);
        assert_eq!(bay.output_connections(&synth).len(), 2);
    }

    #[test]
    fn foreign_nodes_are_rejected_untouched() {
        let mut other = MemoryEngine::new();
        let stranger = MemoryNode::source();
        other.attach(&stranger).unwrap();

        let mut bay = bay();
        let fx = MemoryNode::effect();
        let err = bay.connect(&stranger, &fx).unwrap_err();

        assert!(matches!(err, GuardError::ForeignNode { .. }));
        assert_eq!(stranger.engine(), Some(other.id()));
        assert_eq!(bay.engine().attached_count(), 0);
    }

    #[test]
    fn foreign_nodes_cannot_be_attached_or_disconnected() {
        let mut first = bay();
        let src = MemoryNode::source();
        let fx = MemoryNode::effect();
        first.connect(&src, &fx).unwrap();

        let mut second = bay();
        let foreign = |result: GuardResult<(), MemoryEngine>| {
            matches!(result, Err(GuardError::ForeignNode { .. }))
        };
        assert!(foreign(second.attach(&src)));
        assert!(foreign(second.disconnect_output(&src)));
        assert!(foreign(second.disconnect_output_from(&src, &fx)));
        assert!(foreign(second.disconnect_output_from(&MemoryNode::source(), &fx)));

        assert_eq!(first.engine().edge_count(), 1);
        assert_eq!(second.engine().attached_count(), 0);
        assert_eq!(src.engine(), Some(first.engine().id()));
    }

    #[test]
    fn start_failure_is_not_fatal() {
        let mut bay = bay();
        bay.start();
        assert!(!bay.is_running());

        bay.attach(&MemoryNode::mixer()).unwrap();
        bay.start();
        assert!(bay.is_running());
        bay.stop();
        assert!(!bay.is_running());
    }

    #[test]
    fn disconnect_from_removes_only_that_target() {
        let mut bay = bay();
        let src = MemoryNode::source();
        let a = MemoryNode::effect();
        let b = MemoryNode::effect();
        bay.connect_many(&src, &[a.clone(), b.clone()]).unwrap();

        bay.disconnect_output_from(&src, &a).unwrap();
        assert_eq!(bay.output_connections(&src), vec![ConnectionPoint::new(b, 0)]);

        bay.disconnect_output(&src).unwrap();
        assert!(bay.output_connections(&src).is_empty());
    }

    #[test]
    fn config_format_reaches_edges() {
        let format = SignalFormat::standard(48_000, 1);
        let mut bay = Patchbay::new(
            MemoryEngine::new(),
            WiringConfig::default().with_format(format),
        );
        let src = MemoryNode::source();
        let fx = MemoryNode::effect();
        bay.connect(&src, &fx).unwrap();

        assert_eq!(bay.engine().edges()[0].format, format);

        let mono = SignalFormat::standard(96_000, 1);
        bay.set_config(WiringConfig::default().with_format(mono));
        assert_eq!(bay.config().format, mono);
        let other = MemoryNode::effect();
        bay.connect(&src, &other).unwrap();
        assert!(bay.engine().edges().iter().all(|e| e.format == mono));
    }

    #[test]
    fn engine_errors_pass_through() {
        let mut bay = bay();
        let src = MemoryNode::source();
        let fx = MemoryNode::effect();
        let err = bay.connect_to_bus(&src, &fx, 3).unwrap_err();
        assert!(matches!(
            err,
            GuardError::Engine(EngineError::BusOutOfRange { bus: 3, .. })
        ));
    }

    impl Patchbay<MemoryEngine> {
        fn start_with(&mut self, node: &MemoryNode) {
            self.attach(node).unwrap();
            self.start();
            assert!(self.is_running());
        }
    }
}

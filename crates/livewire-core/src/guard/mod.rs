//! Guarded edge insertion and removal on a possibly running engine.
//!
//! Every entry point runs the same self-contained sequence and keeps no
//! state between calls:
//!
//! 1. **Attach**: the source and each destination are attached to the
//!    engine unless they already belong to one. Attached nodes are never
//!    moved.
//! 2. **Empty-mixer guard**: if the engine is running and the source is a
//!    mixer with no populated inputs, a placeholder is wired into it first.
//!    A running engine silently drops later inbound edges on a mixer whose
//!    output was wired while it had no inputs.
//! 3. **Input-count guard** (fan-out form only): for each running mixer
//!    destination whose slot does not exist yet, placeholders are wired in
//!    through the auto-growing single-edge primitive until it does, then
//!    released. The bulk primitive cannot grow a mixer itself.
//! 4. **Commit**: the real edge(s) are made, then the step-2 placeholder
//!    is released.
//!
//! Placeholders are owned by a scope that releases them on every exit path,
//! so an engine rejection in step 4 leaves no temporary node behind.
//!
//! Calls must be serialized by the caller; `&mut` access to the engine
//! enforces that within safe code.

mod placeholder;

use tracing::{debug, warn};

use crate::engine::AudioEngine;
use crate::error::GuardError;
use crate::format::SignalFormat;
use crate::node::{AudioNode, Bus, ConnectionPoint, Destination};

use placeholder::PlaceholderScope;

/// Result type of the guard functions.
pub type GuardResult<T, E> = Result<T, GuardError<<E as AudioEngine>::Error>>;

/// Connects `source`'s output port `from_bus` to every destination at once,
/// replacing the port's current outbound edges.
///
/// Destinations without a node are skipped. Mixer destinations whose slot
/// does not exist yet are grown first while the engine is running.
///
/// # Errors
///
/// Engine rejections are returned as [`GuardError::Engine`];
/// [`GuardError::CapacityStalled`] if a mixer stops opening slots.
/// Placeholders are released either way.
pub fn connect_points<E: AudioEngine>(
    engine: &mut E,
    source: &E::Node,
    destinations: &[Destination<E::Node>],
    from_bus: Bus,
    format: SignalFormat,
) -> GuardResult<(), E> {
    let points: Vec<ConnectionPoint<E::Node>> = destinations
        .iter()
        .cloned()
        .filter_map(|destination| {
            let bus = destination.bus;
            let point = destination.resolve();
            if point.is_none() {
                warn!(source = %source.id(), bus, "skipping destination without a node");
            }
            point
        })
        .collect();

    attach_all(
        engine,
        core::iter::once(source).chain(points.iter().map(|p| &p.node)),
    )?;

    let mut scope = PlaceholderScope::new(engine, format);
    feed_empty_mixer(&mut scope, source)?;
    for point in &points {
        grow_inputs(scope.engine_mut(), point, format)?;
    }

    scope
        .engine_mut()
        .connect_points(source, &points, from_bus, format)
        .map_err(GuardError::Engine)?;
    debug!(source = %source.id(), edges = points.len(), "fan-out committed");
    Ok(())
}

/// Connects one output port to one input slot.
///
/// The single-edge primitive grows mixers on its own, so only the
/// empty-mixer guard applies.
///
/// # Errors
///
/// Engine rejections are returned as [`GuardError::Engine`]; placeholders
/// are released either way.
pub fn connect<E: AudioEngine>(
    engine: &mut E,
    source: &E::Node,
    destination: &E::Node,
    from_bus: Bus,
    to_bus: Bus,
    format: SignalFormat,
) -> GuardResult<(), E> {
    attach_all(engine, [source, destination])?;

    let mut scope = PlaceholderScope::new(engine, format);
    feed_empty_mixer(&mut scope, source)?;
    scope
        .engine_mut()
        .connect(source, destination, from_bus, to_bus, format)
        .map_err(GuardError::Engine)?;
    debug!(
        source = %source.id(),
        destination = %destination.id(),
        to_bus,
        "edge committed"
    );
    Ok(())
}

/// Removes every outbound edge of `node`. No-op for unattached nodes.
pub fn disconnect_output<E: AudioEngine>(engine: &mut E, node: &E::Node) {
    if node.engine() == Some(engine.id()) {
        engine.disconnect_output(node);
    }
}

/// Removes the edges from `node`'s output port `from_bus` into `other`,
/// keeping the rest of the port's outbound edges.
///
/// The remaining edges are re-committed through [`connect_points`], so the
/// same guards apply.
///
/// # Errors
///
/// Same as [`connect_points`].
pub fn disconnect_output_from<E: AudioEngine>(
    engine: &mut E,
    node: &E::Node,
    other: &E::Node,
    from_bus: Bus,
    format: SignalFormat,
) -> GuardResult<(), E> {
    if node.engine() != Some(engine.id()) {
        return Ok(());
    }
    let remaining: Vec<Destination<E::Node>> = engine
        .output_connection_points(node, from_bus)
        .into_iter()
        .filter(|point| point.node.id() != other.id())
        .map(Destination::from)
        .collect();
    connect_points(engine, node, &remaining, from_bus, format)
}

fn attach_all<'n, E, I>(engine: &mut E, nodes: I) -> GuardResult<(), E>
where
    E: AudioEngine,
    E::Node: 'n,
    I: IntoIterator<Item = &'n E::Node>,
{
    for node in nodes {
        if node.engine().is_none() {
            engine.attach(node).map_err(GuardError::Engine)?;
        }
    }
    Ok(())
}

fn feed_empty_mixer<E: AudioEngine>(
    scope: &mut PlaceholderScope<'_, E>,
    source: &E::Node,
) -> GuardResult<(), E> {
    let engine = scope.engine();
    if !source.has_growable_inputs() || !engine.is_running() || engine.has_inputs(source) {
        return Ok(());
    }
    scope.feed(source).map_err(GuardError::Engine)?;
    debug!(mixer = %source.id(), "fed empty mixer before wiring its output");
    Ok(())
}

/// Opens slots on a running mixer until `point.bus` exists.
///
/// Each placeholder either fills a free slot or opens a new one, so
/// `point.bus + 1` placeholders always suffice on a conforming engine.
fn grow_inputs<E: AudioEngine>(
    engine: &mut E,
    point: &ConnectionPoint<E::Node>,
    format: SignalFormat,
) -> GuardResult<(), E> {
    let mixer = &point.node;
    if !engine.is_running() || !mixer.has_growable_inputs() {
        return Ok(());
    }
    let before = engine.number_of_inputs(mixer);
    if point.bus < before {
        return Ok(());
    }

    let mut scope = PlaceholderScope::new(engine, format);
    for _ in 0..=point.bus {
        if scope.engine().number_of_inputs(mixer) > point.bus {
            break;
        }
        scope.feed(mixer).map_err(GuardError::Engine)?;
    }

    let inputs = scope.engine().number_of_inputs(mixer);
    if inputs <= point.bus {
        return Err(GuardError::CapacityStalled {
            node: mixer.id(),
            bus: point.bus,
            inputs,
        });
    }
    debug!(
        mixer = %mixer.id(),
        before,
        after = inputs,
        placeholders = scope.len(),
        "grew mixer inputs"
    );
    Ok(())
}

//! Scoped ownership of temporary input nodes.

use crate::engine::AudioEngine;
use crate::format::SignalFormat;
use crate::node::AudioNode;

/// Borrows an engine for the duration of one guard step and owns every
/// placeholder created through it.
///
/// Dropping the scope disconnects and detaches each placeholder, whether the
/// step finished, returned early with `?`, or unwound.
pub(crate) struct PlaceholderScope<'e, E: AudioEngine> {
    engine: &'e mut E,
    format: SignalFormat,
    placeholders: Vec<E::Node>,
}

impl<'e, E: AudioEngine> PlaceholderScope<'e, E> {
    pub(crate) fn new(engine: &'e mut E, format: SignalFormat) -> Self {
        Self {
            engine,
            format,
            placeholders: Vec::new(),
        }
    }

    pub(crate) fn engine(&self) -> &E {
        &*self.engine
    }

    pub(crate) fn engine_mut(&mut self) -> &mut E {
        &mut *self.engine
    }

    pub(crate) fn len(&self) -> usize {
        self.placeholders.len()
    }

    /// Wires a new placeholder into `target`'s next available input slot,
    /// using the single-edge primitive so a mixer opens a slot if needed.
    pub(crate) fn feed(&mut self, target: &E::Node) -> Result<(), E::Error> {
        let placeholder = self.engine.create_placeholder();
        self.engine.attach(&placeholder)?;
        self.placeholders.push(placeholder.clone());

        let bus = self.engine.next_available_input_bus(target);
        self.engine
            .connect(&placeholder, target, 0, bus, self.format)?;
        tracing::trace!(
            placeholder = %placeholder.id(),
            target = %target.id(),
            bus,
            "placeholder wired"
        );
        Ok(())
    }
}

impl<E: AudioEngine> Drop for PlaceholderScope<'_, E> {
    fn drop(&mut self) {
        if self.placeholders.is_empty() {
            return;
        }
        let count = self.placeholders.len();
        for placeholder in self.placeholders.drain(..) {
            self.engine.disconnect_output(&placeholder);
            if let Err(err) = self.engine.detach(&placeholder) {
                tracing::warn!(placeholder = %placeholder.id(), %err, "failed to detach placeholder");
            }
        }
        tracing::debug!(count, "placeholders released");
    }
}

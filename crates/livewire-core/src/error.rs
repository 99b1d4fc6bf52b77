//! Error types for guarded mutations and configuration.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::node::{Bus, EngineId, NodeId};

/// Errors returned by the [`guard`](crate::guard) functions and the
/// [`Patchbay`](crate::Patchbay).
///
/// `E` is the engine's own error type; engine rejections are passed through
/// unmodified in [`GuardError::Engine`].
#[derive(Debug, Error)]
pub enum GuardError<E>
where
    E: std::error::Error + 'static,
{
    /// The engine rejected a primitive (format mismatch, invalid slot, ...).
    #[error("engine rejected the connection: {0}")]
    Engine(#[source] E),

    /// Temporary inputs stopped opening new slots on a mixer.
    #[error("input count of {node} stalled at {inputs}, bus {bus} never became available")]
    CapacityStalled {
        /// The mixer being grown.
        node: NodeId,
        /// The slot the caller asked for.
        bus: Bus,
        /// Input count when growth gave up.
        inputs: usize,
    },

    /// The node is attached to a different engine than the one being mutated.
    #[error("{node} is attached to {attached}, not {expected}")]
    ForeignNode {
        /// The offending node.
        node: NodeId,
        /// Engine the node is attached to.
        attached: EngineId,
        /// Engine the caller is mutating.
        expected: EngineId,
    },
}

impl<E: std::error::Error + 'static> GuardError<E> {
    /// Returns the engine error, if this is a passthrough rejection.
    pub fn engine_error(&self) -> Option<&E> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

/// Failures loading, saving, or validating a [`WiringConfig`](crate::WiringConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The wiring config file could not be opened or read.
    #[error("cannot read wiring config {path}: {source}")]
    ReadFile {
        /// Config file location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The wiring config could not be written to disk.
    #[error("cannot write wiring config {path}: {source}")]
    WriteFile {
        /// Config file location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a well-formed wiring config.
    #[error("malformed wiring config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The in-memory config has no TOML form.
    #[error("wiring config does not serialize: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Default format outside the supported range.
    #[error("invalid default format: {0}")]
    InvalidFormat(String),
}

impl ConfigError {
    pub(crate) fn read_file(path: &Path, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write_file(path: &Path, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.to_path_buf(),
            source,
        }
    }
}

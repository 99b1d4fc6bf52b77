//! Signal format negotiated on every edge.
//!
//! The engine owns the actual conversion; this layer only carries the
//! requested format from the caller (or the [`WiringConfig`](crate::WiringConfig)
//! default) down to the engine's connect primitives.

use serde::{Deserialize, Serialize};

/// Default sample rate for connections made without an explicit format.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default channel count for connections made without an explicit format.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Deinterleaved float format of an edge: sample rate and channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

impl SignalFormat {
    /// Creates a standard (deinterleaved float) format.
    pub const fn standard(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Returns `true` if an engine could negotiate this format at all.
    ///
    /// Engines may still reject a valid format for their own reasons.
    pub const fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }
}

impl Default for SignalFormat {
    fn default() -> Self {
        Self::standard(DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS)
    }
}

impl core::fmt::Display for SignalFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

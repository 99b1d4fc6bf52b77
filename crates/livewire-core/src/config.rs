//! Wiring defaults applied when a caller omits them.
//!
//! A [`WiringConfig`] is owned by each [`Patchbay`](crate::Patchbay) rather
//! than living in process-wide state. It can be built in code or loaded from
//! TOML:
//!
//! ```toml
//! source_bus = 0
//!
//! [format]
//! sample_rate = 48000
//! channels = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::format::SignalFormat;
use crate::node::Bus;

/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8_000;
/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;
/// Highest accepted channel count.
pub const MAX_CHANNELS: u16 = 64;

/// Defaults for connections made through a [`Patchbay`](crate::Patchbay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    /// Format negotiated on new edges.
    pub format: SignalFormat,
    /// Output port used when wiring a node's output.
    pub source_bus: Bus,
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            format: SignalFormat::default(),
            source_bus: 0,
        }
    }
}

impl WiringConfig {
    /// Sets the default format.
    pub fn with_format(mut self, format: SignalFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the default output port.
    pub fn with_source_bus(mut self, bus: Bus) -> Self {
        self.source_bus = bus;
        self
    }

    /// Checks the format against the supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let SignalFormat {
            sample_rate,
            channels,
        } = self.format;
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(ConfigError::InvalidFormat(format!(
                "sample_rate {sample_rate} out of range ({MIN_SAMPLE_RATE}-{MAX_SAMPLE_RATE} Hz)"
            )));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(ConfigError::InvalidFormat(format!(
                "channels {channels} out of range (1-{MAX_CHANNELS})"
            )));
        }
        Ok(())
    }

    /// Parses and validates a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: WiringConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads and validates a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Writes the config to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = WiringConfig::default();
        assert_eq!(config.format, SignalFormat::standard(44_100, 2));
        assert_eq!(config.source_bus, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = WiringConfig::from_toml("source_bus = 1").unwrap();
        assert_eq!(config.source_bus, 1);
        assert_eq!(config.format, SignalFormat::default());
    }

    #[test]
    fn parses_format_table() {
        let config = WiringConfig::from_toml(
            r#"
            [format]
            sample_rate = 48000
            channels = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.format, SignalFormat::standard(48_000, 1));
    }

    #[test]
    fn rejects_out_of_range_rate() {
        let err = WiringConfig::from_toml("[format]\nsample_rate = 1000\nchannels = 2").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(_)));
    }

    #[test]
    fn rejects_zero_channels() {
        let config = WiringConfig::default().with_format(SignalFormat::standard(48_000, 0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            WiringConfig::from_toml("format = 12"),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wiring.toml");
        let config = WiringConfig::default()
            .with_format(SignalFormat::standard(96_000, 2))
            .with_source_bus(0);

        config.save(&path).unwrap();
        assert_eq!(WiringConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let err = WiringConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { path: ref p, .. } if p == &path));
    }
}

//! Process configuration files.

use crate::Result;
use hcalrecon_algorithms::{default_specs, Process, ProducerSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered producers to run, as read from
/// `{"producers": [{"name": ..., "class": ..., "parameters": {...}}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Producers in run order.
    pub producers: Vec<ProducerSpec>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            producers: default_specs(),
        }
    }
}

impl ProcessConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON form.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the producers.
    ///
    /// # Errors
    /// Returns the first invalid producer configuration.
    pub fn build(&self) -> Result<Process> {
        Ok(Process::from_specs(&self.producers)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use hcalrecon_core::ConfigError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"producers": [
                {{"name": "tracks", "class": "HcalTrackProducer", "parameters": {{"MaxTrackCount": 10}}}},
                {{"name": "mip", "class": "HcalMipTriggerProducer"}}
            ]}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = ProcessConfig::from_file(file.path()).unwrap();
        assert_eq!(config.producers.len(), 2);
        assert!(config.producers[1].parameters.is_empty());
        let process = config.build().unwrap();
        let names: Vec<_> = process.producers().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["tracks", "mip"]);
    }

    #[test]
    fn test_default_roundtrip() {
        let config = ProcessConfig::default();
        let parsed = ProcessConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
        assert!(parsed.build().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            ProcessConfig::from_json(r#"{"producers": 3}"#),
            Err(Error::Serde(_))
        ));
        let config = ProcessConfig::from_json(
            r#"{"producers": [{"name": "t", "class": "HcalTrackProducer", "parameters": {"MaxTrackCount": 0}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            config.build(),
            Err(Error::Config(ConfigError::NotPositive { .. }))
        ));
    }
}

//! Supervisor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_str;
use crate::error::ConfigError;
use crate::types::PortMapping;

/// Everything ssc needs to supervise one child process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Listen/destination pairs relayed to the child
    pub mappings: Vec<PortMapping>,

    /// Idle time after the last connection closes before the child is paused
    #[serde(with = "duration_str")]
    pub freeze_delay: Duration,

    /// Connections shorter than this do not restart the full freeze countdown
    #[serde(with = "duration_str")]
    pub nap_duration: Duration,

    /// Attach the child to a pseudo-terminal
    pub interactive: bool,

    /// Program and arguments of the child
    pub command: Vec<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
            freeze_delay: Duration::ZERO,
            nap_duration: Duration::ZERO,
            interactive: false,
            command: Vec::new(),
        }
    }
}

impl SupervisorConfig {
    /// Check that the configuration describes something to supervise
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.command.first() {
            None => Err(ConfigError::MissingField("command".to_string())),
            Some(program) if program.is_empty() => {
                Err(ConfigError::Invalid("command program is empty".to_string()))
            }
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use std::io::Write;

    #[test]
    fn test_default_config_is_invalid_without_command() {
        let config = SupervisorConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField(field)) if field == "command"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let config = SupervisorConfig {
            command: vec![String::new()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
mappings = ["127.0.0.1:9000=127.0.0.1:9100", ":9001=127.0.0.1:9101"]
freeze_delay = "5s"
nap_duration = "2s"
command = ["sleep", "60"]
"#
        )
        .unwrap();

        let config: SupervisorConfig = load_config(file.path()).unwrap();
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[1].listen.port(), 9001);
        assert_eq!(config.freeze_delay, Duration::from_secs(5));
        assert_eq!(config.nap_duration, Duration::from_secs(2));
        assert!(!config.interactive);
        assert_eq!(config.command, vec!["sleep", "60"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_toml_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interactive = true").unwrap();

        let config: SupervisorConfig = load_config(file.path()).unwrap();
        assert!(config.interactive);
        assert!(config.mappings.is_empty());
        assert_eq!(config.freeze_delay, Duration::ZERO);
    }

    #[test]
    fn test_load_rejects_bad_mapping() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"mappings = ["nonsense"]"#).unwrap();

        let result: Result<SupervisorConfig, _> = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let result: Result<SupervisorConfig, _> = load_config(&path);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_toml_roundtrip_keeps_durations_readable() {
        let config = SupervisorConfig {
            mappings: vec!["127.0.0.1:9000=127.0.0.1:9100".parse().unwrap()],
            freeze_delay: Duration::from_millis(1500),
            command: vec!["true".to_string()],
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains(r#"freeze_delay = "1500ms""#));
        assert!(text.contains(r#""127.0.0.1:9000=127.0.0.1:9100""#));
        let parsed: SupervisorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}

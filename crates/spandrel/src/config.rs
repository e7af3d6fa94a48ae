use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use spandrel_context::CorrelationConfig;
use spandrel_status::StatusCheckConfig;

use crate::error::{AgentError, AgentResult};

/// Top-level configuration for the spandrel agent toolkit.
///
/// Loaded from a TOML file (typically `spandrel.toml` next to the host
/// application's own configuration).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Path to the exception registry manifest (JSON). Absent means an
    /// empty registry: exact-name ignore-list matches still apply,
    /// subtype and marker matches never do.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,

    /// Status-check subsystem configuration.
    #[serde(default)]
    pub status_check: StatusCheckConfig,

    /// Correlation subsystem configuration.
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

impl AgentConfig {
    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> AgentResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(AgentError::Io)?;
        let config: AgentConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> AgentResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AgentError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(AgentError::Io)?;
        }
        std::fs::write(path, contents).map_err(AgentError::Io)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AgentResult<()> {
        self.status_check.validate()?;
        if self.correlation.max_entries == 0 {
            return Err(AgentError::Config(
                "correlation.max_entries must be > 0".into(),
            ));
        }
        if self.correlation.max_value_size == 0 {
            return Err(AgentError::Config(
                "correlation.max_value_size must be > 0".into(),
            ));
        }
        if self.correlation.external_injection.enabled {
            if self.correlation.external_injection.key.is_empty() {
                return Err(AgentError::Config(
                    "correlation.external_injection.key must not be empty when enabled".into(),
                ));
            }
            if self.correlation.external_injection.token.is_empty() {
                return Err(AgentError::Config(
                    "correlation.external_injection.token must not be empty when enabled".into(),
                ));
            }
        }
        Ok(())
    }
}

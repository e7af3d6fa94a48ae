use serde::{Deserialize, Serialize};
use spandrel_core::CorrelationKey;

/// Configuration for the correlation subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Comma-separated correlation keys copied onto spans as tags.
    #[serde(default)]
    pub injection_tags: String,

    /// Maximum number of entries a correlation context holds.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Maximum accepted length of a correlation value, in bytes.
    #[serde(default = "default_max_value_size")]
    pub max_value_size: usize,

    #[serde(default)]
    pub external_injection: ExternalInjectionConfig,
}

/// Token gate for correlation injected by a non-tracing upstream: a
/// carrier without a valid trace context is only trusted when it carries
/// `key` holding exactly `token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalInjectionConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_injection_key")]
    pub key: String,

    #[serde(default)]
    pub token: String,
}

fn default_max_entries() -> usize {
    3
}

fn default_max_value_size() -> usize {
    128
}

fn default_injection_key() -> String {
    "injection-mark".to_string()
}

impl Default for ExternalInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            key: default_injection_key(),
            token: String::new(),
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            injection_tags: String::new(),
            max_entries: default_max_entries(),
            max_value_size: default_max_value_size(),
            external_injection: ExternalInjectionConfig::default(),
        }
    }
}

impl CorrelationConfig {
    /// Parse the injection tag list: trimmed, empties skipped, first
    /// occurrence wins, declaration order preserved.
    pub fn injection_tag_keys(&self) -> Vec<CorrelationKey> {
        let mut keys: Vec<CorrelationKey> = Vec::new();
        for raw in self.injection_tags.split(',') {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let key = CorrelationKey::new(trimmed);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

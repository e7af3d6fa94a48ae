use serde::{Deserialize, Serialize};
use spandrel_core::TypeName;

use crate::error::{StatusError, StatusResult};
use crate::rule::StatusPolicy;

/// Configuration for the status-check subsystem.
///
/// Read once at startup (or on hot reload) and baked into an immutable
/// rule set; the live classification path never consults this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCheckConfig {
    /// Active classification policy.
    #[serde(default)]
    pub policy: StatusPolicy,

    /// Comma-separated fully-qualified exception type names exempted by
    /// the hierarchy rule. Whitespace around names is ignored.
    #[serde(default)]
    pub ignored_exceptions: String,

    /// How many links of the cause chain are inspected, root included.
    #[serde(default = "default_max_recursive_depth")]
    pub max_recursive_depth: u32,
}

fn default_max_recursive_depth() -> u32 {
    1
}

impl Default for StatusCheckConfig {
    fn default() -> Self {
        Self {
            policy: StatusPolicy::default(),
            ignored_exceptions: String::new(),
            max_recursive_depth: default_max_recursive_depth(),
        }
    }
}

impl StatusCheckConfig {
    /// Parse the ignore-list: trimmed, empties skipped, first occurrence
    /// wins, declaration order preserved.
    pub fn ignored_exception_names(&self) -> Vec<TypeName> {
        let mut names: Vec<TypeName> = Vec::new();
        for raw in self.ignored_exceptions.split(',') {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let name = TypeName::new(trimmed);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// The depth bound actually applied by the chain walker. A configured
    /// zero degrades to 1: the root is always inspected, its causes never.
    pub fn effective_depth(&self) -> u32 {
        self.max_recursive_depth.max(1)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> StatusResult<()> {
        if self.max_recursive_depth == 0 {
            return Err(StatusError::Validation(
                "max_recursive_depth must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StatusCheckConfig::default();
        assert_eq!(config.policy, StatusPolicy::Off);
        assert!(config.ignored_exceptions.is_empty());
        assert_eq!(config.max_recursive_depth, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ignored_exception_names_parsing() {
        let config = StatusCheckConfig {
            ignored_exceptions: " pkg.A , pkg.B,,pkg.A,  ".into(),
            ..Default::default()
        };
        let names = config.ignored_exception_names();
        assert_eq!(names, vec![TypeName::new("pkg.A"), TypeName::new("pkg.B")]);
    }

    #[test]
    fn test_ignored_exception_names_empty_string() {
        let config = StatusCheckConfig::default();
        assert!(config.ignored_exception_names().is_empty());
    }

    #[test]
    fn test_effective_depth_clamps_zero() {
        let config = StatusCheckConfig {
            max_recursive_depth: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_depth(), 1);
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let config = StatusCheckConfig {
            max_recursive_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: StatusCheckConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.policy, StatusPolicy::Off);
        assert_eq!(config.max_recursive_depth, 1);
    }

    #[test]
    fn test_config_serde_accepts_upper_case_policy_spelling() {
        let config: StatusCheckConfig =
            serde_json::from_str(r#"{"policy": "HIERARCHY_MATCH"}"#).unwrap();
        assert_eq!(config.policy, StatusPolicy::HierarchyMatch);
    }
}

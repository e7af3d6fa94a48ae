use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spandrel_core::{ExceptionInfo, TypeName};

use crate::config::StatusCheckConfig;
use crate::error::{StatusError, StatusResult};
use crate::registry::ExceptionRegistry;

// ---------------------------------------------------------------------------
// ExceptionCheckRule — the pluggable per-exception predicate
// ---------------------------------------------------------------------------

/// A single check rule: looks at one exception instance (never the chain)
/// and reports whether it counts as an error under this rule alone.
///
/// Implementations must be total over all inputs: no panics, no failures.
/// A rule that failed here would corrupt the status-tagging path of the
/// very instrumentation trying to report an error.
pub trait ExceptionCheckRule: Send + Sync {
    fn is_error(&self, exception: &ExceptionInfo) -> bool;

    /// Stable rule name for logging.
    fn name(&self) -> &'static str;
}

/// Combine a policy's rule verdicts for one exception: it is an error
/// if and only if every rule reports is-error. Equivalently, any single
/// rule exempting the exception exempts it.
pub fn evaluate_rules(rules: &[Box<dyn ExceptionCheckRule>], exception: &ExceptionInfo) -> bool {
    rules.iter().all(|rule| rule.is_error(exception))
}

// ---------------------------------------------------------------------------
// AlwaysErrorRule — the `off` policy's only rule
// ---------------------------------------------------------------------------

/// Every throwable is an error. No state, no configuration.
#[derive(Debug, Default)]
pub struct AlwaysErrorRule;

impl ExceptionCheckRule for AlwaysErrorRule {
    fn is_error(&self, _exception: &ExceptionInfo) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "always_error"
    }
}

// ---------------------------------------------------------------------------
// HierarchyMatchRule — ignore-list with subtype-aware matching
// ---------------------------------------------------------------------------

/// Exempts an exception whose runtime type is, or transitively extends,
/// any name on the configured ignore-list. List names that never resolve
/// to a declared type simply never match a lineage; an exact name match
/// against the thrown type still works without any declaration.
pub struct HierarchyMatchRule {
    ignored: Vec<TypeName>,
    registry: Arc<ExceptionRegistry>,
}

impl HierarchyMatchRule {
    pub fn new(ignored: Vec<TypeName>, registry: Arc<ExceptionRegistry>) -> Self {
        Self { ignored, registry }
    }

    pub fn ignored_names(&self) -> &[TypeName] {
        &self.ignored
    }
}

impl ExceptionCheckRule for HierarchyMatchRule {
    fn is_error(&self, exception: &ExceptionInfo) -> bool {
        !self
            .ignored
            .iter()
            .any(|base| self.registry.is_assignable_to(exception.type_name(), base))
    }

    fn name(&self) -> &'static str {
        "hierarchy_match"
    }
}

// ---------------------------------------------------------------------------
// AnnotationMatchRule — marker on the concrete declaring type
// ---------------------------------------------------------------------------

/// Exempts an exception whose concrete type carries the ignored marker in
/// the registry. The marker is never inherited from supertypes.
pub struct AnnotationMatchRule {
    registry: Arc<ExceptionRegistry>,
}

impl AnnotationMatchRule {
    pub fn new(registry: Arc<ExceptionRegistry>) -> Self {
        Self { registry }
    }
}

impl ExceptionCheckRule for AnnotationMatchRule {
    fn is_error(&self, exception: &ExceptionInfo) -> bool {
        !self.registry.carries_ignored_marker(exception.type_name())
    }

    fn name(&self) -> &'static str {
        "annotation_match"
    }
}

// ---------------------------------------------------------------------------
// StatusPolicy — the closed set of selectable policies
// ---------------------------------------------------------------------------

/// The fixed policy enumeration. Each variant owns an ordered rule list;
/// exactly one policy is active per process, chosen by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Every throwable is an error status.
    #[default]
    #[serde(alias = "OFF")]
    Off,

    /// Hierarchy check: error status unless the exception is covered by
    /// the configured ignore-list or its type carries the ignored marker.
    #[serde(alias = "HIERARCHY_MATCH")]
    HierarchyMatch,
}

impl StatusPolicy {
    /// Parse a policy name, case-insensitively. Accepts both this crate's
    /// spelling (`hierarchy_match`) and the upper-case form (`HIERARCHY_MATCH`).
    pub fn from_name(name: &str) -> StatusResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(StatusPolicy::Off),
            "hierarchy_match" => Ok(StatusPolicy::HierarchyMatch),
            _ => Err(StatusError::UnknownPolicy(name.to_string())),
        }
    }

    /// Build this policy's ordered rule list from configuration and the
    /// shared registry.
    pub fn build_rules(
        &self,
        config: &StatusCheckConfig,
        registry: Arc<ExceptionRegistry>,
    ) -> Vec<Box<dyn ExceptionCheckRule>> {
        match self {
            StatusPolicy::Off => vec![Box::new(AlwaysErrorRule)],
            StatusPolicy::HierarchyMatch => vec![
                Box::new(HierarchyMatchRule::new(
                    config.ignored_exception_names(),
                    registry.clone(),
                )),
                Box::new(AnnotationMatchRule::new(registry)),
            ],
        }
    }
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPolicy::Off => write!(f, "off"),
            StatusPolicy::HierarchyMatch => write!(f, "hierarchy_match"),
        }
    }
}

use std::sync::{Arc, RwLock};

use spandrel_core::ExceptionInfo;
use tracing::info;

use crate::config::StatusCheckConfig;
use crate::error::StatusResult;
use crate::registry::ExceptionRegistry;
use crate::rule::{evaluate_rules, ExceptionCheckRule, StatusPolicy};

// ---------------------------------------------------------------------------
// StatusChecker — the immutable classification engine
// ---------------------------------------------------------------------------

/// One built policy: its ordered rule list and the cause-chain depth
/// bound. Immutable after construction and safe for unsynchronized
/// concurrent reads from any number of threads.
pub struct StatusChecker {
    policy: StatusPolicy,
    rules: Vec<Box<dyn ExceptionCheckRule>>,
    max_depth: u32,
}

impl std::fmt::Debug for StatusChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusChecker")
            .field("policy", &self.policy)
            .field("rules", &self.rules.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl StatusChecker {
    /// Build a checker from configuration and the shared type registry.
    pub fn build(
        config: &StatusCheckConfig,
        registry: Arc<ExceptionRegistry>,
    ) -> StatusResult<Self> {
        config.validate()?;
        let rules = config.policy.build_rules(config, registry);
        info!(
            policy = %config.policy,
            rules = rules.len(),
            ignored_exceptions = config.ignored_exception_names().len(),
            max_depth = config.effective_depth(),
            "status checker built"
        );
        Ok(Self {
            policy: config.policy,
            rules,
            max_depth: config.effective_depth(),
        })
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Classify a throwable: true means the span should be marked as
    /// erroring.
    ///
    /// Walks the cause chain iteratively, re-evaluating the rule set on
    /// each link, and stops at the first exempted exception, the end of
    /// the chain, or the depth bound. The returned verdict is the last
    /// evaluation performed; an absent throwable is never inspected and
    /// classifies as an error. Total: never fails, never panics.
    pub fn check_status(&self, root: Option<&ExceptionInfo>) -> bool {
        let mut verdict = true;
        let mut depth = self.max_depth;
        let mut current = root;
        while verdict && depth != 0 {
            let Some(exception) = current else { break };
            verdict = evaluate_rules(&self.rules, exception);
            current = exception.cause();
            depth -= 1;
        }
        verdict
    }
}

// ---------------------------------------------------------------------------
// StatusCheckService — atomic snapshot publication for hot reload
// ---------------------------------------------------------------------------

/// Shared handle over the current `StatusChecker`. Readers clone the
/// `Arc` out of the lock and classify lock-free; `reload` swaps in a
/// complete new checker, so a reader observes either the old rule set or
/// the new one, never a partially-updated mix.
#[derive(Debug)]
pub struct StatusCheckService {
    current: RwLock<Arc<StatusChecker>>,
}

impl StatusCheckService {
    pub fn new(checker: StatusChecker) -> Self {
        Self {
            current: RwLock::new(Arc::new(checker)),
        }
    }

    /// The currently published checker.
    // Classification must stay total: a poisoned lock still holds the
    // last published snapshot, so recover it instead of panicking.
    pub fn checker(&self) -> Arc<StatusChecker> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Classify against the currently published checker.
    pub fn check_status(&self, root: Option<&ExceptionInfo>) -> bool {
        self.checker().check_status(root)
    }

    /// Publish a new checker. In-flight classifications finish on the
    /// snapshot they already hold.
    pub fn reload(&self, checker: StatusChecker) {
        info!(
            policy = %checker.policy(),
            max_depth = checker.max_depth(),
            "status check rule set reloaded"
        );
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(checker);
    }
}

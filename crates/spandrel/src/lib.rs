//! Spandrel
//!
//! Facade for the spandrel tracing agent toolkit. Ties together the
//! status-classification engine and the correlation plumbing behind a
//! single configuration surface:
//!
//! 1. Load an [`AgentConfig`] (TOML) and call [`initialize_agent`].
//! 2. When a span observes a thrown error, hand its `ExceptionInfo` to
//!    [`AgentCore::report_span_status`]; the verdict lands on the span's
//!    error flag.
//! 3. On each inbound hop, [`AgentCore::extract`] merges carrier
//!    correlation into the active context; [`AgentCore::inject_span`]
//!    copies configured correlation values onto spans as tags.
//!
//! All live-path operations are pure reads over state built at
//! initialization; [`AgentCore::reload_status_check`] swaps in a new rule
//! set atomically without disturbing in-flight classifications.

pub mod config;
pub mod error;

pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use spandrel_context::{ContextCarrier, CorrelationContext, CorrelationExtendService};
use spandrel_core::{ExceptionInfo, SpanSink};
use spandrel_status::{ExceptionRegistry, StatusCheckConfig, StatusCheckService, StatusChecker};

// ---------------------------------------------------------------------------
// AgentCore — initialized subsystem handles
// ---------------------------------------------------------------------------

/// Runtime state for the spandrel toolkit: the shared exception registry,
/// the published status checker, and the correlation service.
///
/// Created once by [`initialize_agent`] and shared read-only across all
/// instrumented threads.
#[derive(Debug)]
pub struct AgentCore {
    config: AgentConfig,
    registry: Arc<ExceptionRegistry>,
    status: StatusCheckService,
    correlation: CorrelationExtendService,
}

/// Initialize the toolkit from validated configuration.
///
/// Loads the registry manifest when one is configured (a configured but
/// unreadable path is an error; no configured path means an empty
/// registry), then builds the active policy's rule set.
pub fn initialize_agent(config: AgentConfig) -> AgentResult<AgentCore> {
    config.validate()?;

    let registry = Arc::new(load_registry(config.registry_path.as_deref())?);
    let checker = StatusChecker::build(&config.status_check, registry.clone())?;
    let status = StatusCheckService::new(checker);
    let correlation = CorrelationExtendService::from_config(&config.correlation);

    info!(
        policy = %config.status_check.policy,
        declared_types = registry.declared_type_count(),
        injection_tags = correlation.injection_tags().len(),
        "spandrel agent initialized"
    );

    Ok(AgentCore {
        config,
        registry,
        status,
        correlation,
    })
}

fn load_registry(path: Option<&Path>) -> AgentResult<ExceptionRegistry> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(AgentError::Io)?;
            Ok(ExceptionRegistry::from_json(&bytes)?)
        }
        None => Ok(ExceptionRegistry::empty()),
    }
}

impl AgentCore {
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ExceptionRegistry> {
        self.registry.clone()
    }

    /// Classify a throwable under the currently published policy.
    /// True means the span should be marked as erroring.
    pub fn classify(&self, exception: Option<&ExceptionInfo>) -> bool {
        self.status.check_status(exception)
    }

    /// Classify and apply the verdict to the span's error flag.
    /// Returns the verdict.
    pub fn report_span_status(
        &self,
        span: &dyn SpanSink,
        exception: Option<&ExceptionInfo>,
    ) -> bool {
        let is_error = self.classify(exception);
        span.set_error_status(is_error);
        is_error
    }

    /// Rebuild the status-check rule set from new configuration and
    /// publish it atomically. The shared registry is reused; in-flight
    /// classifications finish on the snapshot they already hold.
    pub fn reload_status_check(&self, config: &StatusCheckConfig) -> AgentResult<()> {
        let checker = StatusChecker::build(config, self.registry.clone())?;
        self.status.reload(checker);
        Ok(())
    }

    /// A fresh correlation context sized per configuration.
    pub fn new_correlation_context(&self) -> CorrelationContext {
        CorrelationContext::from_config(&self.config.correlation)
    }

    /// Merge an inbound carrier's correlation into the active context.
    pub fn extract(&self, carrier: &ContextCarrier, active: &mut CorrelationContext) {
        self.correlation.extract(carrier, active);
    }

    /// Copy configured correlation values onto the span as tags.
    pub fn inject_span(&self, span: &dyn SpanSink, correlation: &CorrelationContext) {
        self.correlation.inject_span(span, correlation);
    }
}

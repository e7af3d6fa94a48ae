use spandrel_core::{CorrelationKey, SpanSink, TagKey};
use tracing::debug;

use crate::config::{CorrelationConfig, ExternalInjectionConfig};
use crate::correlation::{ContextCarrier, CorrelationContext};

// ---------------------------------------------------------------------------
// CorrelationExtendService — carrier extraction + span tag injection
// ---------------------------------------------------------------------------

/// Propagates correlation from incoming carriers into the active context
/// and copies configured correlation values onto spans as tags.
///
/// Built once at startup from configuration; holds only parsed,
/// immutable state.
#[derive(Debug)]
pub struct CorrelationExtendService {
    injection_tags: Vec<CorrelationKey>,
    external_injection: ExternalInjectionConfig,
}

impl CorrelationExtendService {
    pub fn from_config(config: &CorrelationConfig) -> Self {
        Self {
            injection_tags: config.injection_tag_keys(),
            external_injection: config.external_injection.clone(),
        }
    }

    pub fn injection_tags(&self) -> &[CorrelationKey] {
        &self.injection_tags
    }

    /// Merge the carrier's correlation into the active context.
    ///
    /// A valid carrier (well-formed upstream trace context) is always
    /// trusted. An invalid one is only trusted when external injection is
    /// enabled and the carrier holds the configured key with exactly the
    /// configured token; the token entry itself is not propagated.
    pub fn extract(&self, carrier: &ContextCarrier, active: &mut CorrelationContext) {
        if carrier.is_valid() {
            self.copy_correlation(carrier, active, None);
            return;
        }

        if !self.external_injection.enabled {
            return;
        }

        let mark_key = CorrelationKey::new(self.external_injection.key.as_str());
        let is_legal_injection = !self.external_injection.token.is_empty()
            && carrier.correlation().get(&mark_key) == Some(self.external_injection.token.as_str());
        if is_legal_injection {
            debug!(key = %mark_key, "externally injected correlation accepted");
            self.copy_correlation(carrier, active, Some(&mark_key));
        }
    }

    /// Copy configured correlation values onto the span as tags. Keys
    /// absent from the context are skipped.
    pub fn inject_span(&self, span: &dyn SpanSink, correlation: &CorrelationContext) {
        for key in &self.injection_tags {
            if let Some(value) = correlation.get(key) {
                span.tag(&TagKey::new(key.as_str()), value);
            }
        }
    }

    fn copy_correlation(
        &self,
        carrier: &ContextCarrier,
        active: &mut CorrelationContext,
        skip: Option<&CorrelationKey>,
    ) {
        for (key, value) in carrier.correlation().entries() {
            if Some(key) == skip {
                continue;
            }
            active.put(key.clone(), value);
        }
    }
}

//! Spandrel Context
//!
//! Correlation-context plumbing around the tracing span: a bounded
//! key/value context carried across process hops, configured injection of
//! correlation values onto spans as tags, and token-gated acceptance of
//! correlation that was injected externally (a carrier without a valid
//! upstream trace context).
//!
//! Serialization of the carrier across the wire belongs to the transport
//! layer and is not handled here.

pub mod config;
pub mod correlation;
pub mod service;

pub use config::{CorrelationConfig, ExternalInjectionConfig};
pub use correlation::{ContextCarrier, CorrelationContext};
pub use service::CorrelationExtendService;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Typed identifiers — prevent stringly-typed confusion
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

define_id!(
    TypeName,
    "Fully-qualified name of an exception type (e.g. `pkg.NamedMatchException`)."
);
define_id!(TagKey, "Key of a tag attached to a tracing span.");
define_id!(
    CorrelationKey,
    "Key of an entry in the cross-process correlation context."
);

// ---------------------------------------------------------------------------
// ExceptionInfo — the error value inspected by status classification
// ---------------------------------------------------------------------------

/// A captured exception: dynamic type identity, optional message, and an
/// optional causal predecessor.
///
/// Instances are built by the instrumentation layer at the point an error
/// is observed on a span. Ownership of the cause makes instance-level
/// cycles unrepresentable; chains can still be arbitrarily long, which is
/// why the classification engine carries a depth bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    type_name: TypeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cause: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            message: None,
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn caused_by(mut self, cause: ExceptionInfo) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&ExceptionInfo> {
        self.cause.as_deref()
    }

    /// Iterate the cause chain starting at this exception.
    pub fn chain(&self) -> impl Iterator<Item = &ExceptionInfo> {
        std::iter::successors(Some(self), |e| e.cause())
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.type_name, msg),
            None => write!(f, "{}", self.type_name),
        }
    }
}

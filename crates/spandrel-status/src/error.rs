use thiserror::Error;

/// Single error enum for status-check construction paths.
///
/// Classification itself is total and never returns these: every variant
/// originates at startup or reload time (config parsing, registry
/// loading), never on the span hot path.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("registry load error: {0}")]
    RegistryLoad(String),

    #[error("registry deserialization error: {0}")]
    RegistryDeserialization(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown status policy: '{0}'")]
    UnknownPolicy(String),
}

pub type StatusResult<T> = Result<T, StatusError>;

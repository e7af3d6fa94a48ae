use thiserror::Error;

/// Error type for the spandrel facade, aggregating errors from the
/// subsystem crates plus the facade's own configuration and I/O paths.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("status check error: {0}")]
    Status(#[from] spandrel_status::StatusError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for AgentError {
    fn from(e: toml::de::Error) -> Self {
        AgentError::Config(format!("TOML parse error: {}", e))
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

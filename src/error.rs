use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    /// Malformed or missing target configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The target could not be reached or answered with a non-200 status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The target answered but the body is not a valid status document.
    #[error("Decode error: {source}\nProblematic content:\n{body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

impl ExporterError {
    /// ConfigError for a target field holding an unusable value.
    pub fn invalid_field(target: &str, field: &str, value: &str) -> Self {
        Self::Config(format!(
            "target '{}': invalid value '{}' for field '{}'",
            target, value, field
        ))
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;

//! Error types for the sandbox engine.

use crate::embed::EmbedError;

/// Errors that end an invocation before or while the child process runs.
///
/// None of these escape the engine's public `execute*` calls: they are
/// folded into a `Failed` outcome carrying [`SandboxError::kind_name`].
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("context could not be embedded: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Dataset '{name}' not implemented. Use 'sample_market_data' for demo.")]
    UnknownDataset { name: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("child process I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),
}

impl SandboxError {
    /// Stable class name reported to callers in `Failed` outcomes.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Embedding(_) => "EmbeddingError",
            Self::UnknownDataset { .. } => "UnknownDatasetError",
            Self::Spawn { .. } => "SpawnError",
            Self::Io(_) => "ProcessIoError",
            Self::InvalidConfig(_) => "ConfigError",
        }
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let err = SandboxError::from(EmbedError::Unsupported("bytes"));
        assert_eq!(err.kind_name(), "EmbeddingError");
        assert!(err.to_string().contains("bytes"));

        let err = SandboxError::Spawn {
            program: "uv".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        assert_eq!(err.kind_name(), "SpawnError");
        assert!(err.to_string().contains("uv"));
        assert!(err.to_string().contains("No such file"));
    }

    #[test]
    fn test_unknown_dataset_message() {
        let err = SandboxError::UnknownDataset {
            name: "prices".to_string(),
        };
        assert_eq!(err.kind_name(), "UnknownDatasetError");
        assert!(err.to_string().contains("'prices'"));
        assert!(err.to_string().contains("sample_market_data"));
    }
}

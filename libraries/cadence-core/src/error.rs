/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Core error type for Cadence
///
/// Library crates keep their own precise error enums and convert into this one
/// at the boundary where callers no longer care which layer failed.
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Pipeline spawn, wiring or runtime failure
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Metadata resolution failure
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Nothing matched a search query
    #[error("No results found for {0}")]
    NoResults(String),

    /// A link could not be resolved to a playable item
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// Configuration loading or validation failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CadenceError {
    /// Create a pipeline error
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Create a metadata error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the failure concerns a single item and the caller can move on
    /// to the next one.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::Pipeline(_) | Self::NoResults(_) | Self::InvalidLink(_) | Self::Metadata(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = CadenceError::NoResults("never gonna".to_string());
        assert_eq!(err.to_string(), "No results found for never gonna");

        let err = CadenceError::config("locale must not be empty");
        assert_eq!(err.to_string(), "Configuration error: locale must not be empty");
    }

    #[test]
    fn per_item_failures_are_skippable() {
        assert!(CadenceError::pipeline("ffmpeg exited with code 1").is_skippable());
        assert!(CadenceError::InvalidLink("https://example.com".into()).is_skippable());
        assert!(!CadenceError::config("bad").is_skippable());
        assert!(!CadenceError::Io(std::io::Error::other("disk full")).is_skippable());
    }
}

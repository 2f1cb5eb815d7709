/// Metadata resolution errors
use thiserror::Error;

/// Result type alias using `MetadataError`
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Metadata resolution error types
#[derive(Error, Debug)]
pub enum MetadataError {
    /// A search matched nothing
    #[error("No results found for {0}")]
    NoResults(String),

    /// A link did not resolve to a playable item
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// The lookup tool failed
    #[error("Lookup tool error: {0}")]
    Tool(String),

    /// Lookup output was not the expected JSON
    #[error("Failed to parse lookup output: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    /// Create a tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }
}

impl From<MetadataError> for cadence_core::CadenceError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NoResults(query) => cadence_core::CadenceError::NoResults(query),
            MetadataError::InvalidLink(url) => cadence_core::CadenceError::InvalidLink(url),
            other => cadence_core::CadenceError::metadata(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::CadenceError;

    #[test]
    fn lookup_misses_keep_their_kind() {
        let err: CadenceError = MetadataError::NoResults("lofi".into()).into();
        assert!(matches!(err, CadenceError::NoResults(ref q) if q == "lofi"));

        let err: CadenceError = MetadataError::InvalidLink("https://x".into()).into();
        assert!(matches!(err, CadenceError::InvalidLink(_)));

        let err: CadenceError = MetadataError::tool("exit code 1").into();
        assert!(matches!(err, CadenceError::Metadata(_)));
    }
}

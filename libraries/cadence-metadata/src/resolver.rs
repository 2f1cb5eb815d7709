//! Resolver abstraction

use crate::error::Result;
use async_trait::async_trait;
use cadence_core::TrackMetadata;
use serde::{Deserialize, Serialize};

/// Turns a user query (link or search terms) into playable track metadata
///
/// Implementations must fail with [`MetadataError::NoResults`] when a search
/// matches nothing and with [`MetadataError::InvalidLink`] when a link does
/// not resolve.
///
/// [`MetadataError::NoResults`]: crate::MetadataError::NoResults
/// [`MetadataError::InvalidLink`]: crate::MetadataError::InvalidLink
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve one query
    async fn resolve(&self, query: &str) -> Result<TrackMetadata>;
}

/// What to do when a direct link lookup returns no canonical URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedLinkPolicy {
    /// Keep the link exactly as the user gave it
    #[default]
    UseOriginal,

    /// Fail with `InvalidLink`
    Reject,
}

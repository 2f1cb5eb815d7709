//! Cadence Metadata
//!
//! Resolves what a user typed (a link or search terms) into the
//! [`TrackMetadata`](cadence_core::TrackMetadata) a track is built from.
//!
//! This crate provides:
//! - [`MetadataResolver`]: the async lookup abstraction
//! - [`YtDlpResolver`]: the yt-dlp implementation
//! - [`QueryKind`]: link/search classification of a query
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_metadata::{MetadataResolver, YtDlpResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = YtDlpResolver::default();
//! let track = resolver.resolve("never gonna give you up").await?;
//! println!("{} [{}]", track.title, track.duration_label());
//! # Ok(())
//! # }
//! ```

mod error;
mod query;
mod resolver;
mod ytdlp;

pub use error::{MetadataError, Result};
pub use query::QueryKind;
pub use resolver::{MetadataResolver, UnresolvedLinkPolicy};
pub use ytdlp::{YtDlpResolver, UNKNOWN_TITLE};

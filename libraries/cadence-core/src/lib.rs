//! Cadence Core
//!
//! Shared types and error handling for Cadence.
//!
//! This crate provides the building blocks used by the pipeline, the metadata
//! resolver and the command-line host:
//! - **Domain Types**: [`TrackMetadata`], the resolved description of a playable item,
//!   and [`ToolCommand`], an external executable with its leading arguments
//! - **Messages**: locale-aware user-facing strings ([`Messages`])
//! - **Error Handling**: unified [`CadenceError`] and [`Result`] types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{Messages, TrackMetadata};
//!
//! let track = TrackMetadata::new("https://youtube.com/watch?v=abc", "Song", 215);
//! let messages = Messages::for_locale("en");
//!
//! assert_eq!(track.duration_label(), "3:35");
//! assert!(messages.started_playing(&track).contains("Song"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod messages;
pub mod types;

pub use error::{CadenceError, Result};
pub use messages::{Locale, Messages};
pub use types::{ToolCommand, TrackMetadata};

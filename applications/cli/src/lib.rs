//! Cadence CLI Library
//!
//! Configuration, playback loop and PCM sink behind the `cadence` binary.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod player;
pub mod sink;

// Re-export commonly used types for convenience
pub use config::{CadenceConfig, ResolverSettings};
pub use player::{PlaybackSummary, Player};

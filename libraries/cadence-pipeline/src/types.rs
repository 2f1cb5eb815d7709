//! Lifecycle states

/// Lifecycle of a resource pipeline
///
/// ```text
/// Building ──▶ Streaming ──▶ Completed
///    │             │
///    │             ├──▶ Failed
///    ▼             ▼
///  (error)      Stopped   (close() moves any state here)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Processes are being spawned and linked
    Building,

    /// Both processes are running (or draining) and output is available
    Streaming,

    /// Both processes exited cleanly
    Completed,

    /// Stopped on request
    Stopped,

    /// A process exited abnormally and the chain was torn down
    Failed,
}

impl PipelineState {
    /// Processes may still be producing output
    pub fn is_live(&self) -> bool {
        matches!(self, PipelineState::Building | PipelineState::Streaming)
    }

    /// No further transitions except to `Stopped`
    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }
}

/// Pipeline attachment of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// No live pipeline attached
    Idle,

    /// A live pipeline is attached
    Streaming,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_and_terminal_partition_states() {
        for state in [PipelineState::Building, PipelineState::Streaming] {
            assert!(state.is_live());
            assert!(!state.is_terminal());
        }
        for state in [PipelineState::Completed, PipelineState::Stopped, PipelineState::Failed] {
            assert!(state.is_terminal());
            assert!(!state.is_live());
        }
    }
}

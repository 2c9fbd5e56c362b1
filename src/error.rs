// Error types shared by the engine components

use thiserror::Error;

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to callers of the engine API
///
/// Index errors are programmer misuse and never mutate state.
/// `AudioUnavailable` reports an environment failure: the output backend
/// is down and triggers are skipped until it reports running again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Pad index {pad} out of range (0..{count})")]
    PadOutOfRange { pad: usize, count: usize },

    #[error("Step {step} out of range (0..{steps})")]
    StepOutOfRange { step: usize, steps: usize },

    #[error("Pattern {index} out of range (0..{slots})")]
    PatternOutOfRange { index: usize, slots: usize },

    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    #[error("Unknown parameter '{param}' for effect {effect}")]
    UnknownParameter { effect: String, param: String },

    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl EngineError {
    /// True for the input-validation family (bad pad/step/pattern index)
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            EngineError::PadOutOfRange { .. }
                | EngineError::StepOutOfRange { .. }
                | EngineError::PatternOutOfRange { .. }
        )
    }
}

use thiserror::Error;

/// Failure taxonomy for pipeline operations.
///
/// Every failure is local to the operation that raised it: either a
/// transition fully applies (stage set, history appended) or nothing is
/// observable.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PipelineError {
    #[error("unknown stage label {0:?}")]
    UnknownStage(String),
    #[error("opportunity is closed; its stage can no longer change")]
    TerminalStageLocked,
    #[error("closing an opportunity requires a non-empty reason")]
    MissingReason,
    #[error("opportunity changed since it was read; re-fetch and retry")]
    ConcurrentModification,
}

impl PipelineError {
    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UnknownStage(_) => "UnknownStage",
            PipelineError::TerminalStageLocked => "TerminalStageLocked",
            PipelineError::MissingReason => "MissingReason",
            PipelineError::ConcurrentModification => "ConcurrentModification",
        }
    }
}

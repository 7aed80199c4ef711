use thiserror::Error;

use crate::domain::ArgumentKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown phase: {0} (expected one of: benchmark, model, analyze, deliver)")]
    UnknownPhase(String),

    #[error("Invalid {kind} argument '{value}': {reason}")]
    InvalidArgument {
        kind: ArgumentKind,
        value: String,
        reason: String,
    },

    #[error("Phase {phase} expects a {expected} argument, got {actual}")]
    ArgumentMismatch {
        phase: String,
        expected: ArgumentKind,
        actual: ArgumentKind,
    },
}

impl CoreError {
    pub fn invalid_argument(
        kind: ArgumentKind,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            kind,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

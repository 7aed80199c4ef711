use bmad_core::{CoreError, Outcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid phase definition for {phase}: {reason}")]
    InvalidDefinition { phase: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl OrchestratorError {
    pub fn invalid_definition(phase: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            phase: phase.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Reasons an invocation could not be carried out.
///
/// These never cross the agent boundary as errors: each converts into an
/// [`Outcome::Errored`] recorded for the invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("unknown agent")]
    UnknownAgent,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("timeout")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Process(String),

    #[error("agent panicked: {0}")]
    Panicked(String),
}

impl From<InvocationError> for Outcome {
    fn from(error: InvocationError) -> Self {
        Outcome::errored(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_error_messages() {
        assert_eq!(Outcome::from(InvocationError::Timeout), Outcome::errored("timeout"));
        assert_eq!(
            Outcome::from(InvocationError::UnknownAgent),
            Outcome::errored("unknown agent")
        );
        assert_eq!(
            Outcome::from(InvocationError::Cancelled),
            Outcome::errored("cancelled")
        );
        assert_eq!(
            InvocationError::UnsupportedOperation("fly".to_string()).to_string(),
            "unsupported operation: fly"
        );
    }

    #[test]
    fn test_core_error_is_transparent() {
        let error: OrchestratorError = CoreError::UnknownPhase("ship".to_string()).into();
        assert!(error.to_string().starts_with("Unknown phase: ship"));
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one agent-operation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation ran and produced a result.
    Completed { payload: serde_json::Value },
    /// The operation ran but reported a negative result.
    Failed { message: String },
    /// The invocation itself could not be completed (timeout, crash, missing agent).
    Errored { message: String },
}

impl Outcome {
    pub fn completed(payload: serde_json::Value) -> Self {
        Self::Completed { payload }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn errored(message: impl Into<String>) -> Self {
        Self::Errored {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Completed { .. } => OutcomeKind::Completed,
            Self::Failed { .. } => OutcomeKind::Failed,
            Self::Errored { .. } => OutcomeKind::Errored,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Failure or error text; `None` for completed outcomes.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { message } | Self::Errored { message } => Some(message),
        }
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Completed { payload } => Some(payload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Completed,
    Failed,
    Errored,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an invocation's failure fails the whole phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Required,
    #[default]
    Optional,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
        }
    }
}

/// Key of an invocation within a phase: the agent name, or `agent.operation`
/// when the agent is invoked more than once in the same phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationKey(String);

impl InvocationKey {
    pub fn agent(agent: &str) -> Self {
        Self(agent.to_string())
    }

    pub fn operation(agent: &str, operation: &str) -> Self {
        Self(format!("{}.{}", agent, operation))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InvocationKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

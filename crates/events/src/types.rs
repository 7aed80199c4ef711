//! Event types emitted while a phase runs

use bmad_core::{OutcomeKind, PhaseName, PhaseStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All possible events in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A phase run began dispatching invocations
    #[serde(rename = "phase.started")]
    PhaseStarted {
        run_id: Uuid,
        phase: PhaseName,
        argument: String,
        invocations: usize,
    },

    /// All invocations of a phase resolved
    #[serde(rename = "phase.finished")]
    PhaseFinished {
        run_id: Uuid,
        phase: PhaseName,
        status: PhaseStatus,
        duration_ms: u64,
    },

    /// An agent operation was dispatched
    #[serde(rename = "invocation.started")]
    InvocationStarted {
        run_id: Uuid,
        invocation_id: Uuid,
        key: String,
        agent: String,
        operation: String,
    },

    /// An agent operation resolved to an outcome
    #[serde(rename = "invocation.finished")]
    InvocationFinished {
        run_id: Uuid,
        invocation_id: Uuid,
        key: String,
        outcome: OutcomeKind,
        message: Option<String>,
        duration_ms: u64,
    },

    /// A fault in the run itself rather than in an agent, e.g. a phase
    /// naming an agent that is not registered
    #[serde(rename = "error")]
    Error {
        run_id: Uuid,
        message: String,
        context: Option<String>,
    },
}

impl Event {
    /// The phase run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            Event::PhaseStarted { run_id, .. }
            | Event::PhaseFinished { run_id, .. }
            | Event::InvocationStarted { run_id, .. }
            | Event::InvocationFinished { run_id, .. }
            | Event::Error { run_id, .. } => *run_id,
        }
    }

    /// One-line human readable summary, used for progress output
    pub fn summary(&self) -> String {
        match self {
            Event::PhaseStarted {
                phase,
                argument,
                invocations,
                ..
            } => format!(
                "{} phase started ({} invocations) on {}",
                phase, invocations, argument
            ),
            Event::PhaseFinished {
                phase,
                status,
                duration_ms,
                ..
            } => format!("{} phase {} in {}ms", phase, status, duration_ms),
            Event::InvocationStarted { key, .. } => format!("{} started", key),
            Event::InvocationFinished {
                key,
                outcome,
                message,
                duration_ms,
                ..
            } => match message {
                Some(message) => format!("{} {} in {}ms: {}", key, outcome, duration_ms, message),
                None => format!("{} {} in {}ms", key, outcome, duration_ms),
            },
            Event::Error {
                message, context, ..
            } => match context {
                Some(context) => format!("error ({}): {}", context, message),
                None => format!("error: {}", message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope_creation() {
        let event = Event::PhaseStarted {
            run_id: Uuid::new_v4(),
            phase: PhaseName::Benchmark,
            argument: "https://example.test/".to_string(),
            invocations: 3,
        };
        let envelope = EventEnvelope::new(event);

        assert!(!envelope.id.is_nil());
        assert!(envelope.timestamp <= Utc::now());
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::InvocationFinished {
            run_id: Uuid::new_v4(),
            invocation_id: Uuid::new_v4(),
            key: "semgrep".to_string(),
            outcome: OutcomeKind::Failed,
            message: Some("exit status 2".to_string()),
            duration_ms: 42,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("invocation.finished"));
        assert!(json.contains("\"outcome\":\"failed\""));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"phase.finished","run_id":"550e8400-e29b-41d4-a716-446655440000","phase":"analyze","status":"partially_failed","duration_ms":10}"#;
        let event: Event = serde_json::from_str(json).unwrap();

        match event {
            Event::PhaseFinished { phase, status, .. } => {
                assert_eq!(phase, PhaseName::Analyze);
                assert_eq!(status, PhaseStatus::PartiallyFailed);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_run_id() {
        let run_id = Uuid::new_v4();

        let event = Event::InvocationStarted {
            run_id,
            invocation_id: Uuid::new_v4(),
            key: "exa".to_string(),
            agent: "exa".to_string(),
            operation: "research_competitors".to_string(),
        };
        assert_eq!(event.run_id(), run_id);

        let error_event = Event::Error {
            run_id,
            message: "unknown agent".to_string(),
            context: Some("exa".to_string()),
        };
        assert_eq!(error_event.run_id(), run_id);
        assert_eq!(error_event.summary(), "error (exa): unknown agent");
    }

    #[test]
    fn test_event_summary() {
        let event = Event::InvocationFinished {
            run_id: Uuid::new_v4(),
            invocation_id: Uuid::new_v4(),
            key: "playwright".to_string(),
            outcome: OutcomeKind::Errored,
            message: Some("timeout".to_string()),
            duration_ms: 60000,
        };
        assert_eq!(event.summary(), "playwright errored in 60000ms: timeout");
    }
}

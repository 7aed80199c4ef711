use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::outcome::{InvocationKey, Outcome, OutcomeKind, Requirement};
use super::phase::PhaseName;

/// Overall result of a phase run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Every invocation completed.
    Succeeded,
    /// Required invocations completed, at least one optional one did not.
    PartiallyFailed,
    /// A required invocation failed or errored.
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PartiallyFailed => "partially_failed",
            Self::Failed => "failed",
        }
    }

    pub fn evaluate(entries: &[ReportEntry]) -> Self {
        let required_failed = entries
            .iter()
            .any(|e| e.requirement == Requirement::Required && !e.outcome.is_completed());
        if required_failed {
            return Self::Failed;
        }

        if entries.iter().all(|e| e.outcome.is_completed()) {
            Self::Succeeded
        } else {
            Self::PartiallyFailed
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation's line in the phase report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub key: InvocationKey,
    pub agent: String,
    pub operation: String,
    pub requirement: Requirement,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Ordered outcomes of one phase run, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub run_id: Uuid,
    pub phase: PhaseName,
    pub argument: String,
    pub status: PhaseStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entries: Vec<ReportEntry>,
}

impl PhaseReport {
    pub fn new(
        run_id: Uuid,
        phase: PhaseName,
        argument: impl Into<String>,
        started_at: DateTime<Utc>,
        entries: Vec<ReportEntry>,
    ) -> Self {
        let status = PhaseStatus::evaluate(&entries);
        Self {
            run_id,
            phase,
            argument: argument.into(),
            status,
            started_at,
            finished_at: Utc::now(),
            entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.key.as_str() == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.kind() == kind)
            .count()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, requirement: Requirement, outcome: Outcome) -> ReportEntry {
        let now = Utc::now();
        ReportEntry {
            key: InvocationKey::from(key),
            agent: key.to_string(),
            operation: "op".to_string(),
            requirement,
            outcome,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_status_all_completed() {
        let entries = vec![
            entry("a", Requirement::Optional, Outcome::completed(json!({}))),
            entry("b", Requirement::Required, Outcome::completed(json!({}))),
        ];
        assert_eq!(PhaseStatus::evaluate(&entries), PhaseStatus::Succeeded);
    }

    #[test]
    fn test_status_optional_failure() {
        let entries = vec![
            entry("a", Requirement::Optional, Outcome::failed("boom")),
            entry("b", Requirement::Required, Outcome::completed(json!({}))),
        ];
        assert_eq!(PhaseStatus::evaluate(&entries), PhaseStatus::PartiallyFailed);

        let entries = vec![entry("a", Requirement::Optional, Outcome::errored("timeout"))];
        assert_eq!(PhaseStatus::evaluate(&entries), PhaseStatus::PartiallyFailed);
    }

    #[test]
    fn test_status_required_failure() {
        let entries = vec![
            entry("a", Requirement::Required, Outcome::failed("boom")),
            entry("b", Requirement::Optional, Outcome::completed(json!({}))),
        ];
        assert_eq!(PhaseStatus::evaluate(&entries), PhaseStatus::Failed);

        let entries = vec![entry("a", Requirement::Required, Outcome::errored("unknown agent"))];
        assert_eq!(PhaseStatus::evaluate(&entries), PhaseStatus::Failed);
    }

    #[test]
    fn test_status_empty_phase() {
        assert_eq!(PhaseStatus::evaluate(&[]), PhaseStatus::Succeeded);
    }

    #[test]
    fn test_report_lookup() {
        let report = PhaseReport::new(
            Uuid::new_v4(),
            PhaseName::Analyze,
            "/tmp",
            Utc::now(),
            vec![
                entry("semgrep", Requirement::Optional, Outcome::completed(json!({}))),
                entry("playwright", Requirement::Optional, Outcome::failed("x")),
            ],
        );
        assert_eq!(report.keys(), vec!["semgrep", "playwright"]);
        assert_eq!(report.status, PhaseStatus::PartiallyFailed);
        assert_eq!(report.count(OutcomeKind::Completed), 1);
        assert_eq!(report.count(OutcomeKind::Failed), 1);
        assert!(report.get("playwright").is_some());
        assert!(report.get("exa").is_none());
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_report_serialization() {
        let report = PhaseReport::new(
            Uuid::new_v4(),
            PhaseName::Deliver,
            "https://example.test/",
            Utc::now(),
            vec![],
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["phase"], "deliver");
        assert_eq!(value["status"], "succeeded");
        assert!(value["entries"].as_array().unwrap().is_empty());
    }
}

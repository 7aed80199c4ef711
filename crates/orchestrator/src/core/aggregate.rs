//! Merges per-invocation outcomes into declaration-ordered report entries.

use bmad_core::{InvocationKey, Outcome, ReportEntry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::error;

use super::phase::PhaseDefinition;

/// Outcome of one invocation together with when it ran.
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl InvocationRecord {
    pub fn new(outcome: Outcome, started_at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Record for an invocation that resolved without running.
    pub fn immediate(outcome: Outcome) -> Self {
        let now = Utc::now();
        Self {
            outcome,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Build report entries in the definition's declaration order.
///
/// # Panics
///
/// Panics when `records` holds two outcomes for the same key; the coordinator
/// records exactly one per invocation.
pub fn aggregate(
    definition: &PhaseDefinition,
    records: Vec<(InvocationKey, InvocationRecord)>,
) -> Vec<ReportEntry> {
    let mut by_key: HashMap<InvocationKey, InvocationRecord> = HashMap::with_capacity(records.len());
    for (key, record) in records {
        let previous = by_key.insert(key.clone(), record);
        assert!(previous.is_none(), "duplicate outcome recorded for {}", key);
    }

    let entries = definition
        .invocations()
        .iter()
        .map(|planned| {
            let record = by_key.remove(&planned.key).unwrap_or_else(|| {
                error!(key = %planned.key, "No outcome recorded for invocation");
                InvocationRecord::immediate(Outcome::errored("no outcome recorded"))
            });
            ReportEntry {
                key: planned.key.clone(),
                agent: planned.spec.agent.clone(),
                operation: planned.spec.operation.clone(),
                requirement: planned.spec.requirement,
                duration_ms: record.duration_ms(),
                started_at: record.started_at,
                finished_at: record.finished_at,
                outcome: record.outcome,
            }
        })
        .collect();

    for key in by_key.keys() {
        error!(key = %key, "Outcome recorded for undeclared invocation, dropped");
    }

    entries
}

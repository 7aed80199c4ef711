//! Plain-text rendering for `--format text` and `bmad list`.

use bmad_core::{Outcome, PhaseName, PhaseReport};
use orchestrator::AgentRegistry;
use std::fmt::Write;

pub fn report(report: &PhaseReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} phase on {}: {} ({}ms)",
        report.phase,
        report.argument,
        report.status,
        report.duration_ms()
    );

    let width = report
        .entries
        .iter()
        .map(|e| e.key.as_str().len())
        .max()
        .unwrap_or(0);
    for entry in &report.entries {
        let detail = match &entry.outcome {
            Outcome::Completed { payload } => payload
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or_default()
                .to_string(),
            Outcome::Failed { message } | Outcome::Errored { message } => message.clone(),
        };
        let _ = writeln!(
            out,
            "  {:<width$}  {:<9}  {:>6}ms  {}",
            entry.key.as_str(),
            entry.outcome.kind().as_str(),
            entry.duration_ms,
            detail,
            width = width
        );
    }
    out
}

pub fn listing(registry: &AgentRegistry) -> String {
    let mut out = String::from("Phases:\n");
    for phase in PhaseName::ALL {
        let _ = writeln!(
            out,
            "  {:<10} <{}>  {}",
            phase.as_str(),
            phase.argument_kind(),
            phase.description()
        );
    }

    out.push_str("\nAgents:\n");
    for name in registry.names() {
        let Ok(agent) = registry.get(name) else {
            continue;
        };
        let operations: Vec<String> = agent.operations().into_iter().map(|op| op.name).collect();
        let _ = writeln!(out, "  {:<17} {}", name, operations.join(", "));
    }
    out
}

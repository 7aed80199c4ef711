//! Static-analysis security scanning through Semgrep.

use async_trait::async_trait;
use bmad_core::Outcome;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

use crate::agent::{Agent, InvocationContext, OperationInput, OperationSpec};
use crate::config::SemgrepConfig;
use crate::error::InvocationError;
use crate::process::{self, ProcessCommand};

use super::STATIC_OPERATION_TIMEOUT;

const NAME: &str = "semgrep";

/// Subset of `semgrep --json` output the agent reports on.
#[derive(Debug, Deserialize)]
pub struct SemgrepOutput {
    #[serde(default)]
    pub results: Vec<SemgrepResult>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// One finding. Every field is optional so a sparse entry still counts.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SemgrepResult {
    pub check_id: String,
    pub path: String,
    pub start: Option<SemgrepLocation>,
    pub extra: SemgrepExtra,
}

#[derive(Debug, Deserialize)]
pub struct SemgrepLocation {
    pub line: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SemgrepExtra {
    pub message: String,
    pub severity: String,
}

impl SemgrepOutput {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn findings(&self) -> Vec<serde_json::Value> {
        self.results
            .iter()
            .map(|r| {
                json!({
                    "check_id": r.check_id,
                    "path": r.path,
                    "line": r.start.as_ref().map(|start| start.line),
                    "severity": r.extra.severity.to_lowercase(),
                    "message": r.extra.message,
                })
            })
            .collect()
    }
}

pub struct SemgrepAgent {
    config: SemgrepConfig,
}

impl SemgrepAgent {
    pub fn new(config: SemgrepConfig) -> Self {
        Self { config }
    }

    async fn scan_security(&self, target: &Path, ctx: &InvocationContext) -> Outcome {
        let Some(command) = ProcessCommand::from_argv(&self.config.command) else {
            return InvocationError::Process("semgrep command is not configured".to_string())
                .into();
        };
        let command = command
            .arg(format!("--config={}", self.config.rules))
            .arg("--json")
            .arg(target.to_string_lossy());

        info!(target = %target.display(), rules = %self.config.rules, "Running Semgrep scan");
        match process::run(&command, self.config.timeout(), &ctx.cancel).await {
            Ok(output) => output.into_outcome(|output| self.summarize(&output.stdout)),
            Err(e) => e.into(),
        }
    }

    /// Turn successful scan output into an outcome.
    fn summarize(&self, stdout: &str) -> Outcome {
        let report = match SemgrepOutput::parse(stdout) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Semgrep output is not valid JSON, keeping raw output");
                return Outcome::completed(json!({
                    "agent": NAME,
                    "status": "completed",
                    "vulnerabilities": 0,
                    "output": stdout,
                }));
            }
        };

        let count = report.results.len();
        if self.config.fail_on_findings && count > 0 {
            return Outcome::failed(format!("semgrep reported {} finding(s)", count));
        }

        Outcome::completed(json!({
            "agent": NAME,
            "status": "completed",
            "vulnerabilities": count,
            "details": report.findings(),
            "scan_errors": report.errors.len(),
        }))
    }

    fn final_check(&self) -> Outcome {
        Outcome::completed(json!({
            "agent": NAME,
            "status": "ready",
            "note": "Final security check ready",
        }))
    }
}

#[async_trait]
impl Agent for SemgrepAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new("scan_security", self.config.timeout()),
            OperationSpec::new("final_check", STATIC_OPERATION_TIMEOUT),
        ]
    }

    async fn invoke(
        &self,
        operation: &str,
        input: &OperationInput,
        ctx: &InvocationContext,
    ) -> Outcome {
        match operation {
            "scan_security" => match input.expect_path() {
                Ok(path) => self.scan_security(path, ctx).await,
                Err(e) => e.into(),
            },
            "final_check" => self.final_check(),
            other => InvocationError::UnsupportedOperation(other.to_string()).into(),
        }
    }
}

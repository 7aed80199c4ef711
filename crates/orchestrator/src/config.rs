//! Orchestrator configuration.
//!
//! Every field has a default so a partial TOML file (or none at all) yields a
//! usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{OrchestratorError, Result};

pub const DEFAULT_TARGET_URL: &str = "https://admin.agistaffers.com";
pub const DEFAULT_PLAYWRIGHT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SEMGREP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub defaults: DefaultsConfig,
    pub playwright: PlaywrightConfig,
    pub semgrep: SemgrepConfig,
}

/// Phase arguments used when none is given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub url: String,
    pub path: PathBuf,
    pub requirements: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.to_string(),
            path: PathBuf::from("."),
            requirements: vec!["admin-dashboard".to_string(), "monitoring".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Program and leading arguments; the test file and reporter flag are appended.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Where per-invocation test files are written. Defaults to the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            command: vec!["npx".to_string(), "playwright".to_string(), "test".to_string()],
            timeout_secs: DEFAULT_PLAYWRIGHT_TIMEOUT_SECS,
            scratch_dir: None,
        }
    }
}

impl PlaywrightConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemgrepConfig {
    /// Program and leading arguments; `--config`, `--json` and the target are appended.
    pub command: Vec<String>,
    pub rules: String,
    pub timeout_secs: u64,
    /// Report a scan with findings as a failed outcome instead of a completed one.
    pub fail_on_findings: bool,
}

impl Default for SemgrepConfig {
    fn default() -> Self {
        Self {
            command: vec!["semgrep".to_string()],
            rules: "auto".to_string(),
            timeout_secs: DEFAULT_SEMGREP_TIMEOUT_SECS,
            fail_on_findings: false,
        }
    }
}

impl SemgrepConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OrchestratorConfig {
    pub fn with_playwright_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.playwright.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_playwright_timeout(mut self, secs: u64) -> Self {
        self.playwright.timeout_secs = secs;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.playwright.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_semgrep_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.semgrep.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_semgrep_timeout(mut self, secs: u64) -> Self {
        self.semgrep.timeout_secs = secs;
        self
    }

    pub fn with_fail_on_findings(mut self, fail: bool) -> Self {
        self.semgrep.fail_on_findings = fail;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.playwright.command.is_empty() {
            return Err(OrchestratorError::Config(
                "playwright.command must not be empty".to_string(),
            ));
        }
        if self.semgrep.command.is_empty() {
            return Err(OrchestratorError::Config(
                "semgrep.command must not be empty".to_string(),
            ));
        }
        if self.playwright.timeout_secs == 0 || self.semgrep.timeout_secs == 0 {
            return Err(OrchestratorError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.defaults.url, DEFAULT_TARGET_URL);
        assert_eq!(config.playwright.timeout(), Duration::from_secs(60));
        assert_eq!(config.semgrep.timeout(), Duration::from_secs(120));
        assert_eq!(config.semgrep.rules, "auto");
        assert!(!config.semgrep.fail_on_findings);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: OrchestratorConfig = toml::from_str(
            r#"
            [semgrep]
            rules = "p/owasp-top-ten"
            fail_on_findings = true

            [defaults]
            url = "https://staging.example.test"
            "#,
        )
        .unwrap();

        assert_eq!(config.semgrep.rules, "p/owasp-top-ten");
        assert!(config.semgrep.fail_on_findings);
        assert_eq!(config.semgrep.timeout_secs, DEFAULT_SEMGREP_TIMEOUT_SECS);
        assert_eq!(config.defaults.url, "https://staging.example.test");
        assert_eq!(config.playwright.command[0], "npx");
    }

    #[test]
    fn test_builder_and_validation() {
        let config = OrchestratorConfig::default()
            .with_playwright_command(Vec::<String>::new())
            .with_semgrep_timeout(5);
        assert!(matches!(config.validate(), Err(OrchestratorError::Config(_))));

        let config = OrchestratorConfig::default().with_playwright_timeout(0);
        assert!(config.validate().is_err());

        let config = OrchestratorConfig::default().with_scratch_dir("/var/tmp/bmad");
        assert_eq!(config.playwright.scratch_dir(), PathBuf::from("/var/tmp/bmad"));
    }
}

//! Agent capability interface.
//!
//! An agent exposes named operations. Each call receives one structured
//! [`OperationInput`] and answers with an [`Outcome`]; failures are reported
//! through the outcome, never as an error crossing this boundary.

use async_trait::async_trait;
use bmad_core::{InvocationKey, Outcome, PhaseArgument};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::error::InvocationError;

/// An operation an agent supports, with the timeout bounding each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    pub timeout: Duration,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
        }
    }
}

/// Input handed to a single operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationInput {
    None,
    Url(Url),
    Path(PathBuf),
    Requirements(Vec<String>),
}

impl OperationInput {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Url(_) => "url",
            Self::Path(_) => "path",
            Self::Requirements(_) => "requirements",
        }
    }

    pub fn expect_url(&self) -> Result<&Url, InvocationError> {
        match self {
            Self::Url(url) => Ok(url),
            other => Err(InvocationError::InvalidInput(format!(
                "expected url, got {}",
                other.describe()
            ))),
        }
    }

    pub fn expect_path(&self) -> Result<&Path, InvocationError> {
        match self {
            Self::Path(path) => Ok(path),
            other => Err(InvocationError::InvalidInput(format!(
                "expected path, got {}",
                other.describe()
            ))),
        }
    }

    pub fn expect_requirements(&self) -> Result<&[String], InvocationError> {
        match self {
            Self::Requirements(items) => Ok(items),
            other => Err(InvocationError::InvalidInput(format!(
                "expected requirements, got {}",
                other.describe()
            ))),
        }
    }
}

impl From<&PhaseArgument> for OperationInput {
    fn from(argument: &PhaseArgument) -> Self {
        match argument {
            PhaseArgument::Url(url) => Self::Url(url.clone()),
            PhaseArgument::Path(path) => Self::Path(path.clone()),
            PhaseArgument::Requirements(items) => Self::Requirements(items.clone()),
        }
    }
}

/// Per-call context supplied by the coordinator.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub invocation_id: Uuid,
    pub key: InvocationKey,
    pub timeout: Duration,
    /// Cancelled when the call times out or the phase is cancelled.
    pub cancel: CancellationToken,
}

impl InvocationContext {
    pub fn new(key: InvocationKey, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            key,
            timeout,
            cancel,
        }
    }

    /// File name unique to this invocation, e.g. `perf-<uuid>.spec.js`.
    pub fn scratch_file_name(&self, prefix: &str, extension: &str) -> String {
        format!("{}-{}.{}", prefix, self.invocation_id, extension)
    }
}

/// A pluggable capability provider.
///
/// Implementations hold no state between calls; concurrent calls of the same
/// operation must isolate their own side effects.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Registry name, unique per deployment.
    fn name(&self) -> &str;

    /// Operations this agent supports.
    fn operations(&self) -> Vec<OperationSpec>;

    /// Run `operation` with `input`.
    async fn invoke(
        &self,
        operation: &str,
        input: &OperationInput,
        ctx: &InvocationContext,
    ) -> Outcome;

    fn operation(&self, name: &str) -> Option<OperationSpec> {
        self.operations().into_iter().find(|op| op.name == name)
    }
}

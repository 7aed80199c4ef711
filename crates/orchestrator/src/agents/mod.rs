//! Built-in agents.
//!
//! `playwright` and `semgrep` wrap external tools through the process runner;
//! the others answer from static capability descriptions.

mod exa;
mod firecrawl;
mod planning;
mod playwright;
mod semgrep;

use std::time::Duration;

pub use exa::ExaAgent;
pub use firecrawl::FirecrawlAgent;
pub use planning::{ComponentDesignAgent, DocumentationAgent};
pub use playwright::PlaywrightAgent;
pub use semgrep::{SemgrepAgent, SemgrepOutput};

/// Timeout for operations that do no I/O.
pub(crate) const STATIC_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

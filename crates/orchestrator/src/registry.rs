//! Agent registry, built once at startup and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::agent::Agent;
use crate::agents::{
    ComponentDesignAgent, DocumentationAgent, ExaAgent, FirecrawlAgent, PlaywrightAgent,
    SemgrepAgent,
};
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};

/// Configured agents keyed by name.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard agents of a deployment.
    pub fn with_defaults(config: &OrchestratorConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(PlaywrightAgent::new(config.playwright.clone())))?;
        registry.register(Arc::new(SemgrepAgent::new(config.semgrep.clone())))?;
        registry.register(Arc::new(FirecrawlAgent))?;
        registry.register(Arc::new(ExaAgent))?;
        registry.register(Arc::new(ComponentDesignAgent))?;
        registry.register(Arc::new(DocumentationAgent))?;
        Ok(registry)
    }

    /// Add `agent` under its name. An existing registration is kept on conflict.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> Result<()> {
        let name = agent.name().to_string();
        if self.agents.contains_key(&name) {
            return Err(OrchestratorError::DuplicateAgent(name));
        }
        debug!(agent = %name, "Registered agent");
        self.agents.insert(name, agent);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Agent>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownAgent(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.names())
            .finish()
    }
}

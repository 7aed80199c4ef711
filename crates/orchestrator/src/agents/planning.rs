//! Planning agents used by the model phase.

use async_trait::async_trait;
use bmad_core::Outcome;
use serde_json::json;

use crate::agent::{Agent, InvocationContext, OperationInput, OperationSpec};
use crate::error::InvocationError;

use super::STATIC_OPERATION_TIMEOUT;

const COMPONENTS: [&str; 3] = ["AdminDashboard", "MonitoringCharts", "PWAInstaller"];
const FRAMEWORK: &str = "shadcn-ui + Tailwind CSS";
const PRACTICES: [&str; 3] = [
    "PWA best practices",
    "Monitoring patterns",
    "Security guidelines",
];

/// Plans UI components for a set of requirements.
#[derive(Debug, Default)]
pub struct ComponentDesignAgent;

impl ComponentDesignAgent {
    const NAME: &'static str = "component-design";
}

#[async_trait]
impl Agent for ComponentDesignAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new("plan_components", STATIC_OPERATION_TIMEOUT)]
    }

    async fn invoke(
        &self,
        operation: &str,
        input: &OperationInput,
        _ctx: &InvocationContext,
    ) -> Outcome {
        match operation {
            "plan_components" => match input.expect_requirements() {
                Ok(requirements) => Outcome::completed(json!({
                    "agent": Self::NAME,
                    "status": "planned",
                    "requirements": requirements,
                    "components": COMPONENTS,
                    "framework": FRAMEWORK,
                })),
                Err(e) => e.into(),
            },
            other => InvocationError::UnsupportedOperation(other.to_string()).into(),
        }
    }
}

/// Collects best practices relevant to a set of requirements.
#[derive(Debug, Default)]
pub struct DocumentationAgent;

impl DocumentationAgent {
    const NAME: &'static str = "documentation";
}

#[async_trait]
impl Agent for DocumentationAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new(
            "gather_best_practices",
            STATIC_OPERATION_TIMEOUT,
        )]
    }

    async fn invoke(
        &self,
        operation: &str,
        input: &OperationInput,
        _ctx: &InvocationContext,
    ) -> Outcome {
        match operation {
            "gather_best_practices" => match input.expect_requirements() {
                Ok(requirements) => Outcome::completed(json!({
                    "agent": Self::NAME,
                    "status": "gathered",
                    "requirements": requirements,
                    "practices": PRACTICES,
                })),
                Err(e) => e.into(),
            },
            other => InvocationError::UnsupportedOperation(other.to_string()).into(),
        }
    }
}

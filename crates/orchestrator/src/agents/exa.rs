use async_trait::async_trait;
use bmad_core::Outcome;
use serde_json::json;

use crate::agent::{Agent, InvocationContext, OperationInput, OperationSpec};
use crate::error::InvocationError;

use super::STATIC_OPERATION_TIMEOUT;

const NAME: &str = "exa";

/// Competitor research through search. Reports availability only.
#[derive(Debug, Default)]
pub struct ExaAgent;

#[async_trait]
impl Agent for ExaAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new("research_competitors", STATIC_OPERATION_TIMEOUT)]
    }

    async fn invoke(
        &self,
        operation: &str,
        input: &OperationInput,
        _ctx: &InvocationContext,
    ) -> Outcome {
        match operation {
            "research_competitors" => match input.expect_url() {
                Ok(url) => Outcome::completed(json!({
                    "agent": NAME,
                    "url": url.as_str(),
                    "status": "available",
                    "capabilities": ["intelligent_search", "research"],
                })),
                Err(e) => e.into(),
            },
            other => InvocationError::UnsupportedOperation(other.to_string()).into(),
        }
    }
}

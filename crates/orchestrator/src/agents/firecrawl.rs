use async_trait::async_trait;
use bmad_core::Outcome;
use serde_json::json;

use crate::agent::{Agent, InvocationContext, OperationInput, OperationSpec};
use crate::error::InvocationError;

use super::STATIC_OPERATION_TIMEOUT;

const NAME: &str = "firecrawl";

/// Content scraping. Reports availability only; scraping itself runs
/// through external tooling.
#[derive(Debug, Default)]
pub struct FirecrawlAgent;

#[async_trait]
impl Agent for FirecrawlAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new("analyze_content", STATIC_OPERATION_TIMEOUT)]
    }

    async fn invoke(
        &self,
        operation: &str,
        input: &OperationInput,
        _ctx: &InvocationContext,
    ) -> Outcome {
        match operation {
            "analyze_content" => match input.expect_url() {
                Ok(url) => Outcome::completed(json!({
                    "agent": NAME,
                    "url": url.as_str(),
                    "status": "available",
                    "capabilities": ["scraping", "content_extraction"],
                })),
                Err(e) => e.into(),
            },
            other => InvocationError::UnsupportedOperation(other.to_string()).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use url::Url;

    #[tokio::test]
    async fn test_analyze_content() {
        let ctx = InvocationContext::new(NAME.into(), Duration::from_secs(1), CancellationToken::new());
        let input = OperationInput::Url(Url::parse("https://example.test").unwrap());

        let outcome = FirecrawlAgent.invoke("analyze_content", &input, &ctx).await;
        let payload = outcome.payload().unwrap();
        assert_eq!(payload["status"], "available");
        assert_eq!(payload["capabilities"][0], "scraping");
    }
}

//! Request id echo.

use async_trait::async_trait;

use crate::config::RequestIdConfig;
use crate::processing::{MutationBuilder, Processor, ProcessorResult, TransactionContext};

/// Copies the request's `x-request-id` onto the response, so clients can
/// quote it when reporting a problem.
#[derive(Debug, Clone)]
pub struct RequestIdProcessor {
    header: String,
}

impl RequestIdProcessor {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    pub fn from_config(config: &RequestIdConfig) -> Self {
        Self::new(&config.header)
    }
}

impl Default for RequestIdProcessor {
    fn default() -> Self {
        Self::new("x-request-id")
    }
}

#[async_trait]
impl Processor for RequestIdProcessor {
    fn name(&self) -> &str {
        "request_id"
    }

    async fn response_headers(
        &self,
        ctx: &mut TransactionContext,
        mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        let request_id = ctx.request_id();
        if !request_id.is_empty() {
            mutation.set_header(&self.header, request_id);
        }
        Ok(None)
    }
}

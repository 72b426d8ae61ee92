//! Processor plugin contract and the ordered chain that runs it.
//!
//! # Design Decisions
//! - Processors are trait objects behind `Arc`, shared read-only by every
//!   stream; all per-transaction state lives in the context
//! - Hooks default to no-ops so a processor only implements the phases it
//!   cares about
//! - The chain checks the accumulated mutation after every processor, so a
//!   bad header is blamed on the processor that wrote it

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::context::TransactionContext;
use super::error::StreamError;
use super::immediate::ImmediateResponse;
use super::mutation::MutationBuilder;
use super::phase::Phase;

/// Error returned by a processor hook.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// `Ok(None)` continues the chain, `Ok(Some(_))` short-circuits it.
pub type ProcessorResult = Result<Option<ImmediateResponse>, ProcessorError>;

/// Mutation logic invoked on the header phases of every stream.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Name used in logs, metrics and error reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn request_headers(
        &self,
        _ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        Ok(None)
    }

    async fn response_headers(
        &self,
        _ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        Ok(None)
    }
}

/// What the chain decided for one header phase.
#[derive(Debug)]
pub enum ChainOutcome {
    /// Every processor ran; send the accumulated mutation.
    Continue,
    /// A processor short-circuited; send only its response.
    Immediate {
        processor: String,
        response: ImmediateResponse,
    },
}

/// Processors in registration order.
#[derive(Clone, Default)]
pub struct ProcessorChain {
    processors: Vec<Arc<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, processor: Arc<dyn Processor>) {
        self.processors.push(processor);
    }

    /// Builder-style `push`.
    pub fn with(mut self, processor: impl Processor) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run every processor for a header phase, in order.
    ///
    /// Body and trailer phases are a no-op.
    pub async fn run(
        &self,
        phase: Phase,
        ctx: &mut TransactionContext,
        mutation: &mut MutationBuilder,
    ) -> Result<ChainOutcome, StreamError> {
        for processor in &self.processors {
            let result = match phase {
                Phase::RequestHeaders => processor.request_headers(ctx, mutation).await,
                Phase::ResponseHeaders => processor.response_headers(ctx, mutation).await,
                _ => return Ok(ChainOutcome::Continue),
            };

            match result {
                Ok(Some(response)) => {
                    return Ok(ChainOutcome::Immediate {
                        processor: processor.name().to_string(),
                        response,
                    });
                }
                Ok(None) => {}
                Err(source) => {
                    return Err(StreamError::Processor {
                        phase,
                        processor: processor.name().to_string(),
                        source,
                    });
                }
            }

            mutation
                .validate()
                .map_err(|source| StreamError::InvalidMutation {
                    phase,
                    processor: processor.name().to_string(),
                    source,
                })?;
        }
        Ok(ChainOutcome::Continue)
    }
}

impl fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorChain")
            .field("processors", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SetHeader(&'static str, &'static str);

    #[async_trait]
    impl Processor for SetHeader {
        fn name(&self) -> &str {
            "set_header"
        }

        async fn request_headers(
            &self,
            _ctx: &mut TransactionContext,
            mutation: &mut MutationBuilder,
        ) -> ProcessorResult {
            mutation.set_header(self.0, self.1);
            Ok(None)
        }
    }

    struct Deny;

    #[async_trait]
    impl Processor for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        async fn request_headers(
            &self,
            _ctx: &mut TransactionContext,
            _mutation: &mut MutationBuilder,
        ) -> ProcessorResult {
            Ok(Some(ImmediateResponse::new(StatusCode::FORBIDDEN)))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Processor for Counting {
        async fn request_headers(
            &self,
            _ctx: &mut TransactionContext,
            _mutation: &mut MutationBuilder,
        ) -> ProcessorResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    struct Failing;

    #[async_trait]
    impl Processor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn response_headers(
            &self,
            _ctx: &mut TransactionContext,
            _mutation: &mut MutationBuilder,
        ) -> ProcessorResult {
            Err(ProcessorError::Failed("boom".into()))
        }
    }

    struct Tag;

    #[async_trait]
    impl Processor for Tag {
        async fn request_headers(
            &self,
            ctx: &mut TransactionContext,
            _mutation: &mut MutationBuilder,
        ) -> ProcessorResult {
            ctx.metadata_mut().insert("user", "admin");
            Ok(None)
        }
    }

    struct ReadTag(Arc<std::sync::Mutex<Option<String>>>);

    #[async_trait]
    impl Processor for ReadTag {
        async fn request_headers(
            &self,
            ctx: &mut TransactionContext,
            _mutation: &mut MutationBuilder,
        ) -> ProcessorResult {
            let seen = ctx
                .metadata()
                .get("user")
                .and_then(|value| value.as_str())
                .map(str::to_string);
            *self.0.lock().unwrap() = seen;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_metadata_is_the_only_shared_write() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let chain = ProcessorChain::new().with(Tag).with(ReadTag(seen.clone()));
        let mut ctx = TransactionContext::new();
        let mut mutation = MutationBuilder::new();

        chain
            .run(Phase::RequestHeaders, &mut ctx, &mut mutation)
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("admin"));
        assert!(ctx.request_headers().is_empty());
        assert_eq!(ctx.request_header("user"), None);
    }

    #[tokio::test]
    async fn test_runs_in_order() {
        let chain = ProcessorChain::new()
            .with(SetHeader("x-a", "1"))
            .with(SetHeader("x-a", "2"));
        let mut ctx = TransactionContext::new();
        let mut mutation = MutationBuilder::new();

        let outcome = chain
            .run(Phase::RequestHeaders, &mut ctx, &mut mutation)
            .await
            .unwrap();
        assert!(matches!(outcome, ChainOutcome::Continue));
        assert_eq!(mutation.set_headers().len(), 2);
        assert_eq!(mutation.get_header("x-a").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProcessorChain::new()
            .with(Deny)
            .with(Counting(calls.clone()));
        let mut ctx = TransactionContext::new();
        let mut mutation = MutationBuilder::new();

        let outcome = chain
            .run(Phase::RequestHeaders, &mut ctx, &mut mutation)
            .await
            .unwrap();
        match outcome {
            ChainOutcome::Immediate { processor, response } => {
                assert_eq!(processor, "deny");
                assert_eq!(response.status(), StatusCode::FORBIDDEN);
            }
            other => panic!("expected immediate response, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_processor_error_names_processor() {
        let chain = ProcessorChain::new().with(Failing);
        let mut ctx = TransactionContext::new();
        let mut mutation = MutationBuilder::new();

        let err = chain
            .run(Phase::ResponseHeaders, &mut ctx, &mut mutation)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StreamError::Processor { ref processor, phase: Phase::ResponseHeaders, .. } if processor == "failing"
        ));
    }

    #[tokio::test]
    async fn test_invalid_mutation_is_rejected() {
        let chain = ProcessorChain::new().with(SetHeader("bad\nkey", "1"));
        let mut ctx = TransactionContext::new();
        let mut mutation = MutationBuilder::new();

        let err = chain
            .run(Phase::RequestHeaders, &mut ctx, &mut mutation)
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::InvalidMutation { .. }));
    }

    #[tokio::test]
    async fn test_body_phase_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProcessorChain::new().with(Counting(calls.clone()));
        let mut ctx = TransactionContext::new();
        let mut mutation = MutationBuilder::new();

        chain
            .run(Phase::RequestBody, &mut ctx, &mut mutation)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_name_is_type_name() {
        let chain = ProcessorChain::new().with(Counting(Arc::new(AtomicUsize::new(0))));
        assert!(chain.names()[0].ends_with("Counting"));
    }
}

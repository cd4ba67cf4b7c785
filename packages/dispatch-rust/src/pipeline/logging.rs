//! Logging behavior for dispatches.
//!
//! Records dispatch duration and outcome in `tracing` spans. Placed closest to
//! the handler so its timing excludes outer behaviors.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{info_span, Instrument};

use courier_core::{DispatchContext, DispatchError};

use super::{BoxedResponse, Next, PipelineBehavior, RequestEnvelope};

/// Behavior that instruments each dispatch with a `tracing` span.
#[derive(Debug, Clone, Default)]
pub struct LoggingBehavior;

impl LoggingBehavior {
    /// Create the behavior.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineBehavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(
        &self,
        envelope: RequestEnvelope,
        ctx: DispatchContext,
        next: Next,
    ) -> Result<BoxedResponse, DispatchError> {
        let span = info_span!(
            "dispatch",
            request = envelope.request_name(),
            call_id = ctx.call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = next(envelope, ctx).await;
            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;

            let span = tracing::Span::current();
            span.record("duration_ms", duration_ms);
            span.record("outcome", if result.is_ok() { "ok" } else { "error" });

            if let Err(error) = &result {
                tracing::warn!(error = %error, "dispatch failed");
            }
            result
        }
        .instrument(span)
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use courier_core::Request;

    use super::*;

    struct Ping;

    impl Request for Ping {
        type Response = u32;
    }

    fn make_ctx() -> DispatchContext {
        DispatchContext::new(1, std::any::type_name::<Ping>(), 5000)
    }

    #[tokio::test]
    async fn passes_a_successful_response_through_unchanged() {
        let behavior = LoggingBehavior::new();
        let terminal: Next =
            Box::new(|_envelope, _ctx| Box::pin(async { Ok(Box::new(99u32) as BoxedResponse) }));

        let response = behavior
            .handle(RequestEnvelope::new(Ping), make_ctx(), terminal)
            .await
            .unwrap();
        assert_eq!(*response.downcast::<u32>().unwrap(), 99);
    }

    #[tokio::test]
    async fn passes_errors_through_unchanged() {
        let behavior = LoggingBehavior::new();
        let terminal: Next = Box::new(|_envelope, _ctx| {
            Box::pin(async { Err(DispatchError::Internal(anyhow::anyhow!("boom"))) })
        });

        let err = behavior
            .handle(RequestEnvelope::new(Ping), make_ctx(), terminal)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Internal(_)));
    }
}

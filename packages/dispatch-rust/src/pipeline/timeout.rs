//! Timeout behavior for dispatches.
//!
//! Fails dispatches that exceed their `call_timeout_ms` with `DispatchError::Timeout`.

use std::time::Duration;

use async_trait::async_trait;

use courier_core::{DispatchContext, DispatchError};

use super::{BoxedResponse, Next, PipelineBehavior, RequestEnvelope};

/// Behavior that enforces per-dispatch deadlines.
///
/// The deadline is read from each dispatch's `ctx.call_timeout_ms` field,
/// allowing different mediator configurations to use different deadlines.
#[derive(Debug, Clone, Default)]
pub struct TimeoutBehavior;

impl TimeoutBehavior {
    /// Create the behavior.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineBehavior for TimeoutBehavior {
    fn name(&self) -> &'static str {
        "timeout"
    }

    async fn handle(
        &self,
        envelope: RequestEnvelope,
        ctx: DispatchContext,
        next: Next,
    ) -> Result<BoxedResponse, DispatchError> {
        let request = envelope.request_name();
        let timeout_ms = ctx.call_timeout_ms;
        let duration = Duration::from_millis(timeout_ms);
        match tokio::time::timeout(duration, next(envelope, ctx)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(DispatchError::Timeout {
                request,
                timeout_ms,
            }),
        }
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
        type Response = ();
    }

    /// Terminal that sleeps for a configurable delay before responding.
    fn slow_terminal(delay_ms: u64) -> Next {
        Box::new(move |_envelope, _ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Box::new(()) as BoxedResponse)
            })
        })
    }

    fn make_ctx(timeout_ms: u64) -> DispatchContext {
        DispatchContext::new(1, std::any::type_name::<Ping>(), timeout_ms)
    }

    #[tokio::test]
    async fn completes_within_the_deadline() {
        let behavior = TimeoutBehavior::new();
        let response = behavior
            .handle(RequestEnvelope::new(Ping), make_ctx(1000), slow_terminal(10))
            .await
            .unwrap();
        assert!(response.downcast::<()>().is_ok());
    }

    #[tokio::test]
    async fn exceeding_the_deadline_fails_with_timeout() {
        let behavior = TimeoutBehavior::new();
        let err = behavior
            .handle(RequestEnvelope::new(Ping), make_ctx(50), slow_terminal(200))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Timeout { timeout_ms: 50, .. }
        ));
    }
}

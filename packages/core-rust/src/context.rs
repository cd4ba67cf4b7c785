use tokio_util::sync::CancellationToken;

/// Per-dispatch context threaded through the behavior chain to the handler.
///
/// Created by the mediator for every `send`/`publish` call. Cloning is cheap;
/// all clones share the same cancellation token, so a behavior or handler that
/// clones the context still observes the caller's cancellation signal.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// Unique, monotonically increasing identifier for this dispatch.
    pub call_id: u64,
    /// Type name of the request or notification being dispatched.
    pub request: &'static str,
    /// Deadline for this dispatch in milliseconds, enforced by the timeout behavior.
    pub call_timeout_ms: u64,
    /// Caller-supplied cancellation signal, checked at suspension points.
    pub cancellation: CancellationToken,
}

impl DispatchContext {
    /// Create a context with a fresh (never-cancelled) token.
    #[must_use]
    pub fn new(call_id: u64, request: &'static str, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            request,
            call_timeout_ms,
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token with a caller-supplied one.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Whether the caller has requested cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_cancelled() {
        let ctx = DispatchContext::new(1, "test", 5000);
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.call_id, 1);
        assert_eq!(ctx.call_timeout_ms, 5000);
    }

    #[test]
    fn clones_share_the_cancellation_token() {
        let token = CancellationToken::new();
        let ctx = DispatchContext::new(2, "test", 5000).with_cancellation(token.clone());
        let clone = ctx.clone();

        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(clone.is_cancelled());
    }
}

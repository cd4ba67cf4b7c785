/// Failure policy for notification fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPolicy {
    /// The first failing handler aborts the remaining handlers and its error
    /// propagates to the publisher. Predictable for in-process synchronous
    /// fan-out; this is the default.
    AbortOnFirstFailure,
    /// Every handler runs; failures aggregate into
    /// `DispatchError::NotificationDelivery`. Best-effort delivery.
    CollectAllFailures,
}

/// Dispatch-level configuration for the mediator.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Deadline applied to each dispatch in milliseconds, carried on the
    /// `DispatchContext` and enforced by the timeout behavior when installed.
    pub default_call_timeout_ms: u64,
    /// What `publish` does when a notification handler fails.
    pub notification_policy: NotificationPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_call_timeout_ms: 30_000,
            notification_policy: NotificationPolicy::AbortOnFirstFailure,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_aborts_on_first_failure() {
        let config = DispatchConfig::default();
        assert_eq!(
            config.notification_policy,
            NotificationPolicy::AbortOnFirstFailure
        );
        assert_eq!(config.default_call_timeout_ms, 30_000);
    }
}

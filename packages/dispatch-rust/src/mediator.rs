//! The dispatch façade: request/response routing and notification fan-out.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use courier_core::{DispatchContext, DispatchError, Notification, Request};

use crate::config::{DispatchConfig, NotificationPolicy};
use crate::pipeline::{build_chain, Next, PipelineBehavior, RequestEnvelope, ValidationBehavior};
use crate::registry::HandlerRegistry;

/// Routes requests to their single handler through the behavior chain and fans
/// notifications out to all registered handlers.
///
/// Stateless apart from the frozen registry, the assembled chain, and a
/// monotonic call-id counter; safe to share across concurrent callers (wrap in
/// an `Arc`). Each dispatch runs on the caller's task; the mediator introduces
/// no threading of its own.
pub struct Mediator {
    registry: Arc<HandlerRegistry>,
    chain: Vec<Arc<dyn PipelineBehavior>>,
    config: DispatchConfig,
    call_id_counter: AtomicU64,
}

impl Mediator {
    /// Build a mediator over a fully populated registry with default config.
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_config(registry, DispatchConfig::default())
    }

    /// Build a mediator over a fully populated registry.
    ///
    /// Taking the registry by value freezes it: no further registration is
    /// possible, so the read path needs no locking. The chain is the
    /// validation adapter first, then registered behaviors in registration
    /// order; the handler runs innermost.
    #[must_use]
    pub fn with_config(registry: HandlerRegistry, config: DispatchConfig) -> Self {
        let registry = Arc::new(registry);
        let mut chain: Vec<Arc<dyn PipelineBehavior>> =
            vec![Arc::new(ValidationBehavior::new(Arc::clone(&registry)))];
        chain.extend(registry.behaviors().iter().map(Arc::clone));

        let names: Vec<&str> = chain.iter().map(|behavior| behavior.name()).collect();
        tracing::debug!(behaviors = ?names, "behavior chain assembled");

        Self {
            registry,
            chain,
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    /// Generate a unique call ID for each dispatch.
    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Dispatch a request to its single registered handler.
    ///
    /// # Errors
    ///
    /// `DispatchError::HandlerNotFound` when no handler is registered for the
    /// request type, or whatever the behaviors and handler raise.
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response, DispatchError> {
        self.send_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Dispatch a request, racing the behavior chain against a caller-supplied
    /// cancellation token. A cancelled dispatch resolves to
    /// `DispatchError::Cancelled` and the in-flight chain is dropped at its
    /// next suspension point.
    ///
    /// # Errors
    ///
    /// As `send`, plus `DispatchError::Cancelled` when the token fires first.
    pub async fn send_with_cancellation<R: Request>(
        &self,
        request: R,
        cancellation: CancellationToken,
    ) -> Result<R::Response, DispatchError> {
        let entry = self.registry.resolve_request_handler::<R>()?;
        let request_name = entry.request();
        let ctx = DispatchContext::new(
            self.next_call_id(),
            request_name,
            self.config.default_call_timeout_ms,
        )
        .with_cancellation(cancellation.clone());

        tracing::debug!(
            call_id = ctx.call_id,
            request = request_name,
            handler = entry.handler(),
            "dispatching request"
        );

        let terminal: Next = {
            let invoke = entry.invoker();
            Box::new(move |envelope, ctx| invoke(envelope, ctx))
        };
        let chain = build_chain(&self.chain, terminal);
        let in_flight = chain(RequestEnvelope::new(request), ctx.clone());

        let response = tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                return Err(DispatchError::Cancelled { subject: request_name });
            }
            response = in_flight => response?,
        };

        response.downcast::<R::Response>().map(|boxed| *boxed).map_err(|_| {
            DispatchError::Internal(anyhow::anyhow!(
                "response type mismatch for `{request_name}`: a behavior substituted a foreign response type"
            ))
        })
    }

    /// Fan a notification out to all registered handlers, sequentially in
    /// registration order. Zero handlers is a valid no-op. Notifications
    /// bypass the request behavior chain.
    ///
    /// # Errors
    ///
    /// Under `AbortOnFirstFailure` (default), the first handler failure
    /// propagates and remaining handlers never run. Under
    /// `CollectAllFailures`, every handler runs and failures aggregate into
    /// `DispatchError::NotificationDelivery`.
    pub async fn publish<N: Notification>(&self, notification: N) -> Result<(), DispatchError> {
        self.publish_with_cancellation(notification, CancellationToken::new())
            .await
    }

    /// Fan a notification out, checking a caller-supplied cancellation token
    /// before each handler and racing it during each handler call.
    ///
    /// # Errors
    ///
    /// As `publish`, plus `DispatchError::Cancelled` when the token fires.
    pub async fn publish_with_cancellation<N: Notification>(
        &self,
        notification: N,
        cancellation: CancellationToken,
    ) -> Result<(), DispatchError> {
        let notification_name = std::any::type_name::<N>();
        let entries = self.registry.resolve_notification_handlers::<N>();
        if entries.is_empty() {
            tracing::debug!(
                notification = notification_name,
                "no handlers registered, publish is a no-op"
            );
            return Ok(());
        }

        let ctx = DispatchContext::new(
            self.next_call_id(),
            notification_name,
            self.config.default_call_timeout_ms,
        )
        .with_cancellation(cancellation.clone());

        tracing::debug!(
            call_id = ctx.call_id,
            notification = notification_name,
            handlers = entries.len(),
            "publishing notification"
        );

        let payload: Arc<dyn Any + Send + Sync> = Arc::new(notification);
        let mut failures = Vec::new();

        for entry in entries {
            if cancellation.is_cancelled() {
                return Err(DispatchError::Cancelled {
                    subject: notification_name,
                });
            }

            let in_flight = entry.invoke(Arc::clone(&payload), ctx.clone());
            let result = tokio::select! {
                biased;
                () = cancellation.cancelled() => {
                    return Err(DispatchError::Cancelled { subject: notification_name });
                }
                result = in_flight => result,
            };

            match result {
                Ok(()) => {}
                Err(error) => match self.config.notification_policy {
                    NotificationPolicy::AbortOnFirstFailure => return Err(error),
                    NotificationPolicy::CollectAllFailures => {
                        tracing::warn!(
                            notification = notification_name,
                            handler = entry.handler(),
                            error = %error,
                            "notification handler failed, continuing fan-out"
                        );
                        failures.push(error);
                    }
                },
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::NotificationDelivery {
                notification: notification_name,
                failures,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

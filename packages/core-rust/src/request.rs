//! Request/response and notification contracts.
//!
//! A `Request` is routed to exactly one `RequestHandler` and yields a typed
//! response. A `Notification` fans out to zero-or-more `NotificationHandler`s,
//! none of which return a value consumed by the publisher.

use async_trait::async_trait;

use crate::context::DispatchContext;
use crate::error::DispatchError;

/// An immutable value object dispatched to exactly one handler.
///
/// The concrete type identifies the request; the associated `Response` type
/// declares what the handler returns (use `()` for command-style requests with
/// no result).
pub trait Request: Send + 'static {
    /// The value the registered handler produces on success.
    type Response: Send + 'static;
}

/// An immutable event value fanned out to zero-or-more handlers.
///
/// `Sync` is required because a single notification instance is shared by
/// reference across all registered handlers.
pub trait Notification: Send + Sync + 'static {}

/// Handles a single request type. One registration per request type.
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    /// Process the request and produce its response.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError` on failure; domain conditions should use
    /// `DispatchError::Domain`, unexpected failures `DispatchError::Internal`.
    async fn handle(
        &self,
        request: R,
        ctx: &DispatchContext,
    ) -> Result<R::Response, DispatchError>;
}

/// Handles a notification type. Many registrations per notification type.
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    /// React to the notification. Handlers run sequentially in registration order.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError` on failure; the publish failure policy decides
    /// whether remaining handlers still run.
    async fn handle(&self, notification: &N, ctx: &DispatchContext) -> Result<(), DispatchError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Pipeline composition: an ordered list of behaviors folded around a terminal
//! handler invocation.
//!
//! Behaviors decorate request dispatch. Each receives the type-erased request
//! envelope, the dispatch context, and a `next` continuation toward the
//! innermost handler. A behavior may short-circuit by returning without calling
//! `next`, mutate the request payload before forwarding, or transform the
//! response after `next` resolves. Ordering is the registration order supplied
//! at configuration time: first registered runs outermost.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use courier_core::{DispatchContext, DispatchError, Request};

mod logging;
mod timeout;
mod validation;

pub use logging::LoggingBehavior;
pub use timeout::TimeoutBehavior;
pub use validation::ValidationBehavior;

// ---------------------------------------------------------------------------
// Type-erased request/response plumbing
// ---------------------------------------------------------------------------

/// A type-erased handler response, downcast by the mediator on the way out.
pub type BoxedResponse = Box<dyn Any + Send>;

/// The future produced by a behavior or the terminal handler invocation.
pub type BehaviorFuture = BoxFuture<'static, Result<BoxedResponse, DispatchError>>;

/// Continuation toward the innermost handler. Consumed exactly once; a behavior
/// that drops it short-circuits the rest of the chain.
pub type Next = Box<dyn FnOnce(RequestEnvelope, DispatchContext) -> BehaviorFuture + Send>;

/// A request in flight through the behavior chain, with its concrete type erased.
///
/// Behaviors inspect the payload via `downcast_ref`/`downcast_mut`; the
/// terminal invocation reclaims the concrete request with `into_request`.
pub struct RequestEnvelope {
    payload: Box<dyn Any + Send>,
    request: &'static str,
    type_id: TypeId,
}

impl RequestEnvelope {
    /// Wrap a concrete request for dispatch.
    #[must_use]
    pub fn new<R: Request>(request: R) -> Self {
        Self {
            payload: Box::new(request),
            request: std::any::type_name::<R>(),
            type_id: TypeId::of::<R>(),
        }
    }

    /// Type name of the wrapped request, for logs and error messages.
    #[must_use]
    pub fn request_name(&self) -> &'static str {
        self.request
    }

    /// `TypeId` of the wrapped request, the registry lookup key.
    #[must_use]
    pub fn request_type(&self) -> TypeId {
        self.type_id
    }

    /// Borrow the erased payload (e.g. for validators).
    #[must_use]
    pub fn payload(&self) -> &dyn Any {
        self.payload.as_ref()
    }

    /// Mutably borrow the erased payload, letting a behavior transform the
    /// request before forwarding it.
    pub fn payload_mut(&mut self) -> &mut dyn Any {
        self.payload.as_mut()
    }

    /// Reclaim the concrete request.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Internal` if the envelope holds a different
    /// type. Unreachable when the envelope was resolved through the registry,
    /// which keys entries by `TypeId`.
    pub fn into_request<R: Request>(self) -> Result<R, DispatchError> {
        let name = self.request;
        self.payload.downcast::<R>().map(|boxed| *boxed).map_err(|_| {
            DispatchError::Internal(anyhow::anyhow!(
                "request payload type mismatch: envelope holds `{name}`, expected `{}`",
                std::any::type_name::<R>()
            ))
        })
    }
}

impl fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PipelineBehavior
// ---------------------------------------------------------------------------

/// A cross-cutting decorator invoked around a handler call.
#[async_trait]
pub trait PipelineBehavior: Send + Sync {
    /// Short name used in logs (e.g. `"validation"`, `"timeout"`).
    fn name(&self) -> &'static str;

    /// Handle the envelope, forwarding to `next` unless short-circuiting.
    ///
    /// # Errors
    ///
    /// Propagates errors from `next` unchanged, or raises its own (e.g. the
    /// validation behavior raising `DispatchError::Validation`).
    async fn handle(
        &self,
        envelope: RequestEnvelope,
        ctx: DispatchContext,
        next: Next,
    ) -> Result<BoxedResponse, DispatchError>;
}

// ---------------------------------------------------------------------------
// Chain construction
// ---------------------------------------------------------------------------

/// Fold an ordered behavior list around a terminal handler invocation.
///
/// The first behavior in the slice runs outermost; `terminal` runs innermost.
/// The builder introduces no failure modes of its own.
#[must_use]
pub fn build_chain(behaviors: &[Arc<dyn PipelineBehavior>], terminal: Next) -> Next {
    let mut next = terminal;
    for behavior in behaviors.iter().rev() {
        let behavior = Arc::clone(behavior);
        next = Box::new(move |envelope, ctx| {
            Box::pin(async move { behavior.handle(envelope, ctx, next).await })
        });
    }
    next
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

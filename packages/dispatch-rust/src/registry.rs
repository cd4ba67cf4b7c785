//! Type-keyed registration of handlers, validators, and behaviors.
//!
//! Registration is explicit and happens once at startup through `&mut self`;
//! the mediator then freezes the registry behind an `Arc`. The read path needs
//! no locking because no writer exists after startup (single-writer/
//! multi-reader contract enforced by ownership).

use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use courier_core::{
    DispatchContext, DispatchError, Notification, NotificationHandler, Request, RequestHandler,
    ValidationResult, Validator,
};

use crate::pipeline::{BehaviorFuture, BoxedResponse, PipelineBehavior, RequestEnvelope};

// ---------------------------------------------------------------------------
// Type-erased entry plumbing
// ---------------------------------------------------------------------------

type ErasedRequestInvoker =
    Arc<dyn Fn(RequestEnvelope, DispatchContext) -> BehaviorFuture + Send + Sync>;

type ErasedNotificationInvoker = Arc<
    dyn Fn(
            Arc<dyn Any + Send + Sync>,
            DispatchContext,
        ) -> BoxFuture<'static, Result<(), DispatchError>>
        + Send
        + Sync,
>;

pub(crate) type ErasedValidator =
    Box<dyn Fn(&dyn Any) -> Result<ValidationResult, DispatchError> + Send + Sync>;

/// A registered request handler, type-erased for storage.
pub struct RequestHandlerEntry {
    request: &'static str,
    handler: &'static str,
    invoke: ErasedRequestInvoker,
}

impl fmt::Debug for RequestHandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandlerEntry")
            .field("request", &self.request)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl RequestHandlerEntry {
    /// Type name of the request this entry handles.
    #[must_use]
    pub fn request(&self) -> &'static str {
        self.request
    }

    /// Type name of the registered handler, for logs.
    #[must_use]
    pub fn handler(&self) -> &'static str {
        self.handler
    }

    pub(crate) fn invoker(&self) -> ErasedRequestInvoker {
        Arc::clone(&self.invoke)
    }
}

/// A registered notification handler, type-erased for storage.
pub struct NotificationHandlerEntry {
    notification: &'static str,
    handler: &'static str,
    invoke: ErasedNotificationInvoker,
}

impl NotificationHandlerEntry {
    /// Type name of the notification this entry handles.
    #[must_use]
    pub fn notification(&self) -> &'static str {
        self.notification
    }

    /// Type name of the registered handler, for logs.
    #[must_use]
    pub fn handler(&self) -> &'static str {
        self.handler
    }

    pub(crate) fn invoke(
        &self,
        notification: Arc<dyn Any + Send + Sync>,
        ctx: DispatchContext,
    ) -> BoxFuture<'static, Result<(), DispatchError>> {
        (self.invoke)(notification, ctx)
    }
}

// ---------------------------------------------------------------------------
// HandlerRegistry
// ---------------------------------------------------------------------------

/// Maps request and notification types to their registered handlers,
/// validators, and the ordered pipeline behavior list.
#[derive(Default)]
pub struct HandlerRegistry {
    request_handlers: HashMap<TypeId, RequestHandlerEntry>,
    notification_handlers: HashMap<TypeId, Vec<NotificationHandlerEntry>>,
    validators: HashMap<TypeId, Vec<ErasedValidator>>,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single handler for a request type.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::DuplicateHandler` if the request type already
    /// has a handler, regardless of which registration came first.
    pub fn register_request_handler<R, H>(&mut self, handler: H) -> Result<(), DispatchError>
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let request = std::any::type_name::<R>();
        match self.request_handlers.entry(TypeId::of::<R>()) {
            Entry::Occupied(_) => Err(DispatchError::DuplicateHandler { request }),
            Entry::Vacant(slot) => {
                let handler = Arc::new(handler);
                let invoke: ErasedRequestInvoker =
                    Arc::new(move |envelope: RequestEnvelope, ctx: DispatchContext| {
                        let handler = Arc::clone(&handler);
                        Box::pin(async move {
                            let request = envelope.into_request::<R>()?;
                            let response = handler.handle(request, &ctx).await?;
                            Ok(Box::new(response) as BoxedResponse)
                        })
                    });
                slot.insert(RequestHandlerEntry {
                    request,
                    handler: std::any::type_name::<H>(),
                    invoke,
                });
                Ok(())
            }
        }
    }

    /// Register a handler for a notification type. Append-only; fan-out runs
    /// handlers in registration order.
    pub fn register_notification_handler<N, H>(&mut self, handler: H)
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
    {
        let notification = std::any::type_name::<N>();
        let handler_name = std::any::type_name::<H>();
        let handler = Arc::new(handler);
        let invoke: ErasedNotificationInvoker =
            Arc::new(move |payload: Arc<dyn Any + Send + Sync>, ctx: DispatchContext| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    match payload.downcast::<N>() {
                        Ok(notification) => handler.handle(&notification, &ctx).await,
                        Err(_) => Err(DispatchError::Internal(anyhow::anyhow!(
                            "notification payload type mismatch, expected `{}`",
                            std::any::type_name::<N>()
                        ))),
                    }
                })
            });
        self.notification_handlers
            .entry(TypeId::of::<N>())
            .or_default()
            .push(NotificationHandlerEntry {
                notification,
                handler: handler_name,
                invoke,
            });
    }

    /// Register a validator for a request type. Append-only; all validators
    /// for a type run and their results merge.
    pub fn register_validator<R, V>(&mut self, validator: V)
    where
        R: Request,
        V: Validator<R> + 'static,
    {
        self.validators
            .entry(TypeId::of::<R>())
            .or_default()
            .push(Box::new(move |payload: &dyn Any| {
                payload
                    .downcast_ref::<R>()
                    .map(|request| validator.validate(request))
                    .ok_or_else(|| {
                        DispatchError::Internal(anyhow::anyhow!(
                            "validator payload type mismatch, expected `{}`",
                            std::any::type_name::<R>()
                        ))
                    })
            }));
    }

    /// Append a behavior to the pipeline. Registration order is execution
    /// order: first registered runs outermost.
    pub fn register_behavior<B>(&mut self, behavior: B)
    where
        B: PipelineBehavior + 'static,
    {
        self.behaviors.push(Arc::new(behavior));
    }

    /// Resolve the single handler for a request type.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::HandlerNotFound` if no handler is registered.
    pub fn resolve_request_handler<R: Request>(
        &self,
    ) -> Result<&RequestHandlerEntry, DispatchError> {
        self.request_handlers
            .get(&TypeId::of::<R>())
            .ok_or(DispatchError::HandlerNotFound {
                request: std::any::type_name::<R>(),
            })
    }

    /// Resolve all handlers for a notification type, in registration order.
    /// An empty slice is valid and makes `publish` a no-op.
    #[must_use]
    pub fn resolve_notification_handlers<N: Notification>(&self) -> &[NotificationHandlerEntry] {
        self.notification_handlers
            .get(&TypeId::of::<N>())
            .map_or(&[], Vec::as_slice)
    }

    pub(crate) fn validators_for(&self, request_type: TypeId) -> &[ErasedValidator] {
        self.validators
            .get(&request_type)
            .map_or(&[], Vec::as_slice)
    }

    /// The registered pipeline behaviors, in registration order.
    #[must_use]
    pub fn behaviors(&self) -> &[Arc<dyn PipelineBehavior>] {
        &self.behaviors
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

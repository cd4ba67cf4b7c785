//! Courier Dispatch — the in-process mediator engine.
//!
//! This crate implements the dispatch pipeline:
//!
//! 1. **Registry** (`registry`): type-keyed handler, validator, and behavior
//!    registration; frozen after startup.
//! 2. **Pipeline** (`pipeline`): ordered behavior chain composed around a
//!    terminal handler invocation, plus built-in validation, logging, and
//!    timeout behaviors.
//! 3. **Mediator** (`mediator`): `send` routes a request to its single handler
//!    through the chain; `publish` fans a notification out to all handlers.
//! 4. **Boundary** (`boundary`): translates dispatch errors into classified,
//!    externally-safe responses with status codes.

pub mod boundary;
pub mod config;
pub mod mediator;
pub mod pipeline;
pub mod registry;

// Re-export key types for convenient access.
pub use boundary::{classify, ClassifiedError, DispatchBoundary};
pub use config::{DispatchConfig, NotificationPolicy};
pub use courier_core::{
    DispatchContext, DispatchError, DomainError, FieldFailure, Notification,
    NotificationHandler, Request, RequestHandler, ValidationResult, Validator,
};
pub use mediator::Mediator;
pub use pipeline::{
    BoxedResponse, LoggingBehavior, Next, PipelineBehavior, RequestEnvelope, TimeoutBehavior,
    ValidationBehavior,
};
pub use registry::HandlerRegistry;

//! Courier Core — request/notification contracts, validation, and the dispatch error taxonomy.

pub mod context;
pub mod error;
pub mod request;
pub mod validation;

pub use context::DispatchContext;
pub use error::{DispatchError, DomainError};
pub use request::{Notification, NotificationHandler, Request, RequestHandler};
pub use validation::{FieldFailure, ValidationResult, Validator};

//! The dispatch error taxonomy.
//!
//! Configuration errors (`HandlerNotFound`, `DuplicateHandler`) are fatal and
//! surface at startup or first dispatch. `Validation` and `Domain` errors are
//! expected and recoverable. `Cancelled` is surfaced distinctly, not as a
//! failure. Everything else collapses into `Internal`, which the boundary logs
//! server-side and never leaks verbatim.

use crate::validation::ValidationResult;

// ---------------------------------------------------------------------------
// DomainError
// ---------------------------------------------------------------------------

/// Expected business-rule failures raised by handlers.
///
/// The detail string exists for server-side logs; the error boundary maps each
/// variant to a bare status and never forwards the detail to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The request conflicts with current state (e.g. a uniqueness violation).
    #[error("conflict: {0}")]
    Conflict(String),
    /// The caller is not allowed to perform this request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Errors produced anywhere along a dispatch: registry, behaviors, or handler.
///
/// The mediator and the behavior chain never catch or reinterpret these; only
/// the error boundary translates them into an externally visible shape.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler registered for the request type (configuration error).
    #[error("no handler registered for `{request}`")]
    HandlerNotFound { request: &'static str },

    /// A second handler was registered for the request type (configuration error).
    #[error("a handler is already registered for `{request}`")]
    DuplicateHandler { request: &'static str },

    /// One or more validators rejected the request; the handler never ran.
    #[error("validation failed for `{request}`: {result}")]
    Validation {
        request: &'static str,
        result: ValidationResult,
    },

    /// An expected business-rule failure raised by a handler.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The caller's cancellation token fired before the dispatch completed.
    /// `subject` is the request or notification type name.
    #[error("dispatch of `{subject}` was cancelled")]
    Cancelled { subject: &'static str },

    /// The dispatch exceeded its `call_timeout_ms` deadline.
    #[error("dispatch of `{request}` timed out after {timeout_ms}ms")]
    Timeout {
        request: &'static str,
        timeout_ms: u64,
    },

    /// One or more notification handlers failed under the collect-all policy.
    #[error(
        "{failed} notification handler(s) failed for `{notification}`",
        failed = .failures.len()
    )]
    NotificationDelivery {
        notification: &'static str,
        failures: Vec<DispatchError>,
    },

    /// An unexpected failure; logged in full server-side, surfaced opaquely.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// Whether this error is a registry configuration error rather than a
    /// runtime condition.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::HandlerNotFound { .. } | Self::DuplicateHandler { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_not_found_names_the_request() {
        let err = DispatchError::HandlerNotFound { request: "GetWidget" };
        assert_eq!(err.to_string(), "no handler registered for `GetWidget`");
        assert!(err.is_configuration());
    }

    #[test]
    fn domain_errors_pass_through_transparently() {
        let err = DispatchError::from(DomainError::NotFound("widget 42".to_string()));
        assert_eq!(err.to_string(), "not found: widget 42");
        assert!(!err.is_configuration());
    }

    #[test]
    fn validation_error_summarizes_failures() {
        let result = ValidationResult::failure("name", "required", "missing");
        let err = DispatchError::Validation {
            request: "CreateWidget",
            result,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("CreateWidget"));
        assert!(rendered.contains("name[required]"));
    }

    #[test]
    fn cancelled_names_the_dispatched_subject() {
        // The subject may be a notification type just as well as a request.
        let err = DispatchError::Cancelled {
            subject: "WidgetCreated",
        };
        assert_eq!(err.to_string(), "dispatch of `WidgetCreated` was cancelled");
    }

    #[test]
    fn notification_delivery_counts_failures() {
        let err = DispatchError::NotificationDelivery {
            notification: "WidgetCreated",
            failures: vec![
                DispatchError::Internal(anyhow::anyhow!("boom")),
                DispatchError::from(DomainError::Conflict("dup".to_string())),
            ],
        };
        assert_eq!(
            err.to_string(),
            "2 notification handler(s) failed for `WidgetCreated`"
        );
    }

    #[test]
    fn anyhow_converts_to_internal() {
        let err: DispatchError = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, DispatchError::Internal(_)));
        assert_eq!(err.to_string(), "internal error: connection reset");
    }
}

//! Error classification: converts `DispatchError` into externally-safe
//! responses with status codes.
//!
//! This is the single place an internal error becomes externally visible.
//! Expected conditions map to their client-error statuses; everything
//! unclassified collapses into `Internal` with a fixed opaque message — the
//! underlying cause is logged server-side, never forwarded to the caller.

use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use courier_core::{DispatchError, DomainError, FieldFailure, Notification, Request};

use crate::mediator::Mediator;

// ---------------------------------------------------------------------------
// ClassifiedError
// ---------------------------------------------------------------------------

/// Nginx convention for a caller that went away before the response.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// A structured, externally-safe representation of a dispatch failure.
///
/// The `Display` text is the stable, sanitized message hosts may forward to
/// callers; `status()` and `payload()` give the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedError {
    /// One or more fields failed validation; the failure set is the payload.
    #[error("validation failed")]
    Validation { failures: Vec<FieldFailure> },
    /// The addressed resource does not exist. Carries no payload.
    #[error("resource not found")]
    NotFound,
    /// The request conflicts with current state.
    #[error("conflict with current state")]
    Conflict,
    /// The caller is not allowed to perform this request.
    #[error("unauthorized")]
    Unauthorized,
    /// The caller cancelled the dispatch; not a failure.
    #[error("request cancelled by caller")]
    Cancelled,
    /// The dispatch exceeded its deadline.
    #[error("request timed out")]
    Timeout,
    /// The server is misconfigured for this request (missing or duplicate
    /// handler registration). Distinct from a domain `NotFound`.
    #[error("server configuration error")]
    Configuration,
    /// An unexpected failure. The message is deliberately opaque.
    #[error("an internal error occurred")]
    Internal,
}

impl ClassifiedError {
    /// The HTTP-like status code attached to this classification.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Configuration | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The serializable response body for this classification.
    ///
    /// `NotFound` carries an empty (null) payload; validation failures carry
    /// the field-level failure set; everything else carries only the sanitized
    /// message.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Validation { failures } => json!({
                "message": self.to_string(),
                "errors": failures,
            }),
            Self::NotFound => Value::Null,
            _ => json!({ "message": self.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Translate a dispatch error into its external classification.
///
/// Internal and configuration failures are logged here at error level with
/// full detail; their classifications carry only opaque text. No error leaves
/// this function unclassified.
#[must_use]
pub fn classify(error: DispatchError) -> ClassifiedError {
    match error {
        DispatchError::Validation { request, result } => {
            tracing::debug!(request, failures = result.failures().len(), "validation failure");
            ClassifiedError::Validation {
                failures: result.into_failures(),
            }
        }
        DispatchError::Domain(DomainError::NotFound(detail)) => {
            tracing::debug!(%detail, "domain not-found");
            ClassifiedError::NotFound
        }
        DispatchError::Domain(DomainError::Conflict(detail)) => {
            tracing::debug!(%detail, "domain conflict");
            ClassifiedError::Conflict
        }
        DispatchError::Domain(DomainError::Unauthorized(detail)) => {
            tracing::warn!(%detail, "unauthorized request");
            ClassifiedError::Unauthorized
        }
        DispatchError::Cancelled { subject } => {
            tracing::debug!(subject, "dispatch cancelled by caller");
            ClassifiedError::Cancelled
        }
        DispatchError::Timeout { request, timeout_ms } => {
            tracing::warn!(request, timeout_ms, "dispatch timed out");
            ClassifiedError::Timeout
        }
        DispatchError::HandlerNotFound { request } => {
            tracing::error!(request, "no handler registered");
            ClassifiedError::Configuration
        }
        DispatchError::DuplicateHandler { request } => {
            tracing::error!(request, "duplicate handler registration reached dispatch");
            ClassifiedError::Configuration
        }
        DispatchError::NotificationDelivery {
            notification,
            failures,
        } => {
            for failure in &failures {
                tracing::error!(notification, error = %failure, "notification handler failed");
            }
            ClassifiedError::Internal
        }
        DispatchError::Internal(cause) => {
            tracing::error!(error = ?cause, "internal dispatch error");
            ClassifiedError::Internal
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchBoundary
// ---------------------------------------------------------------------------

/// The scoped try/translate region around every inbound call.
///
/// Hosts route all `send`/`publish` traffic through this wrapper so that every
/// dispatch resolves to either a typed response or a `ClassifiedError` with a
/// stable status/payload shape.
#[derive(Clone)]
pub struct DispatchBoundary {
    mediator: Arc<Mediator>,
}

impl DispatchBoundary {
    /// Wrap a shared mediator.
    #[must_use]
    pub fn new(mediator: Arc<Mediator>) -> Self {
        Self { mediator }
    }

    /// Dispatch a request, classifying any failure.
    ///
    /// # Errors
    ///
    /// Returns the classification of whatever the dispatch raised.
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response, ClassifiedError> {
        self.mediator.send(request).await.map_err(classify)
    }

    /// Dispatch a request with a cancellation token, classifying any failure.
    ///
    /// # Errors
    ///
    /// As `send`; a cancelled dispatch classifies as `Cancelled`.
    pub async fn send_with_cancellation<R: Request>(
        &self,
        request: R,
        cancellation: CancellationToken,
    ) -> Result<R::Response, ClassifiedError> {
        self.mediator
            .send_with_cancellation(request, cancellation)
            .await
            .map_err(classify)
    }

    /// Publish a notification, classifying any failure.
    ///
    /// # Errors
    ///
    /// Returns the classification of whatever the fan-out raised.
    pub async fn publish<N: Notification>(&self, notification: N) -> Result<(), ClassifiedError> {
        self.mediator.publish(notification).await.map_err(classify)
    }

    /// Publish a notification with a cancellation token, classifying any failure.
    ///
    /// # Errors
    ///
    /// As `publish`; a cancelled fan-out classifies as `Cancelled`.
    pub async fn publish_with_cancellation<N: Notification>(
        &self,
        notification: N,
        cancellation: CancellationToken,
    ) -> Result<(), ClassifiedError> {
        self.mediator
            .publish_with_cancellation(notification, cancellation)
            .await
            .map_err(classify)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use courier_core::ValidationResult;

    use super::*;

    #[test]
    fn validation_maps_to_bad_request_with_the_failure_set() {
        let result = ValidationResult::failure("name", "required", "name must not be empty");
        let classified = classify(DispatchError::Validation {
            request: "CreateWidget",
            result,
        });

        assert_eq!(classified.status(), StatusCode::BAD_REQUEST);
        let payload = classified.payload();
        assert_eq!(payload["errors"][0]["field"], "name");
        assert_eq!(payload["errors"][0]["code"], "required");
    }

    #[test]
    fn domain_not_found_maps_to_404_with_an_empty_payload() {
        let classified = classify(DomainError::NotFound("widget 42, shard 3".to_string()).into());
        assert_eq!(classified, ClassifiedError::NotFound);
        assert_eq!(classified.status(), StatusCode::NOT_FOUND);
        // The internal detail ("shard 3") must not leak.
        assert_eq!(classified.payload(), Value::Null);
    }

    #[test]
    fn conflict_and_unauthorized_map_to_their_statuses() {
        let conflict = classify(DomainError::Conflict("dup key".to_string()).into());
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let unauthorized = classify(DomainError::Unauthorized("role".to_string()).into());
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn cancelled_maps_to_client_closed_request() {
        let classified = classify(DispatchError::Cancelled { subject: "GetWidget" });
        assert_eq!(classified, ClassifiedError::Cancelled);
        assert_eq!(classified.status().as_u16(), 499);
    }

    #[test]
    fn timeout_maps_to_request_timeout() {
        let classified = classify(DispatchError::Timeout {
            request: "GetWidget",
            timeout_ms: 50,
        });
        assert_eq!(classified.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn handler_not_found_is_a_configuration_error_distinct_from_domain_not_found() {
        let classified = classify(DispatchError::HandlerNotFound { request: "GetWidget" });
        assert_eq!(classified, ClassifiedError::Configuration);
        assert_ne!(classified, ClassifiedError::NotFound);
        assert_eq!(classified.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_errors_surface_an_opaque_message_only() {
        let secret = "password=hunter2 in connection string";
        let classified = classify(DispatchError::Internal(anyhow::anyhow!("{secret}")));

        assert_eq!(classified, ClassifiedError::Internal);
        assert_eq!(classified.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let rendered = serde_json::to_string(&classified.payload()).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert_eq!(
            classified.payload()["message"],
            "an internal error occurred"
        );
    }

    #[test]
    fn aggregated_notification_failures_classify_as_internal() {
        let classified = classify(DispatchError::NotificationDelivery {
            notification: "WidgetCreated",
            failures: vec![DispatchError::Internal(anyhow::anyhow!("boom"))],
        });
        assert_eq!(classified, ClassifiedError::Internal);
    }

    #[test]
    fn classification_serializes_with_a_kind_tag() {
        let classified = ClassifiedError::Validation {
            failures: vec![FieldFailure::new("name", "required", "missing")],
        };
        let json = serde_json::to_value(&classified).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["failures"][0]["field"], "name");
    }
}

//! Validation behavior: runs every validator registered for the request type
//! and short-circuits dispatch when any of them fail.

use std::sync::Arc;

use async_trait::async_trait;

use courier_core::{DispatchContext, DispatchError, ValidationResult};

use crate::registry::HandlerRegistry;

use super::{BoxedResponse, Next, PipelineBehavior, RequestEnvelope};

/// The behavior the mediator installs outermost in every request chain.
///
/// Validators are independent and order-insensitive; all of them run and their
/// results merge, so a single round trip reports every failing field. With no
/// validators registered (or all passing) the inner chain runs unmodified.
pub struct ValidationBehavior {
    registry: Arc<HandlerRegistry>,
}

impl ValidationBehavior {
    /// Create the behavior over a frozen registry.
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl PipelineBehavior for ValidationBehavior {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        envelope: RequestEnvelope,
        ctx: DispatchContext,
        next: Next,
    ) -> Result<BoxedResponse, DispatchError> {
        let mut merged = ValidationResult::valid();
        for validator in self.registry.validators_for(envelope.request_type()) {
            merged.merge(validator(envelope.payload())?);
        }

        if merged.is_valid() {
            return next(envelope, ctx).await;
        }

        tracing::debug!(
            call_id = ctx.call_id,
            request = envelope.request_name(),
            failures = merged.failures().len(),
            "validation rejected request"
        );
        Err(DispatchError::Validation {
            request: envelope.request_name(),
            result: merged,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use courier_core::Request;

    use super::*;

    struct CreateWidget {
        name: String,
        quantity: u32,
    }

    impl Request for CreateWidget {
        type Response = u64;
    }

    fn counting_terminal(counter: Arc<AtomicU32>) -> Next {
        Box::new(move |_envelope, _ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(Box::new(7u64) as BoxedResponse) })
        })
    }

    fn make_ctx() -> DispatchContext {
        DispatchContext::new(1, std::any::type_name::<CreateWidget>(), 5000)
    }

    fn make_envelope(name: &str, quantity: u32) -> RequestEnvelope {
        RequestEnvelope::new(CreateWidget {
            name: name.to_string(),
            quantity,
        })
    }

    fn registry_with_validators() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register_validator::<CreateWidget, _>(|request: &CreateWidget| {
            if request.name.is_empty() {
                ValidationResult::failure("name", "required", "name must not be empty")
            } else {
                ValidationResult::valid()
            }
        });
        registry.register_validator::<CreateWidget, _>(|request: &CreateWidget| {
            if request.quantity == 0 {
                ValidationResult::failure("quantity", "min", "quantity must be at least 1")
            } else {
                ValidationResult::valid()
            }
        });
        registry
    }

    #[tokio::test]
    async fn merges_failures_from_all_validators_and_skips_the_handler() {
        let registry = Arc::new(registry_with_validators());
        let behavior = ValidationBehavior::new(registry);
        let invoked = Arc::new(AtomicU32::new(0));

        let err = behavior
            .handle(
                make_envelope("", 0),
                make_ctx(),
                counting_terminal(invoked.clone()),
            )
            .await
            .unwrap_err();

        let DispatchError::Validation { result, .. } = err else {
            panic!("expected a validation error");
        };
        let fields: Vec<&str> = result
            .failures()
            .iter()
            .map(|failure| failure.field.as_str())
            .collect();
        assert_eq!(fields, vec!["name", "quantity"]);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passing_validators_invoke_the_inner_chain_exactly_once() {
        let registry = Arc::new(registry_with_validators());
        let behavior = ValidationBehavior::new(registry);
        let invoked = Arc::new(AtomicU32::new(0));

        let response = behavior
            .handle(
                make_envelope("gear", 3),
                make_ctx(),
                counting_terminal(invoked.clone()),
            )
            .await
            .unwrap();

        assert_eq!(*response.downcast::<u64>().unwrap(), 7);
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_registered_validators_means_no_short_circuit() {
        let registry = Arc::new(HandlerRegistry::new());
        let behavior = ValidationBehavior::new(registry);
        let invoked = Arc::new(AtomicU32::new(0));

        behavior
            .handle(
                make_envelope("", 0),
                make_ctx(),
                counting_terminal(invoked.clone()),
            )
            .await
            .unwrap();
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }
}

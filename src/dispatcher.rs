use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::error::{DeliveryOutcome, HandlerFailure, RecipeError};
use crate::recipe::Recipe;
use crate::registry::EventRegistry;
use crate::signing::Verification;
use crate::telemetry::{
    metric_inc, metric_inc_event, metric_inc_recipe, trace_completed, trace_handler_failed,
    trace_invoking, trace_received, trace_rejected, trace_routed,
};
use crate::types::{DeliveryId, EventName, Payload};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Header carrying the event name.
    pub event_header: String,
    /// Header carrying the platform's delivery id (logging only).
    pub delivery_header: String,
    /// Optional deadline applied to each handler separately.
    pub handler_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            event_header: "X-GitHub-Event".to_string(),
            delivery_header: "X-GitHub-Delivery".to_string(),
            handler_timeout: None,
        }
    }
}

impl DispatcherConfig {
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    pub fn with_event_header(mut self, header: impl Into<String>) -> Self {
        self.event_header = header.into();
        self
    }
}

/// Header values relevant to one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryHeaders {
    pub signature: Option<String>,
    pub event: Option<String>,
    pub delivery_id: Option<DeliveryId>,
}

impl DeliveryHeaders {
    /// Pick the signature, event and delivery headers out of `headers`.
    ///
    /// Header names compare case-insensitively. A `None` signature header
    /// name skips signature extraction.
    pub fn parse<'a, I>(
        headers: I,
        signature_header: Option<&str>,
        event_header: &str,
        delivery_header: &str,
    ) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut parsed = DeliveryHeaders::default();

        for (name, value) in headers {
            if signature_header.is_some_and(|h| name.eq_ignore_ascii_case(h)) {
                parsed.signature = Some(value.to_string());
            } else if name.eq_ignore_ascii_case(event_header) {
                parsed.event = Some(value.to_string());
            } else if name.eq_ignore_ascii_case(delivery_header) {
                parsed.delivery_id = Some(DeliveryId(value.to_string()));
            }
        }

        parsed
    }
}

/// Turns one inbound webhook delivery into zero or more recipe invocations.
///
/// Stateless across deliveries; share it behind an `Arc` and call
/// [`Dispatcher::handle_delivery`] from as many tasks as needed.
pub struct Dispatcher {
    verification: Verification,
    registry: EventRegistry,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(verification: impl Into<Verification>, config: DispatcherConfig) -> Self {
        Self {
            verification: verification.into(),
            registry: EventRegistry::new(),
            config,
        }
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Append `handlers` for `event`, preserving order.
    pub async fn register_handlers<I>(&self, event: impl Into<EventName>, handlers: I)
    where
        I: IntoIterator<Item = Arc<dyn Recipe>>,
    {
        self.registry.register(event, handlers).await;
    }

    /// Register `recipe` for each event it declares.
    pub async fn register_recipe(&self, recipe: Arc<dyn Recipe>) -> Vec<EventName> {
        self.registry.register_recipe(recipe).await
    }

    /// Extract the relevant headers and run [`Dispatcher::handle_delivery`].
    pub async fn handle_request<'a, I>(&self, headers: I, raw_body: &[u8]) -> DeliveryOutcome
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let parsed = DeliveryHeaders::parse(
            headers,
            self.verification.header_name(),
            &self.config.event_header,
            &self.config.delivery_header,
        );
        trace_received(parsed.delivery_id.as_ref(), parsed.event.as_deref());

        self.handle_delivery(raw_body, parsed.signature.as_deref(), parsed.event.as_deref())
            .await
    }

    /// Verify, decode and route one delivery.
    ///
    /// `raw_body` must be the request body exactly as received. Verification
    /// and event identification failures return before any handler runs;
    /// handler failures are collected and every handler still runs.
    pub async fn handle_delivery(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
        event_name: Option<&str>,
    ) -> DeliveryOutcome {
        metric_inc("webhook.delivery.received");

        if let Verification::Enabled(verifier) = &self.verification {
            if let Err(err) = verifier.verify(raw_body, signature_header) {
                metric_inc("webhook.signature.rejected");
                trace_rejected("verify", &err);
                return DeliveryOutcome::SignatureInvalid(err);
            }
        }

        let event = match event_name.filter(|name| !name.is_empty()) {
            Some(name) => EventName::from(name),
            None => {
                metric_inc("webhook.event.missing");
                trace_rejected("identify", &"no event provided");
                return DeliveryOutcome::NoEventHeader;
            }
        };

        let payload = match Payload::from_slice(raw_body) {
            Ok(payload) => payload,
            Err(err) => {
                metric_inc("webhook.payload.malformed");
                trace_rejected("decode", &err);
                return DeliveryOutcome::MalformedPayload(err.to_string());
            }
        };

        let handlers = self.registry.lookup(&event).await;
        trace_routed(&event, handlers.len());

        let mut succeeded = Vec::with_capacity(handlers.len());
        let mut failures = Vec::new();

        for handler in handlers {
            let recipe = handler.id();
            trace_invoking(&event, &recipe);
            match self.invoke(handler.as_ref(), &payload).await {
                Ok(()) => {
                    metric_inc_recipe("webhook.handler.success", &recipe);
                    succeeded.push(recipe);
                }
                Err(error) => {
                    metric_inc_recipe("webhook.handler.failure", &recipe);
                    trace_handler_failed(&event, &recipe, &error);
                    failures.push(HandlerFailure { recipe, error });
                }
            }
        }

        trace_completed(&event, succeeded.len(), failures.len());

        if failures.is_empty() {
            metric_inc_event("webhook.delivery.success", &event);
            DeliveryOutcome::Success {
                handlers_run: succeeded.len(),
            }
        } else {
            metric_inc_event("webhook.delivery.failure", &event);
            DeliveryOutcome::PartialHandlerFailure {
                event,
                succeeded,
                failures,
            }
        }
    }

    /// Run one handler; panics and overruns become errors.
    async fn invoke(&self, handler: &dyn Recipe, payload: &Payload) -> Result<(), RecipeError> {
        // Hand-written impls may panic before returning their future.
        let call = AssertUnwindSafe(async move { handler.invoke(payload).await }).catch_unwind();

        let result = match self.config.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(RecipeError::Timeout(limit)),
            },
            None => call.await,
        };

        result.unwrap_or_else(|panic| Err(RecipeError::Panicked(panic_message(panic.as_ref()))))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

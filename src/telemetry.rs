// Helpers compile to no-ops unless the matching feature is enabled.

use crate::types::{DeliveryId, EventName, RecipeId};

#[cfg(feature = "metrics")]
pub(crate) fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn metric_inc(_name: &'static str) {}

#[cfg(feature = "metrics")]
pub(crate) fn metric_inc_event(name: &'static str, event: &EventName) {
    metrics::increment_counter!(name, "event" => event.0.clone());
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn metric_inc_event(_name: &'static str, _event: &EventName) {}

#[cfg(feature = "metrics")]
pub(crate) fn metric_inc_recipe(name: &'static str, recipe: &RecipeId) {
    metrics::increment_counter!(name, "recipe" => recipe.0.clone());
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn metric_inc_recipe(_name: &'static str, _recipe: &RecipeId) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_rejected(stage: &'static str, reason: &dyn std::fmt::Display) {
    tracing::warn!(stage, reason = %reason, "webhook delivery rejected");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_rejected(_stage: &'static str, _reason: &dyn std::fmt::Display) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_received(delivery: Option<&DeliveryId>, event: Option<&str>) {
    tracing::debug!(
        delivery = delivery.map(|d| d.0.as_str()).unwrap_or("-"),
        event = event.unwrap_or("-"),
        "received webhook"
    );
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_received(_delivery: Option<&DeliveryId>, _event: Option<&str>) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_routed(event: &EventName, handlers: usize) {
    if handlers == 0 {
        tracing::debug!(event = %event, "no handlers registered for event");
    } else {
        tracing::debug!(event = %event, handlers, "dispatching event");
    }
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_routed(_event: &EventName, _handlers: usize) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_invoking(event: &EventName, recipe: &RecipeId) {
    tracing::debug!(event = %event, recipe = %recipe, "invoking recipe");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_invoking(_event: &EventName, _recipe: &RecipeId) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_handler_failed(event: &EventName, recipe: &RecipeId, error: &dyn std::fmt::Display) {
    tracing::warn!(event = %event, recipe = %recipe, error = %error, "recipe failed");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_handler_failed(_event: &EventName, _recipe: &RecipeId, _error: &dyn std::fmt::Display) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_completed(event: &EventName, succeeded: usize, failed: usize) {
    tracing::info!(event = %event, succeeded, failed, "webhook delivery processed");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_completed(_event: &EventName, _succeeded: usize, _failed: usize) {}

#[cfg(feature = "tracing")]
pub(crate) fn trace_skipped(recipe: &'static str, reason: &'static str) {
    tracing::debug!(recipe, reason, "recipe skipped");
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn trace_skipped(_recipe: &'static str, _reason: &'static str) {}

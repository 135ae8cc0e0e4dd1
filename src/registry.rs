use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::recipe::Recipe;
use crate::types::EventName;

/// Event name to ordered handler list.
///
/// Populated during setup and read on every delivery. `lookup` returns a
/// snapshot, so the lock is never held while a handler runs, and a late
/// registration cannot disturb a delivery already in progress.
#[derive(Default)]
pub struct EventRegistry {
    handlers: RwLock<HashMap<EventName, Vec<Arc<dyn Recipe>>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handlers` to the list for `event`, creating it if absent.
    ///
    /// Never deduplicates: a handler registered twice runs twice.
    pub async fn register<I>(&self, event: impl Into<EventName>, handlers: I)
    where
        I: IntoIterator<Item = Arc<dyn Recipe>>,
    {
        let mut guard = self.handlers.write().await;
        guard.entry(event.into()).or_default().extend(handlers);
    }

    /// Register `recipe` for every event it declares.
    ///
    /// Returns the events it was registered for.
    pub async fn register_recipe(&self, recipe: Arc<dyn Recipe>) -> Vec<EventName> {
        let events = recipe.events();
        let mut guard = self.handlers.write().await;
        for event in &events {
            guard.entry(event.clone()).or_default().push(recipe.clone());
        }
        events
    }

    /// Handlers for `event` in registration order; empty when unknown.
    pub async fn lookup(&self, event: &EventName) -> Vec<Arc<dyn Recipe>> {
        let guard = self.handlers.read().await;
        guard.get(event).cloned().unwrap_or_default()
    }

    pub async fn handler_count(&self, event: &EventName) -> usize {
        let guard = self.handlers.read().await;
        guard.get(event).map_or(0, Vec::len)
    }

    /// Registered event names, sorted.
    pub async fn events(&self) -> Vec<EventName> {
        let guard = self.handlers.read().await;
        let mut events: Vec<_> = guard.keys().cloned().collect();
        events.sort();
        events
    }
}

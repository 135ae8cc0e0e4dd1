use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::RecipeError;
use crate::types::{EventName, Payload, RecipeId};

/// A unit of business logic invoked with an event payload.
///
/// The dispatcher treats recipes as opaque: it passes the payload through
/// and records whether `invoke` succeeded.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use webhook_recipes::{Payload, Recipe, RecipeError, RecipeId};
///
/// struct Hello;
///
/// #[async_trait]
/// impl Recipe for Hello {
///     fn id(&self) -> RecipeId {
///         RecipeId("hello".into())
///     }
///
///     async fn invoke(&self, payload: &Payload) -> Result<(), RecipeError> {
///         let repo = payload.str_at(&["repository", "full_name"])?;
///         println!("hello from {repo}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Recipe: Send + Sync {
    /// Identity reported when this recipe fails.
    fn id(&self) -> RecipeId;

    /// Events this recipe subscribes to via `Dispatcher::register_recipe`.
    ///
    /// Recipes registered explicitly per event can leave this empty.
    fn events(&self) -> Vec<EventName> {
        Vec::new()
    }

    async fn invoke(&self, payload: &Payload) -> Result<(), RecipeError>;
}

type RecipeFn = Box<dyn Fn(Payload) -> BoxFuture<'static, Result<(), RecipeError>> + Send + Sync>;

/// Adapts an async closure into a [`Recipe`].
///
/// The closure receives its own copy of the payload so the returned
/// future can be `'static`.
pub struct FnRecipe {
    id: RecipeId,
    events: Vec<EventName>,
    handler: RecipeFn,
}

impl FnRecipe {
    pub fn new<F, Fut>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RecipeError>> + Send + 'static,
    {
        Self {
            id: RecipeId(id.into()),
            events: Vec::new(),
            handler: Box::new(move |payload| Box::pin(handler(payload))),
        }
    }

    /// Declare the events this recipe subscribes to.
    pub fn on<I, E>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EventName>,
    {
        self.events.extend(events.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for FnRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRecipe")
            .field("id", &self.id)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Recipe for FnRecipe {
    fn id(&self) -> RecipeId {
        self.id.clone()
    }

    fn events(&self) -> Vec<EventName> {
        self.events.clone()
    }

    async fn invoke(&self, payload: &Payload) -> Result<(), RecipeError> {
        (self.handler)(payload.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fn_recipe_passes_payload_through() {
        let recipe = FnRecipe::new("echo", |payload: Payload| async move {
            payload.str_at(&["ref"]).map(|_| ())
        })
        .on(["push"]);

        assert_eq!(recipe.id(), RecipeId("echo".into()));
        assert_eq!(recipe.events(), vec![EventName::from("push")]);

        assert!(recipe.invoke(&Payload(json!({"ref": "refs/heads/main"}))).await.is_ok());
        assert!(matches!(
            recipe.invoke(&Payload(json!({}))).await,
            Err(RecipeError::MissingField(_))
        ));
    }
}

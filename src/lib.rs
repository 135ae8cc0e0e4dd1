//! A signature-verified webhook receiver with pluggable recipes.
//!
//! Inbound deliveries from a source-code-hosting platform are verified
//! against a shared secret, decoded, and routed by event name to every
//! [`Recipe`] registered for that event.
//!
//! ## Guarantees
//! - The HMAC is computed over the raw body, exactly as received
//! - Digest comparison is constant-time
//! - No handler runs before verification passes
//! - Handlers run in registration order; one failing (or panicking)
//!   handler never prevents the rest from running
//! - Every handler failure is reported, not just the first
//!
//! ## Non-Guarantees
//! - Persistence or retries (the platform redelivers on failure)
//! - At-least-once delivery
//! - Ordering across concurrent deliveries
//!
//! ```rust
//! use std::sync::Arc;
//! use webhook_recipes::{Dispatcher, DispatcherConfig, FnRecipe, Recipe, SignatureVerifier};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let verifier = SignatureVerifier::sha256("mysecret").unwrap();
//! let dispatcher = Dispatcher::new(verifier, DispatcherConfig::default());
//!
//! let hello: Arc<dyn Recipe> = Arc::new(FnRecipe::new("hello", |_payload| async { Ok(()) }));
//! dispatcher.register_handlers("push", [hello]).await;
//!
//! let outcome = dispatcher
//!     .handle_delivery(
//!         b"foo",
//!         Some("sha256=b3282a0e9609a79c78608f16e3bca802c02fdd43988bbc78aed0dfbf7c9a910a"),
//!         Some("push"),
//!     )
//!     .await;
//! // Signature is valid, but `foo` is not JSON.
//! assert_eq!(outcome.status_code(), 422);
//! # }
//! ```

mod dispatcher;
mod error;
mod recipe;
mod registry;
mod signing;
mod telemetry;
mod types;

pub mod recipes;

#[cfg(feature = "http")]
pub mod github;

#[cfg(feature = "server")]
pub mod server;

pub use dispatcher::{DeliveryHeaders, Dispatcher, DispatcherConfig};
pub use error::{
    ConfigError,
    DeliveryOutcome,
    GithubError,
    HandlerFailure,
    RecipeError,
    VerificationError,
};
pub use recipe::{FnRecipe, Recipe};
pub use registry::EventRegistry;
pub use signing::{
    compute_signature,
    constant_time_eq,
    format_signature_header,
    parse_signature_header,
    DigestAlgorithm,
    HashAlgorithm,
    HmacSha1,
    HmacSha256,
    ParsedSignature,
    SignatureVerifier,
    Verification,
    VerifierConfig,
};
pub use types::{DeliveryId, EventName, Payload, RecipeId, Secret};

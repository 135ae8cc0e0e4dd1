use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::{EventName, RecipeId};

/// Why a delivery failed signature verification.
///
/// Messages never include the secret or the expected digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// No signature header on the request.
    #[error("signature header missing")]
    Missing,

    /// Header is not `<algorithm>=<hex-digest>`.
    #[error("signature header malformed")]
    Malformed,

    /// Digest does not match the body, or was produced with another algorithm.
    #[error("signature mismatch")]
    Mismatch,
}

/// Errors building a verifier from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("webhook secret must not be empty")]
    EmptySecret,

    #[error("unknown signature algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Failure returned by the platform API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GithubError {
    #[error("platform returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Error raised by a single recipe invocation.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("payload field `{0}` missing or of the wrong type")]
    MissingField(String),

    #[error("api rate budget too low ({remaining}/{limit} remaining)")]
    RateLimited { remaining: u64, limit: u64 },

    #[error(transparent)]
    Platform(#[from] GithubError),

    #[error("handler exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl RecipeError {
    /// Wrap any error raised by embedder-supplied recipe code.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        RecipeError::Other(err.into())
    }
}

/// One handler that failed during a delivery.
#[derive(Debug)]
pub struct HandlerFailure {
    pub recipe: RecipeId,
    pub error: RecipeError,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.recipe, self.error)
    }
}

/// Final verdict for one inbound delivery.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Every handler for the event succeeded (trivially true for zero handlers).
    Success { handlers_run: usize },

    /// Verification rejected the request; no handler ran.
    SignatureInvalid(VerificationError),

    /// No event name was supplied; no handler ran.
    NoEventHeader,

    /// The body did not decode; no handler ran.
    MalformedPayload(String),

    /// Every handler ran, and at least one failed.
    PartialHandlerFailure {
        event: EventName,
        succeeded: Vec<RecipeId>,
        failures: Vec<HandlerFailure>,
    },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }

    /// HTTP status an embedding transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            DeliveryOutcome::Success { .. } => 200,
            DeliveryOutcome::SignatureInvalid(_) => 401,
            DeliveryOutcome::NoEventHeader => 422,
            DeliveryOutcome::MalformedPayload(_) => 422,
            DeliveryOutcome::PartialHandlerFailure { .. } => 400,
        }
    }

    /// Recipes that failed, in invocation order.
    pub fn failed_recipes(&self) -> Vec<&RecipeId> {
        match self {
            DeliveryOutcome::PartialHandlerFailure { failures, .. } => {
                failures.iter().map(|f| &f.recipe).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Success { handlers_run } =>
                write!(f, "success ({} handlers)", handlers_run),
            DeliveryOutcome::SignatureInvalid(err) =>
                write!(f, "signature invalid: {}", err),
            DeliveryOutcome::NoEventHeader =>
                write!(f, "no event provided"),
            DeliveryOutcome::MalformedPayload(reason) =>
                write!(f, "malformed payload: {}", reason),
            DeliveryOutcome::PartialHandlerFailure { event, failures, .. } => {
                write!(f, "error during {} event:", event)?;
                for failure in failures {
                    write!(f, " [{}]", failure)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_distinguish_failure_kinds() {
        assert_eq!(DeliveryOutcome::Success { handlers_run: 0 }.status_code(), 200);
        assert_eq!(
            DeliveryOutcome::SignatureInvalid(VerificationError::Missing).status_code(),
            401
        );
        assert_eq!(DeliveryOutcome::NoEventHeader.status_code(), 422);
        assert_eq!(DeliveryOutcome::MalformedPayload("eof".into()).status_code(), 422);
    }

    #[test]
    fn partial_failure_display_lists_every_failure() {
        let outcome = DeliveryOutcome::PartialHandlerFailure {
            event: EventName::from("push"),
            succeeded: vec![RecipeId("b".into())],
            failures: vec![
                HandlerFailure {
                    recipe: RecipeId("a".into()),
                    error: RecipeError::MissingField("ref".into()),
                },
                HandlerFailure {
                    recipe: RecipeId("c".into()),
                    error: RecipeError::other("boom"),
                },
            ],
        };

        let text = outcome.to_string();
        assert!(text.starts_with("error during push event:"));
        assert!(text.contains("[a: payload field `ref` missing"));
        assert!(text.contains("[c: boom]"));
        assert_eq!(outcome.failed_recipes().len(), 2);
        assert!(!outcome.is_success());
    }
}

//! Built-in recipes for a GitHub-style platform.
//!
//! Recipes talk to the platform through [`GithubApi`], so they can run
//! against the REST client (`http` feature) or any in-memory fake.

mod autocreate_pr;
mod labels_from_commits;
mod undraft_pr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{GithubError, RecipeError};

pub use autocreate_pr::AutoCreatePullRequest;
pub use labels_from_commits::{default_label_config, extract_labels, LabelsFromCommits};
pub use undraft_pr::UndraftPr;

/// Core API rate-limit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds at which the window resets.
    pub reset: u64,
}

impl RateLimit {
    /// Fraction of the window still available; `0.0` when `limit` is zero.
    pub fn available(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            self.remaining as f64 / self.limit as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    /// GraphQL node id, needed for draft transitions.
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl PullRequest {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }
}

/// Body of a pull-request creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub draft: bool,
}

/// Platform operations the built-in recipes need.
///
/// `repo` is always the `owner/name` full name.
#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn rate_limit(&self) -> Result<RateLimit, GithubError>;

    async fn default_branch(&self, repo: &str) -> Result<String, GithubError>;

    /// Message of the newest commit on `branch`.
    async fn latest_commit_message(&self, repo: &str, branch: &str) -> Result<String, GithubError>;

    async fn create_pull(&self, repo: &str, pull: &NewPullRequest) -> Result<(), GithubError>;

    async fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest, GithubError>;

    async fn pull_request_commit_messages(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, GithubError>;

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<(), GithubError>;

    async fn mark_ready_for_review(&self, pull: &PullRequest) -> Result<(), GithubError>;

    async fn convert_to_draft(&self, pull: &PullRequest) -> Result<(), GithubError>;
}

/// Guards recipes against draining the API budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateStatus {
    /// Minimum fraction of the window that must remain.
    pub threshold: f64,
}

impl Default for RateStatus {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl RateStatus {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn too_low(&self, rate: &RateLimit) -> bool {
        rate.available() < self.threshold
    }

    /// `false` when the remaining budget is below the threshold.
    pub async fn has_budget(&self, api: &dyn GithubApi) -> Result<bool, RecipeError> {
        let rate = api.rate_limit().await?;
        Ok(!self.too_low(&rate))
    }

    /// Fail with `RateLimited` when the remaining budget is below the threshold.
    pub async fn ensure_budget(&self, api: &dyn GithubApi) -> Result<(), RecipeError> {
        let rate = api.rate_limit().await?;
        if self.too_low(&rate) {
            return Err(RecipeError::RateLimited {
                remaining: rate.remaining,
                limit: rate.limit,
            });
        }
        Ok(())
    }
}

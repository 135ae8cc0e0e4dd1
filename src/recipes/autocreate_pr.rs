use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{GithubError, RecipeError};
use crate::recipe::Recipe;
use crate::recipes::{GithubApi, NewPullRequest, RateStatus};
use crate::telemetry::trace_skipped;
use crate::types::{EventName, Payload, RecipeId};

const NAME: &str = "auto_create_pull_request";

/// Opens a pull request for every branch that receives a push.
///
/// Defaults: base is the repository's default branch, title is the first
/// line of the head commit message, not a draft. A pull request that
/// already exists (HTTP 422) counts as success.
pub struct AutoCreatePullRequest {
    api: Arc<dyn GithubApi>,
    rate: RateStatus,
    base_branch: Option<String>,
    title: Option<String>,
    body: String,
    draft: bool,
}

impl AutoCreatePullRequest {
    pub fn new(api: Arc<dyn GithubApi>) -> Self {
        Self {
            api,
            rate: RateStatus::default(),
            base_branch: None,
            title: None,
            body: "Created by webhook-recipes".to_string(),
            draft: false,
        }
    }

    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = Some(branch.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn as_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn with_rate_status(mut self, rate: RateStatus) -> Self {
        self.rate = rate;
        self
    }
}

#[async_trait]
impl Recipe for AutoCreatePullRequest {
    fn id(&self) -> RecipeId {
        RecipeId(NAME.to_string())
    }

    fn events(&self) -> Vec<EventName> {
        vec![EventName::from("push")]
    }

    async fn invoke(&self, payload: &Payload) -> Result<(), RecipeError> {
        if payload.flag(&["deleted"]) {
            trace_skipped(NAME, "branch deleted");
            return Ok(());
        }

        let Some(head) = payload.str_at(&["ref"])?.strip_prefix("refs/heads/") else {
            trace_skipped(NAME, "not a branch push");
            return Ok(());
        };

        if !self.rate.has_budget(self.api.as_ref()).await? {
            trace_skipped(NAME, "rate budget too low");
            return Ok(());
        }

        let repo = payload.str_at(&["repository", "full_name"])?;

        let base = match &self.base_branch {
            Some(branch) => branch.clone(),
            None => self.api.default_branch(repo).await?,
        };
        if head == base {
            trace_skipped(NAME, "push to base branch");
            return Ok(());
        }

        let title = match &self.title {
            Some(title) => title.clone(),
            None => {
                let message = self.api.latest_commit_message(repo, head).await?;
                message.lines().next().unwrap_or_default().to_string()
            }
        };

        let pull = NewPullRequest {
            title,
            head: head.to_string(),
            base,
            body: self.body.clone(),
            draft: self.draft,
        };

        match self.api.create_pull(repo, &pull).await {
            Ok(()) => Ok(()),
            Err(GithubError::Status { status: 422, .. }) => {
                trace_skipped(NAME, "pull request already exists");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

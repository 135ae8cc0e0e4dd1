use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RecipeError;
use crate::recipe::Recipe;
use crate::recipes::{GithubApi, RateStatus};
use crate::telemetry::trace_skipped;
use crate::types::{EventName, Payload, RecipeId};

const NAME: &str = "undraft_pr";

/// Ties a pull request's draft state to a label.
///
/// Adding the label marks the pull request ready for review; removing it
/// converts the pull request back to a draft. Fails with `RateLimited`
/// instead of skipping, so the platform's redelivery can retry later.
pub struct UndraftPr {
    api: Arc<dyn GithubApi>,
    rate: RateStatus,
    draft_label: String,
}

impl UndraftPr {
    pub fn new(api: Arc<dyn GithubApi>) -> Self {
        Self {
            api,
            rate: RateStatus::default(),
            draft_label: "nodraft".to_string(),
        }
    }

    pub fn with_draft_label(mut self, label: impl Into<String>) -> Self {
        self.draft_label = label.into();
        self
    }

    pub fn with_rate_status(mut self, rate: RateStatus) -> Self {
        self.rate = rate;
        self
    }
}

#[async_trait]
impl Recipe for UndraftPr {
    fn id(&self) -> RecipeId {
        RecipeId(NAME.to_string())
    }

    fn events(&self) -> Vec<EventName> {
        vec![EventName::from("pull_request")]
    }

    async fn invoke(&self, payload: &Payload) -> Result<(), RecipeError> {
        self.rate.ensure_budget(self.api.as_ref()).await?;

        let action = payload.str_at(&["action"])?;
        if action != "labeled" && action != "unlabeled" {
            return Ok(());
        }
        if payload.str_at(&["label", "name"])? != self.draft_label {
            trace_skipped(NAME, "unrelated label");
            return Ok(());
        }

        let repo = payload.str_at(&["repository", "full_name"])?;
        let number = payload.u64_at(&["number"])?;
        let pull = self.api.pull_request(repo, number).await?;

        match action {
            "labeled" if pull.draft && pull.has_label(&self.draft_label) => {
                self.api.mark_ready_for_review(&pull).await?;
            }
            "unlabeled" if !pull.draft => {
                self.api.convert_to_draft(&pull).await?;
            }
            _ => trace_skipped(NAME, "draft state already matches label"),
        }

        Ok(())
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RecipeError;
use crate::recipe::Recipe;
use crate::recipes::{GithubApi, RateStatus};
use crate::telemetry::trace_skipped;
use crate::types::{EventName, Payload, RecipeId};

const NAME: &str = "labels_from_commits";

/// Commit-message tag to the labels it implies.
pub fn default_label_config() -> BTreeMap<String, Vec<String>> {
    [
        ("#nodraft", vec!["nodraft"]),
        ("#fast", vec!["nodraft", "automerge", "autoapprove"]),
        ("#release", vec!["nodraft", "automerge", "autorelease"]),
        ("#furious", vec!["nodraft", "automerge", "autoapprove", "autorelease"]),
    ]
    .into_iter()
    .map(|(tag, labels)| (tag.to_string(), labels.into_iter().map(String::from).collect()))
    .collect()
}

/// Labels implied by any tag appearing anywhere in any message.
pub fn extract_labels<S: AsRef<str>>(
    messages: &[S],
    config: &BTreeMap<String, Vec<String>>,
) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();
    for message in messages {
        for (tag, implied) in config {
            if message.as_ref().contains(tag.as_str()) {
                labels.extend(implied.iter().cloned());
            }
        }
    }
    labels
}

/// Adds labels to a pull request based on tags in its commit messages.
pub struct LabelsFromCommits {
    api: Arc<dyn GithubApi>,
    rate: RateStatus,
    config: BTreeMap<String, Vec<String>>,
}

impl LabelsFromCommits {
    pub fn new(api: Arc<dyn GithubApi>) -> Self {
        Self {
            api,
            rate: RateStatus::default(),
            config: default_label_config(),
        }
    }

    pub fn with_config(mut self, config: BTreeMap<String, Vec<String>>) -> Self {
        self.config = config;
        self
    }

    pub fn with_rate_status(mut self, rate: RateStatus) -> Self {
        self.rate = rate;
        self
    }
}

#[async_trait]
impl Recipe for LabelsFromCommits {
    fn id(&self) -> RecipeId {
        RecipeId(NAME.to_string())
    }

    fn events(&self) -> Vec<EventName> {
        vec![EventName::from("pull_request")]
    }

    async fn invoke(&self, payload: &Payload) -> Result<(), RecipeError> {
        if !self.rate.has_budget(self.api.as_ref()).await? {
            trace_skipped(NAME, "rate budget too low");
            return Ok(());
        }

        let repo = payload.str_at(&["repository", "full_name"])?;
        let number = payload.u64_at(&["number"])?;

        let pull = self.api.pull_request(repo, number).await?;
        let messages = self.api.pull_request_commit_messages(repo, number).await?;

        let new_labels: Vec<String> = extract_labels(&messages, &self.config)
            .into_iter()
            .filter(|label| !pull.has_label(label))
            .collect();

        if new_labels.is_empty() {
            return Ok(());
        }

        self.api.add_labels(repo, number, &new_labels).await?;
        Ok(())
    }
}

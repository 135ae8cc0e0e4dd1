use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, LINK, USER_AGENT};
use reqwest::{IntoUrl, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::GithubError;
use crate::recipes::{GithubApi, NewPullRequest, PullRequest, RateLimit};

const DEFAULT_API_URL: &str = "https://api.github.com";

/// [`GithubApi`] over the public REST API, plus GraphQL for draft transitions.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    user_agent: String,
}

impl RestClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            user_agent: "webhook-recipes".to_string(),
        }
    }

    /// Point at another API root, e.g. a GitHub Enterprise `/api/v3` URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn graphql_url(&self) -> String {
        match self.api_url.strip_suffix("/v3") {
            // Enterprise serves GraphQL at /api/graphql next to /api/v3.
            Some(api_root) => format!("{}/graphql", api_root),
            None => format!("{}/graphql", self.api_url),
        }
    }

    fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
    }

    /// API URL with `segments` appended, each percent-encoded as one path segment.
    fn url<I>(&self, segments: I) -> Result<Url, GithubError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = Url::parse(&self.api_url)
            .map_err(|err| GithubError::Transport(format!("invalid api url {}: {}", self.api_url, err)))?;
        url.path_segments_mut()
            .map_err(|_| GithubError::Transport(format!("api url {} cannot take a path", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `/repos/{owner}/{name}/...`; `repo` is the `owner/name` full name.
    fn repo_url(&self, repo: &str, rest: &[&str]) -> Result<Url, GithubError> {
        self.url(
            ["repos"]
                .into_iter()
                .chain(repo.split('/'))
                .chain(rest.iter().copied()),
        )
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, GithubError> {
        let response = request
            .send()
            .await
            .map_err(|err| GithubError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(GithubError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, GithubError> {
        decode(Self::send(request).await?).await
    }

    /// GET every page of a list endpoint, following `Link: rel="next"`.
    async fn get_all<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, GithubError> {
        let mut items = Vec::new();
        let mut next = Some(first.to_string());

        while let Some(page) = next {
            let response = Self::send(self.request(Method::GET, page)).await?;
            next = next_link(response.headers());
            items.extend(decode::<Vec<T>>(response).await?);
        }

        Ok(items)
    }

    async fn mutate(&self, mutation: &str, pull: &PullRequest) -> Result<(), GithubError> {
        let query = format!(
            "mutation($id: ID!) {{ {}(input: {{pullRequestId: $id}}) {{ clientMutationId }} }}",
            mutation
        );
        let request = self
            .request(Method::POST, self.graphql_url())
            .json(&json!({ "query": query, "variables": { "id": pull.node_id } }));

        let body: GraphqlResponse = Self::send_json(request).await?;
        match body.errors {
            Some(errors) if !errors.is_empty() => Err(GithubError::Status {
                status: 200,
                message: errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
            _ => Ok(()),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GithubError> {
    response
        .json::<T>()
        .await
        .map_err(|err| GithubError::Decode(err.to_string()))
}

/// Target of the `rel="next"` entry of a `Link` header, if any.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    value.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params.split(';').any(|param| param.trim() == r#"rel="next""#);
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| target.to_string())
    })
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateResources,
}

#[derive(Deserialize)]
struct RateResources {
    core: RateLimit,
}

#[derive(Deserialize)]
struct Repository {
    default_branch: String,
}

#[derive(Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[async_trait]
impl GithubApi for RestClient {
    async fn rate_limit(&self) -> Result<RateLimit, GithubError> {
        let url = self.url(["rate_limit"])?;
        let body: RateLimitResponse = Self::send_json(self.request(Method::GET, url)).await?;
        Ok(body.resources.core)
    }

    async fn default_branch(&self, repo: &str) -> Result<String, GithubError> {
        let url = self.repo_url(repo, &[])?;
        let body: Repository = Self::send_json(self.request(Method::GET, url)).await?;
        Ok(body.default_branch)
    }

    async fn latest_commit_message(&self, repo: &str, branch: &str) -> Result<String, GithubError> {
        let url = self.repo_url(repo, &["commits", branch])?;
        let body: CommitEntry = Self::send_json(self.request(Method::GET, url)).await?;
        Ok(body.commit.message)
    }

    async fn create_pull(&self, repo: &str, pull: &NewPullRequest) -> Result<(), GithubError> {
        let url = self.repo_url(repo, &["pulls"])?;
        Self::send(self.request(Method::POST, url).json(pull)).await?;
        Ok(())
    }

    async fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest, GithubError> {
        let number = number.to_string();
        let url = self.repo_url(repo, &["pulls", number.as_str()])?;
        Self::send_json(self.request(Method::GET, url)).await
    }

    async fn pull_request_commit_messages(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, GithubError> {
        let number = number.to_string();
        let mut url = self.repo_url(repo, &["pulls", number.as_str(), "commits"])?;
        url.query_pairs_mut().append_pair("per_page", "100");

        let commits: Vec<CommitEntry> = self.get_all(url).await?;
        Ok(commits.into_iter().map(|entry| entry.commit.message).collect())
    }

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<(), GithubError> {
        let number = number.to_string();
        let url = self.repo_url(repo, &["issues", number.as_str(), "labels"])?;
        Self::send(self.request(Method::POST, url).json(&json!({ "labels": labels }))).await?;
        Ok(())
    }

    async fn mark_ready_for_review(&self, pull: &PullRequest) -> Result<(), GithubError> {
        self.mutate("markPullRequestReadyForReview", pull).await
    }

    async fn convert_to_draft(&self, pull: &PullRequest) -> Result<(), GithubError> {
        self.mutate("convertPullRequestToDraft", pull).await
    }
}

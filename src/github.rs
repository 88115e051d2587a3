//! GitHub pull request search

use crate::error::{MaintError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Open bump PRs a contributor may have in one repository at a time
pub const MAXIMUM_OPEN_PRS: usize = 15;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub title: String,
    pub html_url: String,
}

#[async_trait]
pub trait PullRequestSearch: Send + Sync {
    /// Open PRs in `repo` whose title names `name` (and `version`, if given).
    ///
    /// A rejected query surfaces as [`MaintError::ValidationFailed`].
    async fn search_pull_requests(
        &self,
        name: &str,
        repo: &str,
        version: Option<&str>,
    ) -> Result<Vec<PullRequest>>;

    /// Open PRs the authenticated user has in `repo`; `None` when anonymous
    async fn open_pull_request_count(&self, repo: &str) -> Result<Option<usize>>;
}

/// Render PRs as `title (url)` joined by `, `; `None` for an empty list
pub fn format_pull_requests(pull_requests: &[PullRequest]) -> Option<String> {
    if pull_requests.is_empty() {
        return None;
    }
    Some(
        pull_requests
            .iter()
            .map(|pr| format!("{} ({})", pr.title, pr.html_url))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Whether `word` appears in `title` as a standalone term
fn title_mentions(title: &str, word: &str, case_insensitive: bool) -> bool {
    let pattern = format!(
        r"{}(^|\s){}(:|,|\s|$)",
        if case_insensitive { "(?i)" } else { "" },
        regex::escape(word)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(title))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default)]
    total_count: usize,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("brewmaint/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|e| e.message)
            .unwrap_or_default();

        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Err(MaintError::ValidationFailed(message));
        }
        Err(MaintError::GitHubError {
            status: status.as_u16(),
            message,
        })
    }

    async fn search_issues<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
    ) -> Result<SearchResponse<T>> {
        debug!("Searching GitHub issues: {}", query);
        self.send(self.get("/search/issues").query(&[("q", query), ("per_page", "100")]))
            .await
    }
}

#[async_trait]
impl PullRequestSearch for GitHubClient {
    async fn search_pull_requests(
        &self,
        name: &str,
        repo: &str,
        version: Option<&str>,
    ) -> Result<Vec<PullRequest>> {
        let mut query = name.to_string();
        if let Some(version) = version {
            query.push(' ');
            query.push_str(version);
        }
        query.push_str(&format!(" repo:{} is:pr is:open in:title", repo));

        let response: SearchResponse<PullRequest> = self.search_issues(&query).await?;

        // Search is fuzzy; keep only titles naming the package (and version)
        Ok(response
            .items
            .into_iter()
            .filter(|pr| title_mentions(&pr.title, name, true))
            .filter(|pr| version.is_none_or(|v| title_mentions(&pr.title, v, false)))
            .collect())
    }

    async fn open_pull_request_count(&self, repo: &str) -> Result<Option<usize>> {
        if self.token.is_none() {
            return Ok(None);
        }

        let user: User = self.send(self.get("/user")).await?;
        let query = format!("repo:{} author:{} is:pr is:open", repo, user.login);
        let response: SearchResponse<serde_json::Value> = self.search_issues(&query).await?;
        Ok(Some(response.total_count))
    }
}

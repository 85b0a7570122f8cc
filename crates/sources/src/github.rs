//! GitHub REST client: the review-request state source.

use async_trait::async_trait;
use serde::Deserialize;

use nudge_common::error::{AppError, Result};
use nudge_common::traits::ReviewSource;
use nudge_common::types::{MergeableState, PullRequestRef, ReviewSnapshot};

const USER_AGENT: &str = "nudge";

pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

/// Subset of `GET /repos/{owner}/{repo}/pulls/{number}` we care about.
#[derive(Debug, Deserialize)]
struct PullResponse {
    #[serde(default)]
    comments: u64,
    #[serde(default)]
    review_comments: u64,
    mergeable_state: Option<MergeableState>,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl ReviewSource for GithubClient {
    async fn fetch_state(&self, pr: &PullRequestRef) -> Result<ReviewSnapshot> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, pr.owner, pr.repo, pr.number
        );

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Review(format!("GET {url} returned {status}: {text}")));
        }

        let pull: PullResponse = response.json().await?;
        Ok(ReviewSnapshot {
            comments: pull.comments,
            review_comments: pull.review_comments,
            mergeable_state: pull.mergeable_state.unwrap_or(MergeableState::Unknown),
        })
    }
}

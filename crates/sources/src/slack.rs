//! Slack Web API client: the chat-platform collaborator.
//!
//! Uses two methods:
//! - `users.list` (paginated via `response_metadata.next_cursor`) for the directory
//! - `chat.postMessage` to DM a reminder to a user ID
//!
//! Slack reports most failures as HTTP 200 with `"ok": false`, so every
//! response body is checked.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use nudge_common::error::{AppError, Result};
use nudge_common::traits::ChatPlatform;
use nudge_common::types::Recipient;

/// Members requested per `users.list` page.
const PAGE_LIMIT: u32 = 200;

pub struct SlackClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    members: Vec<SlackMember>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackMember {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Debug, Default, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    real_name: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

impl SlackClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<UsersListResponse> {
        let mut query = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/users.list", self.api_url))
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let page: UsersListResponse = response.json().await?;
        if !page.ok {
            return Err(AppError::Chat(format!(
                "users.list failed: {}",
                page.error.as_deref().unwrap_or("unknown_error")
            )));
        }
        Ok(page)
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let mut recipients = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.fetch_page(cursor.as_deref()).await?;
            recipients.extend(
                page.members
                    .into_iter()
                    .map(|m| Recipient::new(m.id, m.name, m.profile.real_name)),
            );

            cursor = page
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        tracing::debug!(count = recipients.len(), "Fetched Slack directory");
        Ok(recipients)
    }

    async fn send_message(&self, address: &str, text: &str) -> Result<()> {
        let body = json!({
            "channel": address,
            "text": text,
            "as_user": true,
        });

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let result: PostMessageResponse = response.json().await?;
        if !result.ok {
            return Err(AppError::Chat(format!(
                "chat.postMessage to {address} failed: {}",
                result.error.as_deref().unwrap_or("unknown_error")
            )));
        }

        tracing::debug!(channel = address, "Slack message posted");
        Ok(())
    }
}

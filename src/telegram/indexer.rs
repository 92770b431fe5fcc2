//! Chat indexing flow
//!
//! A user sends a `https://t.me/<username>` link; the bot resolves the chat,
//! fetches its member count, upserts the record in the management service
//! and pushes the searchable document into Meilisearch. Member-count
//! retrieval fails for chats the bot is not a member of, which is reported
//! back with a retry button.

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::search::{ManagementClient, SearchClient};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// Raw Bot API envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// The subset of `getChat` we index.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
}

/// Raw Bot API client for the chat-resolution calls the indexing flow needs.
/// Kept separate from the teloxide bot so the same code path serves tests
/// and local Bot API servers.
#[derive(Debug, Clone)]
pub struct ChatResolver {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl ChatResolver {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base("https://api.telegram.org", token)
    }

    pub fn with_api_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config::network::timeout())
            .build()
            .unwrap_or_default();
        let api_base: String = api_base.into();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, query: &str) -> AppResult<T> {
        let url = format!("{}/bot{}/{}?{}", self.api_base, self.token, method, query);
        let envelope: ApiEnvelope<T> = self.http.get(&url).send().await?.json().await?;
        if !envelope.ok {
            return Err(AppError::Management(format!(
                "{} failed: {}",
                method,
                envelope.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        envelope
            .result
            .ok_or_else(|| AppError::Management(format!("{} returned no result", method)))
    }

    /// Resolves a public @username to its chat.
    pub async fn chat_by_username(&self, username: &str) -> AppResult<ChatInfo> {
        self.call("getChat", &format!("chat_id=%40{}", urlencoding::encode(username)))
            .await
    }

    /// Member count of a chat the bot can see.
    pub async fn chat_member_count(&self, chat_id: i64) -> AppResult<i64> {
        self.call("getChatMemberCount", &format!("chat_id={}", chat_id)).await
    }
}

/// Extracts the username from a `https://t.me/<username>[/...]` link.
pub fn username_from_link(link: &str) -> Option<&str> {
    let rest = link.strip_prefix("https://t.me/")?;
    let username = rest.split('/').next().unwrap_or_default();
    if username.is_empty() {
        None
    } else {
        Some(username)
    }
}

/// The outcome of an indexing attempt, for the handler to render.
#[derive(Debug)]
pub enum IndexOutcome {
    /// Chat indexed; carries (title, username, description, member count)
    Indexed {
        title: String,
        username: String,
        description: String,
        members_count: i64,
    },
    /// Member count unavailable: the bot must be added to the chat first
    NeedsBotInChat,
}

/// Resolves the linked chat and writes it into the index stores.
pub async fn index_chat_link(
    resolver: &ChatResolver,
    management: Option<&ManagementClient>,
    search: &SearchClient,
    link: &str,
) -> AppResult<IndexOutcome> {
    let username =
        username_from_link(link).ok_or_else(|| AppError::Management(format!("not an indexable link: {}", link)))?;

    log::info!("Processing index link for @{}", username);
    let chat = resolver.chat_by_username(username).await?;

    let description = if chat.kind == "private" {
        chat.bio.clone().unwrap_or_default()
    } else {
        chat.description.clone().unwrap_or_default()
    };

    let members_count = match resolver.chat_member_count(chat.id).await {
        Ok(count) => count,
        Err(e) => {
            log::warn!("Failed to get member count for @{}: {}", username, e);
            return Ok(IndexOutcome::NeedsBotInChat);
        }
    };

    let now = Utc::now().to_rfc3339();
    let record = json!({
        "chat_id": chat.id.to_string(),
        "type": chat.kind,
        "title": chat.title.clone().unwrap_or_default(),
        "username": chat.username.clone().unwrap_or_default(),
        "first_name": chat.first_name.clone().unwrap_or_default(),
        "last_name": chat.last_name.clone().unwrap_or_default(),
        "description": description,
        "is_verified": false,
        "members_count": members_count,
        "created_at": now,
        "updated_at": now,
        "invite_link": chat.invite_link.clone().unwrap_or_default(),
    });

    // The management service is the system of record; Meilisearch holds the
    // searchable projection. A missing management service only skips step 1.
    if let Some(mgmt) = management {
        mgmt.save_index_record(&record).await?;
        mgmt.push_search_document(search, &record).await?;
    } else {
        let mut doc = record.clone();
        if let Some(map) = doc.as_object_mut() {
            map.remove("chat_id");
            map.insert("id".to_string(), json!(chat.id.to_string()));
        }
        search.add_document(&doc).await?;
    }

    log::info!("Chat @{} indexed successfully", username);
    Ok(IndexOutcome::Indexed {
        title: chat.title.unwrap_or_default(),
        username: chat.username.unwrap_or_default(),
        description: record["description"].as_str().unwrap_or_default().to_string(),
        members_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_from_link() {
        assert_eq!(username_from_link("https://t.me/somechat"), Some("somechat"));
        assert_eq!(username_from_link("https://t.me/somechat/123"), Some("somechat"));
        assert_eq!(username_from_link("https://t.me/"), None);
        assert_eq!(username_from_link("https://example.com/somechat"), None);
    }
}

//! Management service client (PocketBase)
//!
//! The management service is the system of record for indexed chats; the
//! search engine only holds the searchable projection. The indexing flow
//! upserts the record here first, then pushes the document into Meilisearch.

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct RecordList {
    #[serde(default)]
    items: Vec<RecordRef>,
}

#[derive(Debug, Deserialize)]
struct RecordRef {
    id: String,
}

/// Client for the management service's record API.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ManagementClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config::search::request_timeout())
            .build()
            .unwrap_or_default();
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Creates a client from the environment, or `None` when no management
    /// service is configured (indexing then only writes to Meilisearch).
    pub fn from_env() -> Option<Self> {
        config::MANAGEMENT_SERVICE_URL
            .as_ref()
            .map(|url| Self::new(url.clone(), config::MANAGEMENT_SERVICE_TOKEN.clone()))
    }

    /// Upserts a `telegram_index` record keyed by its `chat_id` field:
    /// PATCH when a record for the chat already exists, POST otherwise.
    pub async fn save_index_record(&self, record: &Value) -> AppResult<()> {
        let chat_id = record
            .get("chat_id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Management("chat_id not found or not a string".to_string()))?;

        let collection_url = format!("{}/api/collections/telegram_index/records", self.base_url);

        let query_url = format!("{}?filter=(chat_id='{}')", collection_url, chat_id);
        let resp = self.http.get(&query_url).bearer_auth(&self.token).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Management(format!(
                "record query failed with status: {}",
                resp.status()
            )));
        }
        let existing: RecordList = resp.json().await?;

        let resp = if let Some(first) = existing.items.first() {
            let target = format!("{}/{}", collection_url, first.id);
            self.http.patch(&target).bearer_auth(&self.token).json(record).send().await?
        } else {
            self.http
                .post(&collection_url)
                .bearer_auth(&self.token)
                .json(record)
                .send()
                .await?
        };

        if !resp.status().is_success() {
            return Err(AppError::Management(format!(
                "record upsert failed with status: {}",
                resp.status()
            )));
        }

        log::debug!("Index record for chat {} saved to management service", chat_id);
        Ok(())
    }

    /// Pushes the searchable projection of the record into Meilisearch.
    /// The document id is the chat id, so re-indexing a chat overwrites
    /// its previous document.
    pub async fn push_search_document(&self, search: &crate::search::SearchClient, record: &Value) -> AppResult<()> {
        let chat_id = record
            .get("chat_id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Management("chat_id not found or not a string".to_string()))?;

        let mut doc = record.clone();
        if let Some(map) = doc.as_object_mut() {
            map.remove("chat_id");
            map.insert("id".to_string(), json!(chat_id));
        }
        search.add_document(&doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_requires_chat_id() {
        let client = ManagementClient::new("http://127.0.0.1:8090", "token");
        let record = json!({"title": "no chat id here"});
        assert!(matches!(
            client.save_index_record(&record).await,
            Err(AppError::Management(_))
        ));
    }
}

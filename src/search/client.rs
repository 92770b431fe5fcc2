//! Meilisearch client
//!
//! Thin REST wrapper around the search engine: paginated queries with the
//! bot's filter vocabulary, and document deletion for the review flow.
//! Ranking itself lives entirely in Meilisearch.

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::search::types::SearchResponse;
use serde_json::json;

/// Client for the Meilisearch HTTP API.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    index: String,
}

impl SearchClient {
    /// Creates a client for the given Meilisearch instance and index.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, index: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config::search::request_timeout())
            .build()
            .unwrap_or_default();
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            index: index.into(),
        }
    }

    /// Creates a client from the environment configuration.
    pub fn from_env() -> Self {
        Self::new(
            config::MEILISEARCH_URL.clone(),
            config::MEILISEARCH_KEY.clone(),
            config::SEARCH_INDEX.clone(),
        )
    }

    /// Runs a paginated search.
    ///
    /// # Arguments
    /// * `query` - Search keywords (must be non-empty)
    /// * `page` - 1-based page number
    /// * `limit` - Hits per page
    /// * `filter` - Bot-level filter name ("", "all", "group", "channel", "bot", "message")
    pub async fn search(&self, query: &str, page: i64, limit: i64, filter: &str) -> AppResult<SearchResponse> {
        log::info!(
            "Performing search: query='{}', page={}, limit={}, filter='{}'",
            query,
            page,
            limit,
            filter
        );

        if query.is_empty() {
            return Err(AppError::Search("search query cannot be empty".to_string()));
        }
        if page < 1 {
            return Err(AppError::Search(format!("invalid page number: {}", page)));
        }
        if limit < 1 {
            return Err(AppError::Search(format!("invalid limit: {}", limit)));
        }

        let mut body = json!({
            "q": query,
            "page": page,
            "hitsPerPage": limit,
            "sort": ["MEMBERS_COUNT:desc"],
        });
        if let Some(expr) = filter_expression(filter) {
            body["filter"] = json!(expr);
        }

        let url = format!("{}/indexes/{}/search", self.base_url, self.index);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            log::error!("Meilisearch returned an error: {} {}", status, text);
            return Err(AppError::Search(format!("search engine returned {}: {}", status, text)));
        }

        Ok(resp.json::<SearchResponse>().await?)
    }

    /// Deletes a document from the index. Used by the review accept path
    /// when a moderator confirms a handle is dead.
    pub async fn delete_document(&self, doc_id: &str) -> AppResult<()> {
        if doc_id.is_empty() {
            return Err(AppError::Search("document ID cannot be empty".to_string()));
        }

        let url = format!("{}/indexes/{}/documents/{}", self.base_url, self.index, doc_id);
        let resp = self.http.delete(&url).bearer_auth(&self.api_key).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            log::error!("Meilisearch returned an error on delete: {} {}", status, text);
            return Err(AppError::Search(format!("delete failed with {}: {}", status, text)));
        }

        log::info!("Document {} deleted successfully from search index", doc_id);
        Ok(())
    }

    /// Adds (or replaces) a single document in the index. The document must
    /// carry its own `id`; re-adding a document with the same id overwrites it.
    pub async fn add_document(&self, doc: &serde_json::Value) -> AppResult<()> {
        let url = format!("{}/indexes/{}/documents", self.base_url, self.index);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!([doc]))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        log::debug!("Meilisearch index response: status={}, body={}", status, body);

        // Meilisearch enqueues document writes and answers 202.
        if status != reqwest::StatusCode::ACCEPTED {
            return Err(AppError::Search(format!(
                "indexing failed with status: {}, body: {}",
                status, body
            )));
        }
        Ok(())
    }
}

/// Maps the bot-level filter name to a Meilisearch filter expression.
///
/// Unknown filters are logged and ignored, matching the behavior users see
/// when an old button payload arrives after a filter was renamed.
pub fn filter_expression(filter: &str) -> Option<String> {
    match filter {
        "" | "all" => None,
        "group" => Some("TYPE IN [group, supergroup]".to_string()),
        "channel" => Some("TYPE=channel".to_string()),
        "bot" => Some("TYPE=bot".to_string()),
        "message" => Some("MESSAGE_ID EXISTS".to_string()),
        other => {
            log::warn!("unknown filter type: {}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_expression_mapping() {
        assert_eq!(filter_expression(""), None);
        assert_eq!(filter_expression("all"), None);
        assert_eq!(filter_expression("group").as_deref(), Some("TYPE IN [group, supergroup]"));
        assert_eq!(filter_expression("channel").as_deref(), Some("TYPE=channel"));
        assert_eq!(filter_expression("bot").as_deref(), Some("TYPE=bot"));
        assert_eq!(filter_expression("message").as_deref(), Some("MESSAGE_ID EXISTS"));
        assert_eq!(filter_expression("garbage"), None);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_input() {
        let client = SearchClient::new("http://127.0.0.1:7700", "key", "telegram_index");

        assert!(matches!(client.search("", 1, 10, "all").await, Err(AppError::Search(_))));
        assert!(matches!(client.search("q", 0, 10, "all").await, Err(AppError::Search(_))));
        assert!(matches!(client.search("q", 1, 0, "all").await, Err(AppError::Search(_))));
    }

    #[tokio::test]
    async fn test_delete_rejects_empty_id() {
        let client = SearchClient::new("http://127.0.0.1:7700", "key", "telegram_index");
        assert!(matches!(client.delete_document("").await, Err(AppError::Search(_))));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single document returned by the search engine.
///
/// The index keeps the upstream collector's field names (upper-case for chat
/// attributes, lower-case `text` for message bodies), so the struct maps them
/// explicitly and keeps any extra fields intact for round-tripping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    /// Persistent document identifier. The collector writes it as a string,
    /// older documents carry a numeric id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Public @username of the chat/channel, when it has one
    #[serde(rename = "USERNAME", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Chat title (channels/groups) or display name (private chats)
    #[serde(rename = "TITLE", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Chat type: private, group, supergroup, channel, bot
    #[serde(rename = "TYPE", default, skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<String>,

    /// Present only for indexed messages
    #[serde(rename = "MESSAGE_ID", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,

    /// Member count at index time
    #[serde(rename = "MEMBERS_COUNT", default, skip_serializing_if = "Option::is_none")]
    pub members_count: Option<i64>,

    /// Message text, for message hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Any remaining document fields, preserved verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SearchHit {
    /// Returns the persistent document id as a string, accepting both the
    /// string form and the legacy numeric form.
    pub fn doc_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns the public handle of the hit, if it has a non-empty one.
    pub fn handle(&self) -> Option<&str> {
        match self.username.as_deref() {
            Some(u) if !u.is_empty() => Some(u),
            _ => None,
        }
    }
}

/// A paginated search response from Meilisearch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub query: String,
    pub processing_time_ms: i64,
    pub hits_per_page: i64,
    pub page: i64,
    pub total_pages: i64,
    pub total_hits: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hit_doc_id_from_string() {
        let hit: SearchHit = serde_json::from_str(r#"{"id": "abc123", "USERNAME": "somechat"}"#).unwrap();
        assert_eq!(hit.doc_id(), Some("abc123".to_string()));
        assert_eq!(hit.handle(), Some("somechat"));
    }

    #[test]
    fn test_hit_doc_id_from_number() {
        let hit: SearchHit = serde_json::from_str(r#"{"id": 16077}"#).unwrap();
        assert_eq!(hit.doc_id(), Some("16077".to_string()));
    }

    #[test]
    fn test_hit_without_handle() {
        let hit: SearchHit = serde_json::from_str(r#"{"id": "x", "USERNAME": ""}"#).unwrap();
        assert_eq!(hit.handle(), None);

        let hit: SearchHit = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(hit.handle(), None);
    }

    #[test]
    fn test_hit_preserves_extra_fields() {
        let hit: SearchHit =
            serde_json::from_str(r#"{"id": "x", "description": "a group", "is_verified": false}"#).unwrap();
        assert_eq!(hit.extra.get("description").and_then(Value::as_str), Some("a group"));
    }

    #[test]
    fn test_response_deserializes_meili_shape() {
        let raw = r#"{
            "hits": [{"id": "1", "USERNAME": "chan", "TYPE": "channel", "MEMBERS_COUNT": 42}],
            "query": "rust",
            "processingTimeMs": 3,
            "hitsPerPage": 10,
            "page": 2,
            "totalPages": 5,
            "totalHits": 47
        }"#;
        let resp: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.page, 2);
        assert_eq!(resp.total_pages, 5);
        assert_eq!(resp.hits.len(), 1);
        assert_eq!(resp.hits[0].chat_type.as_deref(), Some("channel"));
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let resp: SearchResponse = serde_json::from_str(r#"{"hits": []}"#).unwrap();
        assert_eq!(resp.total_pages, 0);
        assert!(resp.hits.is_empty());
    }
}

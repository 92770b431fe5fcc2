//! Integration tests for the REST clients (Meilisearch, management service,
//! Bot API handle lookups) against a wiremock server.
//!
//! Run with: cargo test --test search_client_test

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use soso::search::{ManagementClient, SearchClient};
use soso::validation::{Credential, HandleLookup, LookupOutcome, TelegramHandleLookup};

fn sample_response() -> serde_json::Value {
    json!({
        "hits": [
            {"id": "1", "USERNAME": "rustlang", "TITLE": "Rust", "TYPE": "channel", "MEMBERS_COUNT": 90000}
        ],
        "query": "rust",
        "processingTimeMs": 2,
        "hitsPerPage": 10,
        "page": 1,
        "totalPages": 3,
        "totalHits": 21
    })
}

#[tokio::test]
async fn search_sends_query_and_parses_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes/telegram_index/search"))
        .and(body_partial_json(json!({
            "q": "rust",
            "page": 1,
            "hitsPerPage": 10,
            "sort": ["MEMBERS_COUNT:desc"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(server.uri(), "key", "telegram_index");
    let resp = client.search("rust", 1, 10, "all").await.unwrap();

    assert_eq!(resp.total_pages, 3);
    assert_eq!(resp.hits.len(), 1);
    assert_eq!(resp.hits[0].handle(), Some("rustlang"));
}

#[tokio::test]
async fn search_translates_bot_filters_to_engine_expressions() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes/telegram_index/search"))
        .and(body_partial_json(json!({"filter": "TYPE IN [group, supergroup]"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(server.uri(), "key", "telegram_index");
    client.search("rust", 1, 10, "group").await.unwrap();
}

#[tokio::test]
async fn search_surfaces_engine_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes/telegram_index/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("engine on fire"))
        .mount(&server)
        .await;

    let client = SearchClient::new(server.uri(), "key", "telegram_index");
    let err = client.search("rust", 1, 10, "all").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn delete_document_hits_the_documents_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/indexes/telegram_index/documents/doc42"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(server.uri(), "key", "telegram_index");
    client.delete_document("doc42").await.unwrap();
}

#[tokio::test]
async fn add_document_requires_accepted_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes/telegram_index/documents"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = SearchClient::new(server.uri(), "key", "telegram_index");
    // Meilisearch answers 202 for enqueued writes; anything else is an error.
    assert!(client.add_document(&json!({"id": "1"})).await.is_err());
}

#[tokio::test]
async fn management_inserts_new_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/collections/telegram_index/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/collections/telegram_index/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ManagementClient::new(server.uri(), "token");
    client
        .save_index_record(&json!({"chat_id": "-100123", "title": "Chat"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn management_patches_existing_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/collections/telegram_index/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{"id": "rec1"}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/collections/telegram_index/records/rec1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "rec1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ManagementClient::new(server.uri(), "token");
    client
        .save_index_record(&json!({"chat_id": "-100123", "title": "Chat"}))
        .await
        .unwrap();
}

// ---- Handle lookup classification -----------------------------------------

async fn classified(template: ResponseTemplate) -> LookupOutcome {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bottok-1/getChat"))
        .and(query_param("chat_id", "@somechat"))
        .respond_with(template)
        .mount(&server)
        .await;

    let lookup = TelegramHandleLookup::with_api_base(server.uri());
    lookup.lookup(&Credential::new("tok-1"), "somechat").await
}

#[tokio::test]
async fn lookup_classifies_found() {
    let outcome = classified(
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"id": 1, "type": "channel"}})),
    )
    .await;
    assert_eq!(outcome, LookupOutcome::Found);
}

#[tokio::test]
async fn lookup_classifies_not_found() {
    let outcome = classified(
        ResponseTemplate::new(400)
            .set_body_json(json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"})),
    )
    .await;
    assert_eq!(outcome, LookupOutcome::NotFound);
}

#[tokio::test]
async fn lookup_classifies_rate_limited() {
    let outcome = classified(
        ResponseTemplate::new(429)
            .set_body_json(json!({"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 5"})),
    )
    .await;
    assert_eq!(outcome, LookupOutcome::RateLimited);
}

#[tokio::test]
async fn lookup_classifies_unauthorized() {
    let outcome = classified(
        ResponseTemplate::new(401).set_body_json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"})),
    )
    .await;
    assert_eq!(outcome, LookupOutcome::Unauthorized);
}

#[tokio::test]
async fn lookup_classifies_server_errors_as_other() {
    let outcome = classified(
        ResponseTemplate::new(502).set_body_json(json!({"ok": false, "description": "Bad Gateway"})),
    )
    .await;
    assert!(matches!(outcome, LookupOutcome::Other(_)));
}

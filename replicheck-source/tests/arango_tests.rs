use replicheck_source::{fetch_entities, ArangoConfig, ArangoSource, EntitySource, KeyOrder};
use replicheck_types::{EntityKind, SourceError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn source_for(server: &MockServer) -> ArangoSource {
    ArangoSource::new(ArangoConfig {
        base_url: server.uri(),
        database: "testdb".to_string(),
        username: "root".to_string(),
        password: "secret".to_string(),
        label: "db1".to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

// ── Collection listing ───────────────────────────────────────────

#[tokio::test]
async fn list_collections_splits_documents_and_edges() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/collection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                { "name": "users", "type": 2, "isSystem": false },
                { "name": "follows", "type": 3, "isSystem": false },
                { "name": "_internal", "type": 2, "isSystem": true },
            ]
        })))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let collections = source.list_collections().await.unwrap();
    let edges = source.list_edge_collections().await.unwrap();

    assert_eq!(
        collections.names().into_iter().collect::<Vec<_>>(),
        ["users"]
    );
    assert_eq!(edges.names().into_iter().collect::<Vec<_>>(), ["follows"]);
}

#[tokio::test]
async fn empty_kind_is_empty_set_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/analyzer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let analyzers = source.list_analyzers().await.unwrap();
    assert!(analyzers.is_empty());
}

// ── Indexes ──────────────────────────────────────────────────────

#[tokio::test]
async fn list_indexes_keys_by_name_with_id_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/index"))
        .and(query_param("collection", "users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [
                { "id": "users/0", "name": "primary", "type": "primary" },
                { "id": "users/173", "type": "persistent", "fields": ["email"] },
            ]
        })))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let indexes = source.list_indexes("users").await.unwrap();
    let names: Vec<_> = indexes.names().into_iter().collect();
    assert_eq!(names, ["primary", "users/173"]);
}

#[tokio::test]
async fn fetch_entities_requires_parent_for_indexes() {
    let server = MockServer::start().await;
    let source = source_for(&server).await;
    let err = fetch_entities(&source, EntityKind::Index, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidArgument(_)));
}

// ── Counts ───────────────────────────────────────────────────────

#[tokio::test]
async fn count_documents_reads_count_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/collection/users/count"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "count": 100, "status": 3 })),
        )
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    assert_eq!(source.count_documents("users").await.unwrap(), 100);
}

// ── Cursor pagination ────────────────────────────────────────────

#[tokio::test]
async fn list_document_keys_follows_cursor_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_db/testdb/_api/cursor"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "result": [ { "key": "1", "updatedAt": "2026-01-01T00:00:00Z" } ],
            "hasMore": true,
            "id": "cur123",
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/_db/testdb/_api/cursor/cur123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [ { "key": "2", "updatedAt": null } ],
            "hasMore": false,
        })))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let keys = source
        .list_document_keys("users", KeyOrder::Unordered, None)
        .await
        .unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].key, "1");
    assert!(keys[0].updated_at.is_some());
    assert_eq!(keys[1].key, "2");
    assert!(keys[1].updated_at.is_none());
}

#[tokio::test]
async fn recent_first_query_sorts_server_side() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_db/testdb/_api/cursor"))
        .and(body_partial_json(json!({
            "query": "FOR d IN @@collection SORT d.updatedAt DESC LIMIT @limit RETURN { key: d._key, updatedAt: d.updatedAt }",
            "bindVars": { "@collection": "users", "limit": 5 },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "result": [],
            "hasMore": false,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let keys = source
        .list_document_keys("users", KeyOrder::RecentFirst, Some(5))
        .await
        .unwrap();
    assert!(keys.is_empty());
}

// ── Documents ────────────────────────────────────────────────────

#[tokio::test]
async fn get_document_returns_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/document/users/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_key": "42",
            "email": "a@example.com",
        })))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let record = source.get_document("users", "42").await.unwrap();
    assert_eq!(record.key, "42");
    assert_eq!(record.body["email"], "a@example.com");
}

// ── Error classification ─────────────────────────────────────────

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/collection/users/count"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let err = source.count_documents("users").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn not_found_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/document/users/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": true, "errorNum": 1202,
        })))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let err = source.get_document("users", "missing").await.unwrap_err();
    assert!(matches!(err, SourceError::Permanent(_)));
}

#[tokio::test]
async fn auth_rejection_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_db/testdb/_api/collection"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let err = source.list_collections().await.unwrap_err();
    assert!(matches!(err, SourceError::Unavailable(_)));
}

#[tokio::test]
async fn ping_failure_is_unavailable() {
    // No mock mounted: connection succeeds but the route 404s.
    let server = MockServer::start().await;
    let source = source_for(&server).await;
    let err = source.ping().await.unwrap_err();
    assert!(matches!(err, SourceError::Unavailable(_)));
}

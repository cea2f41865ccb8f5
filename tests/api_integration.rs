use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docbase::{api, config, ingest::DocumentService, logging};
use httpmock::{
    Method::{GET, POST, PUT},
    Mock, MockServer,
};
use serde_json::json;
use tokio::sync::OnceCell;
use tower::ServiceExt;

static SERVICE: OnceCell<Arc<DocumentService>> = OnceCell::const_new();
static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();
static BOOTSTRAP_MOCKS: OnceCell<Vec<Mock<'static>>> = OnceCell::const_new();

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

async fn harness() -> (axum::Router, &'static MockServer) {
    let service = SERVICE
        .get_or_init(|| async {
            let mock_server = Box::leak(Box::new(MockServer::start_async().await));
            let base_url = mock_server.base_url();

            set_env("QDRANT_URL", &base_url);
            set_env("QDRANT_COLLECTION_NAME", "documents");
            set_env("EMBEDDING_DIMENSION", "64");
            set_env("CHUNK_SIZE", "1000");

            MOCK_SERVER.set(mock_server).ok();

            // Collection lookup happens once during service construction.
            let exists = mock_server
                .mock_async(|when, then| {
                    when.method(GET).path("/collections/documents");
                    then.status(200).json_body(json!({
                        "status": "ok",
                        "time": 0.0,
                        "result": { "status": "green" }
                    }));
                })
                .await;
            let indexes = mock_server
                .mock_async(|when, then| {
                    when.method(PUT).path("/collections/documents/index");
                    then.status(200).json_body(json!({
                        "status": "ok",
                        "time": 0.0,
                        "result": true
                    }));
                })
                .await;
            BOOTSTRAP_MOCKS.set(vec![exists, indexes]).ok();

            config::init_config();
            logging::init_tracing();

            Arc::new(
                DocumentService::new()
                    .await
                    .expect("document service should initialize against the mock"),
            )
        })
        .await;

    let server = MOCK_SERVER.get().expect("mock server initialized");
    (api::create_router(Arc::clone(service)), server)
}

fn multipart_body(boundary: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn upload_text_document_stores_fixed_windows() {
    let (app, server) = harness().await;

    let insert = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/collections/documents/points")
                .query_param("wait", "true")
                .body_contains("\"chunk_id\":2");
            then.status(200).json_body(json!({
                "status": "ok",
                "time": 0.0,
                "result": { "operation_id": 7, "status": "completed" }
            }));
        })
        .await;

    let content = "a".repeat(2500);
    let body = multipart_body("upload-boundary", "report.txt", content.as_bytes());
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/upload")
                .header(
                    "content-type",
                    "multipart/form-data; boundary=upload-boundary",
                )
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");

    insert.assert();
    assert_eq!(json["chunks_stored"], 3);
    assert_eq!(json["file_extension"], "txt");
    assert_eq!(json["file_size"], 2500);
    assert!(!json["doc_id"].as_str().expect("doc id").is_empty());
}

#[tokio::test]
async fn upload_with_unknown_extension_is_rejected() {
    let (app, _server) = harness().await;

    let body = multipart_body("upload-boundary", "table.csv", b"a,b,c");
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/upload")
                .header(
                    "content-type",
                    "multipart/form-data; boundary=upload-boundary",
                )
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn query_returns_hits_mapped_from_payloads() {
    let (app, server) = harness().await;

    let query = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/collections/documents/points/query")
                .body_contains("\"limit\":2");
            then.status(200).json_body(json!({
                "status": "ok",
                "time": 0.0,
                "result": [
                    {
                        "id": "p-1",
                        "score": 0.91,
                        "payload": {
                            "doc_id": "doc-9",
                            "chunk_id": 1,
                            "content": "relevant chunk",
                            "file_type": "text",
                            "metadata": "{\"file_type\":\"text\"}"
                        }
                    }
                ]
            }));
        })
        .await;

    let payload = json!({ "query": "what is relevant", "limit": 2 });
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/query")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");

    query.assert();
    assert_eq!(json["query"], "what is relevant");
    let hit = &json["results"][0];
    assert_eq!(hit["doc_id"], "doc-9");
    assert_eq!(hit["chunk_id"], 1);
    assert_eq!(hit["content"], "relevant chunk");
    assert_eq!(hit["metadata"]["file_type"], "text");
}

#[tokio::test]
async fn aggregate_sums_values_from_scrolled_payloads() {
    let (app, server) = harness().await;

    let scroll = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/collections/documents/points/scroll")
                .body_contains("\"doc_id\"");
            then.status(200).json_body(json!({
                "status": "ok",
                "time": 0.0,
                "result": {
                    "points": [
                        { "id": 1, "payload": { "json": "{\"orders\":[{\"total\":3},{\"total\":4.5}]}" } },
                        { "id": 2, "payload": { "json": "{\"orders\":[{\"total\":\"2\"}]}" } }
                    ],
                    "next_page_offset": null
                }
            }));
        })
        .await;

    let payload = json!({
        "field_path": "orders[].total",
        "operation": "sum",
        "doc_id": "doc-9"
    });
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/aggregate")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");

    scroll.assert();
    assert_eq!(json["field"], "orders[].total");
    assert_eq!(json["operation"], "sum");
    assert_eq!(json["value"], 9.5);
}

#[tokio::test]
async fn aggregate_with_bad_path_is_rejected() {
    let (app, _server) = harness().await;

    let payload = json!({ "field_path": "a..b", "operation": "count" });
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/aggregate")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

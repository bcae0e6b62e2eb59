//! End-to-end tests of the HTTP boundary over an in-memory engine.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use braid_engine::{BraidNode, BraidNodeConfig};
use braid_meta::MetaStore;
use braid_store::{BlobStore, MemoryStore};
use braid_types::OwnerId;
use tower::ServiceExt;

use crate::{HttpServer, HttpServerConfig, JwtResolver, issue_token};

const SECRET: &str = "test-secret";
const OWNER: OwnerId = OwnerId::new(1);

struct TestApp {
    router: Router,
    backends: Vec<Arc<MemoryStore>>,
    meta: Arc<MetaStore>,
}

fn app() -> TestApp {
    let backends: Vec<Arc<MemoryStore>> = (0..6).map(|_| Arc::new(MemoryStore::new())).collect();
    let meta = Arc::new(MetaStore::in_memory());
    let dyn_backends: Vec<Arc<dyn BlobStore>> = backends
        .iter()
        .map(|b| b.clone() as Arc<dyn BlobStore>)
        .collect();
    let node = BraidNode::new(BraidNodeConfig::default(), dyn_backends, meta.clone()).unwrap();

    let server = HttpServer::new(HttpServerConfig {
        engine: Arc::new(node),
        resolver: Arc::new(JwtResolver::new(SECRET)),
    });

    TestApp {
        router: server.into_router(),
        backends,
        meta,
    }
}

fn bearer() -> String {
    let token = issue_token(SECRET, OWNER, Duration::from_secs(3600)).unwrap();
    format!("Bearer {token}")
}

/// Build a `multipart/form-data` body with one `file` field.
fn multipart_body(filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "braid-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    let (content_type, body) = multipart_body(filename, content);
    Request::builder()
        .method("POST")
        .uri("/file")
        .header(header::AUTHORIZATION, bearer())
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let app = app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file/list")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_token_rejected() {
    let app = app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file/list")
                .header(header::AUTHORIZATION, "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_and_retrieve() {
    let app = app();

    let response = app
        .router
        .clone()
        .oneshot(upload_request("hello.txt", b"hello braid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_bytes(response).await,
        b"File successfully encoded and stored"
    );

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file?filename=hello.txt")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"hello.txt\""
    );
    assert_eq!(body_bytes(response).await, b"hello braid");
}

#[tokio::test]
async fn test_duplicate_upload_is_400() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(upload_request("dup.txt", b"one"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .oneshot(upload_request("dup.txt", b"two"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, b"File already exists");
}

#[tokio::test]
async fn test_retrieve_unknown_is_404() {
    let app = app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file?filename=ghost.txt")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, b"File not found or shards missing");
}

#[tokio::test]
async fn test_unrecoverable_is_400() {
    let app = app();
    app.router
        .clone()
        .oneshot(upload_request("frail.bin", b"some file content here"))
        .await
        .unwrap();

    // Destroy more blobs than parity can cover.
    let rows = app.meta.find_shards(OWNER, "frail.bin").unwrap();
    for index in [0usize, 2, 4] {
        let record = rows.iter().find(|r| r.shard_index as usize == index).unwrap();
        app.backends[index].delete(&record.shard_name).await.unwrap();
    }

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file?filename=frail.bin")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_bytes(response).await,
        b"Not enough shards to reconstruct the file"
    );
}

#[tokio::test]
async fn test_list_files() {
    let app = app();
    app.router
        .clone()
        .oneshot(upload_request("a.txt", b"aaaa"))
        .await
        .unwrap();
    app.router
        .clone()
        .oneshot(upload_request("b.txt", b"bbbbbbbb"))
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file/list")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["original_filename"], "a.txt");
    assert_eq!(entries[0]["original_file_size"], 4);
    assert_eq!(entries[0]["shards_total"], 6);
    assert_eq!(entries[0]["shards_retrievable"], 6);
    assert_eq!(entries[1]["original_filename"], "b.txt");
}

#[tokio::test]
async fn test_delete_file() {
    let app = app();
    app.router
        .clone()
        .oneshot(upload_request("bye.txt", b"goodbye"))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/file?filename=bye.txt")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"File deleted successfully");

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file?filename=bye.txt")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_owner_isolation_via_tokens() {
    let app = app();
    app.router
        .clone()
        .oneshot(upload_request("mine.txt", b"owner one data"))
        .await
        .unwrap();

    // A different user's token cannot see the file.
    let other = issue_token(SECRET, OwnerId::new(2), Duration::from_secs(3600)).unwrap();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/file?filename=mine.txt")
                .header(header::AUTHORIZATION, format!("Bearer {other}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_file_field_is_400() {
    let app = app();
    let boundary = "b";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{boundary}--\r\n"
    );
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/file")
                .header(header::AUTHORIZATION, bearer())
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

//! Integration tests for the mock server over real HTTP connections.

use mockgen::{MockBundle, MockServer, ServerOptions};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::path::Path;

async fn start_with_bundle(dir: &Path, bundle_json: &str) -> MockServer {
    let path = dir.join("mock.json");
    let bundle: MockBundle = serde_json::from_str(bundle_json).unwrap();
    bundle.write(&path).unwrap();

    let options = ServerOptions {
        port: 0,
        ..ServerOptions::new(path)
    };
    MockServer::start(options).await.unwrap()
}

fn url(server: &MockServer, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", server.port(), path)
}

#[tokio::test]
async fn test_stateful_round_trip_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(
        dir.path(),
        r#"{"/api/todos": {"method": "POST", "stateful": true,
                           "body": {"id": "{{auto}}", "title": "{{body.title}}"}}}"#,
    )
    .await;
    let client = Client::new();

    let response = client
        .post(url(&server, "/api/todos"))
        .json(&json!({"title": "write tests"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created, json!({"id": "1", "title": "write tests"}));

    client
        .post(url(&server, "/api/todos"))
        .json(&json!({"title": "ship"}))
        .send()
        .await
        .unwrap();

    let listed: Value = client
        .get(url(&server, "/api/todos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        listed,
        json!([
            {"id": "1", "title": "write tests"},
            {"id": "2", "title": "ship"}
        ])
    );

    server.stop().await;
}

#[tokio::test]
async fn test_unmatched_request_is_json_404_with_cors() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(dir.path(), "{}").await;

    let response = Client::new()
        .get(url(&server, "/nothing/here"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"error": "Mock not found", "method": "GET", "path": "/nothing/here"})
    );

    server.stop().await;
}

#[tokio::test]
async fn test_preflight_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(
        dir.path(),
        r#"{"/api/users/:id": {"method": "DELETE", "status": 204}}"#,
    )
    .await;
    let client = Client::new();

    let response = client
        .request(Method::OPTIONS, url(&server, "/api/users/3"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-methods"], "*");

    let response = client
        .delete(url(&server, "/api/users/3"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.bytes().await.unwrap().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_percent_encoded_path_matches_decoded_route() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(
        dir.path(),
        r#"{"/files/annual report": {"method": "GET", "body": {"found": true}}}"#,
    )
    .await;

    let response = Client::new()
        .get(url(&server, "/files/annual%20report"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"found": true}));

    server.stop().await;
}

#[tokio::test]
async fn test_trailing_slash_shares_stateful_log() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(
        dir.path(),
        r#"{
            "/todos": {"method": "POST", "stateful": true, "body": {"title": "{{body.title}}"}},
            "GET /todos": {"method": "GET", "body": []}
        }"#,
    )
    .await;
    let client = Client::new();

    let response = client
        .post(url(&server, "/todos/"))
        .json(&json!({"title": "slash"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    for path in ["/todos", "/todos/"] {
        let listed: Value = client
            .get(url(&server, path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed, json!([{"title": "slash"}]), "GET {path}");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_unparseable_body_is_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(
        dir.path(),
        r#"{"/notes": {"method": "POST", "stateful": true, "body": {"text": "{{body.text}}"}}}"#,
    )
    .await;

    let response = Client::new()
        .post(url(&server, "/notes"))
        .header("content-type", "application/json")
        .body("{ this is not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"text": "null"}));

    server.stop().await;
}

#[tokio::test]
async fn test_reload_picks_up_new_routes() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(dir.path(), r#"{"/a": {"method": "GET"}}"#).await;
    let client = Client::new();

    let response = client.get(url(&server, "/b")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bundle: MockBundle = serde_json::from_str(
        r#"{"/a": {"method": "GET"}, "/b": {"method": "GET", "body": {"new": true}}}"#,
    )
    .unwrap();
    bundle.write(dir.path().join("mock.json")).unwrap();
    assert_eq!(server.reload().unwrap(), 2);

    let body: Value = client
        .get(url(&server, "/b"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"new": true}));

    server.stop().await;
}

#[tokio::test]
async fn test_stopped_server_refuses_connections() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_with_bundle(dir.path(), "{}").await;
    let target = url(&server, "/");

    server.stop().await;

    assert!(Client::new().get(target).send().await.is_err());
}

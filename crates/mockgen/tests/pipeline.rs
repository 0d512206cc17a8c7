//! End-to-end: scan a project, generate its mocks and serve them.

use mockgen::config::DocumentFormat;
use mockgen::pipeline;
use mockgen::{MockGenConfig, MockServer, ProjectLayout, ServerOptions};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::fs;

fn frontend_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/services")).unwrap();
    fs::write(
        dir.path().join("src/services/users.ts"),
        "export async function listUsers() {\n\
         \x20 return fetch('/api/users');\n\
         }\n\
         export const createUser = (user) => axios.post('/api/users', user);\n\
         export const removeUser = (id) => axios.delete(`/api/users/${id}`);\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("src/services/todos.js"),
        "export const addTodo = (todo) => axios.post('/api/todos', todo);\n",
    )
    .unwrap();
    dir
}

async fn serve(layout: &ProjectLayout) -> MockServer {
    let options = ServerOptions {
        port: 0,
        ..ServerOptions::new(layout.mock_bundle_path())
    };
    MockServer::start(options).await.unwrap()
}

#[tokio::test]
async fn test_scan_generate_serve() {
    let dir = frontend_project();
    let layout = ProjectLayout::new(dir.path());

    let endpoints = pipeline::scan(&layout).unwrap();
    assert_eq!(endpoints.len(), 4);

    let generated = pipeline::generate(&layout).unwrap();
    assert!(generated.config_warning.is_none());
    assert!(layout.mock_bundle_path().exists());

    let server = serve(&layout).await;
    let base = format!("http://127.0.0.1:{}", server.port());
    let client = Client::new();

    let users: Value = client
        .get(format!("{base}/api/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["email"], "john@example.com");

    let response = client
        .post(format!("{base}/api/users"))
        .json(&json!({"name": "Ada"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["created"], true);

    let response = client
        .delete(format!("{base}/api/users/7"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    server.stop().await;
}

#[tokio::test]
async fn test_response_template_makes_route_stateful() {
    let dir = frontend_project();
    let layout = ProjectLayout::new(dir.path());

    let mut config = MockGenConfig::default();
    config.response_templates.insert(
        "/api/todos".to_string(),
        json!({
            "stateful": true,
            "status": 201,
            "body": {"id": "{{auto}}", "title": "{{body.title}}"}
        }),
    );
    config.write(layout.config_path()).unwrap();

    pipeline::generate(&layout).unwrap();
    let server = serve(&layout).await;
    let base = format!("http://127.0.0.1:{}", server.port());
    let client = Client::new();

    for title in ["milk", "eggs"] {
        let response = client
            .post(format!("{base}/api/todos"))
            .json(&json!({"title": title}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let todos: Value = client
        .get(format!("{base}/api/todos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        todos,
        json!([{"id": "1", "title": "milk"}, {"id": "2", "title": "eggs"}])
    );

    server.stop().await;
}

#[test]
fn test_openapi_documents_discovered_paths() {
    let dir = frontend_project();
    let layout = ProjectLayout::new(dir.path());

    let generated = pipeline::openapi(&layout, DocumentFormat::Json).unwrap();
    assert!(generated.path.ends_with("swagger.json"));

    let document: Value = serde_json::from_str(&fs::read_to_string(&generated.path).unwrap()).unwrap();
    assert_eq!(document["openapi"], "3.0.3");
    assert!(document["paths"]["/api/users"]["get"].is_object());
    assert!(document["paths"]["/api/users"]["post"].is_object());
    assert!(document["paths"]["/api/todos"]["post"].is_object());
}

use axum::http::{self, Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use mock_server::{app, app_with, seed, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, basic("admin", "admin"))
        .body(String::new())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, basic("admin", "admin"))
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/pulp/api/v2/repositories/zoo/")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "Invalid credentials");
}

#[tokio::test]
async fn configured_credentials_are_enforced() {
    let app = app_with(AppState::new(seed(), "alice", "s3cret"));
    let resp = app.clone().oneshot(get("/pulp/api/v2/repositories/zoo/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/pulp/api/v2/repositories/zoo/")
        .header(http::header::AUTHORIZATION, basic("alice", "s3cret"))
        .body(String::new())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- repositories ---

#[tokio::test]
async fn get_repository() {
    let resp = app().oneshot(get("/pulp/api/v2/repositories/zoo/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let repo = body_json(resp).await;
    assert_eq!(repo["id"], "zoo");
    assert!(repo.get("importers").is_none());
}

#[tokio::test]
async fn get_repository_with_details() {
    let resp = app()
        .oneshot(get("/pulp/api/v2/repositories/registry/?details=true"))
        .await
        .unwrap();
    let repo = body_json(resp).await;
    assert_eq!(repo["importers"][0]["importer_type_id"], "docker_importer");
    assert_eq!(repo["distributors"], json!([]));
}

#[tokio::test]
async fn get_missing_repository_returns_404() {
    let resp = app().oneshot(get("/pulp/api/v2/repositories/nope/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["message"], "not found");
}

#[tokio::test]
async fn list_repositories() {
    let resp = app().oneshot(get("/pulp/api/v2/repositories/")).await.unwrap();
    let repos = body_json(resp).await;
    assert_eq!(repos.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn sync_without_override_config_is_rejected() {
    let resp = app()
        .oneshot(post_json("/pulp/api/v2/repositories/zoo/actions/sync/", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "override_config");
}

// --- units ---

#[tokio::test]
async fn search_units_projects_fields() {
    let resp = app()
        .oneshot(post_json(
            "/pulp/api/v2/repositories/zoo/search/units/",
            r#"{"criteria":{"fields":{"unit":["name","version"]},"limit":2}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let units = body_json(resp).await;
    let units = units.as_array().unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0]["metadata"], json!({"name": "bear", "version": "4.1"}));
    assert_eq!(units[0]["repo_id"], "zoo");
}

#[tokio::test]
async fn search_units_filters_type_ids() {
    let resp = app()
        .oneshot(post_json(
            "/pulp/api/v2/repositories/registry/search/units/",
            r#"{"criteria":{"type_ids":["rpm"]}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!([]));
}

// --- tasks ---

#[tokio::test]
async fn get_missing_task_returns_404() {
    let resp = app().oneshot(get("/pulp/api/v2/tasks/nope/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_then_poll_to_completion() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/pulp/api/v2/repositories/zoo/actions/sync/",
            r#"{"override_config":{}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let report = body_json(resp).await;
    let task_id = report["spawned_tasks"][0]["task_id"].as_str().unwrap().to_string();

    let mut states = Vec::new();
    loop {
        let resp = app
            .clone()
            .oneshot(get(&format!("/pulp/api/v2/tasks/{task_id}/")))
            .await
            .unwrap();
        let task = body_json(resp).await;
        let state = task["state"].as_str().unwrap().to_string();
        states.push(state.clone());
        if state == "finished" {
            assert_eq!(task["progress_report"]["yum_importer"]["content"]["items_left"], 0);
            assert_eq!(task["result"]["details"]["content"]["items_total"], 3);
            break;
        }
        assert!(states.len() < 10, "task never finished: {states:?}");
    }
    assert_eq!(states, ["running", "running", "finished"]);

    // the task shows up in the listing with pagination links
    let resp = app.oneshot(get("/pulp/api/v2/tasks/?per_page=1")).await.unwrap();
    let link = resp.headers()[http::header::LINK].to_str().unwrap().to_string();
    assert!(link.contains(r#"rel="first""#));
    assert!(link.contains(r#"rel="last""#));
    let tasks = body_json(resp).await;
    assert_eq!(tasks.as_array().unwrap().len(), 1);
}

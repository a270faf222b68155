//! In-memory emulation of the slice of the Pulp 2 REST API exercised by
//! `pulp-core`: repository reads, repository sync, task polling and unit
//! search, all behind HTTP basic auth.
//!
//! Sync tasks advance one step every time they are fetched, so a polling
//! client sees `running` with shrinking counters and then a terminal state.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_ROOT: &str = "/pulp/api/v2";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importer {
    Yum,
    Docker,
}

impl Importer {
    fn type_id(&self) -> &'static str {
        match self {
            Importer::Yum => "yum_importer",
            Importer::Docker => "docker_importer",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub unit_type_id: String,
    pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Repo {
    pub id: String,
    pub display_name: String,
    pub importer: Importer,
    /// A repository without a feed fails every sync.
    pub feed: Option<String>,
    pub units: Vec<Unit>,
}

#[derive(Clone, Debug)]
pub struct SyncTask {
    pub id: String,
    pub repo_id: String,
    pub importer: Importer,
    pub items_total: u64,
    pub fetches: u64,
    pub fails: bool,
}

impl SyncTask {
    /// Advances the task by one step and renders it.
    fn poll(&mut self) -> Value {
        self.fetches += 1;
        self.render()
    }

    fn render(&self) -> Value {
        let items_left = self.items_total.saturating_sub(self.fetches);
        let started = self.fetches > 0;
        let (state, task_error) = if self.fails && started {
            (
                "error",
                json!({"resource": "repository", "field": "feed", "code": "PLP1005"}),
            )
        } else if !started {
            ("waiting", Value::Null)
        } else if items_left == 0 {
            ("finished", Value::Null)
        } else {
            ("running", Value::Null)
        };
        let content_state = if items_left == 0 { "FINISHED" } else { "IN_PROGRESS" };

        let content = json!({
            "state": content_state,
            "items_total": self.items_total,
            "items_left": items_left,
            "size_total": self.items_total * 1024,
            "size_left": items_left * 1024,
            "error_details": []
        });
        let mut progress = Map::new();
        if started {
            progress.insert(
                self.importer.type_id().to_string(),
                json!({"content": content, "metadata": {"state": "FINISHED", "error": null}}),
            );
        }
        let result = match state {
            "finished" => json!({"details": {"content": content}}),
            _ => Value::Null,
        };
        let start_time = started.then_some("2016-04-12T08:39:41Z");
        let finish_time = matches!(state, "finished" | "error").then_some("2016-04-12T08:40:02Z");

        json!({
            "task_id": self.id,
            "_href": format!("{API_ROOT}/tasks/{}/", self.id),
            "tags": [format!("pulp:repository:{}", self.repo_id), "pulp:action:sync"],
            "start_time": start_time,
            "finish_time": finish_time,
            "state": state,
            "error": task_error,
            "progress_report": progress,
            "result": result
        })
    }
}

#[derive(Debug, Default)]
pub struct Db {
    pub repos: BTreeMap<String, Repo>,
    pub tasks: BTreeMap<String, SyncTask>,
}

#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
    username: Arc<str>,
    password: Arc<str>,
}

impl AppState {
    pub fn new(db: Db, username: &str, password: &str) -> Self {
        Self {
            db: Arc::new(RwLock::new(db)),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Repositories every fresh server starts with.
pub fn seed() -> Db {
    let rpm = |id: &str, name: &str, version: &str, requires: Value| Unit {
        id: id.to_string(),
        unit_type_id: "rpm".to_string(),
        metadata: json!({
            "name": name,
            "version": version,
            "filename": format!("{name}-{version}-1.noarch.rpm"),
            "requires": requires,
            "checksum": "deadbeef"
        })
        .as_object()
        .cloned()
        .unwrap_or_default(),
    };

    let repos = [
        Repo {
            id: "zoo".to_string(),
            display_name: "Zoo".to_string(),
            importer: Importer::Yum,
            feed: Some("https://repos.example.com/zoo/".to_string()),
            units: vec![
                rpm("u-bear", "bear", "4.1", json!([])),
                rpm("u-cheetah", "cheetah", "5.2", json!([{"name": "bear", "version": "4.1"}])),
                rpm("u-lion", "lion", "0.4", json!([{"name": "cheetah", "version": "5.2"}])),
            ],
        },
        Repo {
            id: "registry".to_string(),
            display_name: "Registry".to_string(),
            importer: Importer::Docker,
            feed: Some("https://registry.example.com".to_string()),
            units: vec![Unit {
                id: "u-busybox".to_string(),
                unit_type_id: "docker_image".to_string(),
                metadata: json!({"name": "busybox", "version": "latest"})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            }],
        },
        Repo {
            id: "orphan".to_string(),
            display_name: "No feed".to_string(),
            importer: Importer::Yum,
            feed: None,
            units: Vec::new(),
        },
    ];

    Db {
        repos: repos.into_iter().map(|r| (r.id.clone(), r)).collect(),
        tasks: BTreeMap::new(),
    }
}

pub fn app() -> Router {
    app_with(AppState::new(seed(), "admin", "admin"))
}

pub fn app_with(state: AppState) -> Router {
    let api = Router::new()
        .route("/repositories/", get(list_repos))
        .route("/repositories/{id}/", get(get_repo))
        .route("/repositories/{id}/actions/sync/", post(sync_repo))
        .route("/repositories/{id}/search/units/", post(search_units))
        .route("/tasks/", get(list_tasks))
        .route("/tasks/{id}/", get(get_task))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_basic_auth));

    Router::new().nest(API_ROOT, api).with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: impl Into<String>, errors: Value) -> Response {
    (status, Json(json!({"message": message.into(), "errors": errors}))).into_response()
}

async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("{}:{}", state.username, state.password);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|token| STANDARD.decode(token).ok())
        .is_some_and(|decoded| decoded == expected.as_bytes());

    if authorized {
        next.run(request).await
    } else {
        error(StatusCode::UNAUTHORIZED, "Invalid credentials", json!([]))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepoQuery {
    pub details: bool,
    pub importers: bool,
    pub distributors: bool,
}

fn render_repo(repo: &Repo, query: &RepoQuery) -> Value {
    let mut counts = BTreeMap::<&str, u64>::new();
    for unit in &repo.units {
        *counts.entry(unit.unit_type_id.as_str()).or_default() += 1;
    }
    let mut body = json!({
        "id": repo.id,
        "display_name": repo.display_name,
        "description": null,
        "notes": {"_repo-type": format!("{}-repo", if repo.importer == Importer::Yum { "rpm" } else { "docker" })},
        "content_unit_counts": counts,
        "total_repository_units": repo.units.len(),
        "last_unit_added": null,
        "_href": format!("{API_ROOT}/repositories/{}/", repo.id)
    });
    if query.details || query.importers {
        body["importers"] = json!([{
            "importer_type_id": repo.importer.type_id(),
            "config": {"feed": repo.feed}
        }]);
    }
    if query.details || query.distributors {
        body["distributors"] = json!([]);
    }
    body
}

async fn list_repos(State(state): State<AppState>, Query(query): Query<RepoQuery>) -> Json<Vec<Value>> {
    let db = state.db.read().await;
    Json(db.repos.values().map(|r| render_repo(r, &query)).collect())
}

async fn get_repo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RepoQuery>,
) -> Response {
    let db = state.db.read().await;
    match db.repos.get(&id) {
        Some(repo) => Json(render_repo(repo, &query)).into_response(),
        None => error(StatusCode::NOT_FOUND, "not found", json!([])),
    }
}

async fn sync_repo(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    if body.get("override_config").is_none() {
        return error(
            StatusCode::BAD_REQUEST,
            "Missing values for override_config",
            json!([{"resource": "repository", "field": "override_config", "code": "missing"}]),
        );
    }

    let mut db = state.db.write().await;
    let Some(repo) = db.repos.get(&id) else {
        return error(StatusCode::NOT_FOUND, "not found", json!([]));
    };
    let task = SyncTask {
        id: Uuid::new_v4().to_string(),
        repo_id: repo.id.clone(),
        importer: repo.importer,
        items_total: repo.units.len() as u64,
        fetches: 0,
        fails: repo.feed.is_none(),
    };
    let report = json!({
        "result": null,
        "error": null,
        "spawned_tasks": [{"_href": format!("{API_ROOT}/tasks/{}/", task.id), "task_id": task.id}]
    });
    db.tasks.insert(task.id.clone(), task);
    (StatusCode::ACCEPTED, Json(report)).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

async fn list_tasks(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    let db = state.db.read().await;
    let per_page = query.per_page.unwrap_or(20).max(1);
    let page = query.page.unwrap_or(1).max(1);
    let last = db.tasks.len().div_ceil(per_page).max(1);

    let tasks: Vec<Value> = db
        .tasks
        .values()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(SyncTask::render)
        .collect();

    let link = |p: usize, rel: &str| format!("<{API_ROOT}/tasks/?page={p}&per_page={per_page}>; rel=\"{rel}\"");
    let mut links = vec![link(1, "first"), link(last, "last")];
    if page < last {
        links.push(link(page + 1, "next"));
    }
    if page > 1 {
        links.push(link(page - 1, "prev"));
    }

    let mut headers = HeaderMap::new();
    if let Ok(value) = links.join(", ").parse() {
        headers.insert(header::LINK, value);
    }
    (headers, Json(tasks)).into_response()
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut db = state.db.write().await;
    match db.tasks.get_mut(&id) {
        Some(task) => Json(task.poll()).into_response(),
        None => error(StatusCode::NOT_FOUND, format!("Missing resource(s): task_id={id}"), json!([])),
    }
}

async fn search_units(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    let db = state.db.read().await;
    let Some(repo) = db.repos.get(&id) else {
        return error(StatusCode::NOT_FOUND, "not found", json!([]));
    };

    let criteria = &body["criteria"];
    let strings = |v: &Value| -> Option<Vec<String>> {
        v.as_array()
            .map(|a| a.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
    };
    let fields = strings(&criteria["fields"]["unit"]);
    let type_ids = strings(&criteria["type_ids"]);
    let limit = criteria["limit"].as_u64().map(|l| l as usize).unwrap_or(usize::MAX);

    let units: Vec<Value> = repo
        .units
        .iter()
        .filter(|u| type_ids.as_ref().map_or(true, |ids| ids.contains(&u.unit_type_id)))
        .take(limit)
        .map(|u| {
            let metadata: Map<String, Value> = match &fields {
                Some(fields) => u
                    .metadata
                    .iter()
                    .filter(|(k, _)| fields.contains(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                None => u.metadata.clone(),
            };
            json!({
                "id": u.id,
                "repo_id": repo.id,
                "unit_type_id": u.unit_type_id,
                "metadata": metadata
            })
        })
        .collect();

    Json(units).into_response()
}

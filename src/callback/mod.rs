//! Status Callback Receiver: the HTTP endpoint worker containers use to
//! report state transitions and re-read task details. Reachable only from
//! the docker network the workers run on; no authentication beyond that
//! network locality.

use crate::events::EventLog;
use crate::registry::{RegistryStore, Task, TaskStatus, TaskStatusUpdate};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
struct AppState {
    store: RegistryStore,
    events: Arc<EventLog>,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    fn not_found(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: msg.into() }
    }

    fn internal(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Body accepted by `POST /internal/tasks/<pid>/<tid>/status`.
#[derive(Debug, Deserialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Ack {
    ok: bool,
}

fn parse_status(raw: &str) -> Option<TaskStatus> {
    match raw {
        "pending" => Some(TaskStatus::Pending),
        "plan_pending" => Some(TaskStatus::PlanPending),
        "plan_approved" => Some(TaskStatus::PlanApproved),
        "claimed" => Some(TaskStatus::Claimed),
        "running" => Some(TaskStatus::Running),
        "merging" => Some(TaskStatus::Merging),
        "testing" => Some(TaskStatus::Testing),
        "merge_pending" => Some(TaskStatus::MergePending),
        "completed" => Some(TaskStatus::Completed),
        "failed" => Some(TaskStatus::Failed),
        "cancelled" => Some(TaskStatus::Cancelled),
        _ => None,
    }
}

async fn post_status(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(String, String)>,
    Json(body): Json<StatusReport>,
) -> Result<Json<Ack>, AppError> {
    let Some(status) = parse_status(&body.status) else {
        return Err(AppError::bad_request(format!("unknown status '{}'", body.status)));
    };

    let mut update = TaskStatusUpdate::new().status(status);
    if let Some(branch) = body.branch {
        update = update.branch(Some(branch));
    }
    if let Some(commit) = body.commit {
        update = update.commit_id(Some(commit));
    }
    if let Some(error) = body.error {
        update = update.error(Some(error));
    }

    let project_id_clone = project_id.clone();
    let task_id_clone = task_id.clone();
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.update_task_status(&project_id_clone, &task_id_clone, update)
    })
    .await
    .map_err(|e| AppError::internal(format!("status update panicked: {}", e)))?;

    match result {
        Ok(_) => {
            state.events.push(
                "callback",
                format!("task {} in project {} reported status {}", task_id, project_id, body.status),
            );
            Ok(Json(Ack { ok: true }))
        }
        Err(e) => Err(AppError::bad_request(e.to_string())),
    }
}

async fn get_task(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(String, String)>,
) -> Result<Json<Task>, AppError> {
    let store = state.store.clone();
    let project_id_clone = project_id.clone();
    let task_id_clone = task_id.clone();
    let result = tokio::task::spawn_blocking(move || store.get_task(&project_id_clone, &task_id_clone))
        .await
        .map_err(|e| AppError::internal(format!("task lookup panicked: {}", e)))?;

    match result {
        Ok(Some(task)) => Ok(Json(task)),
        Ok(None) => Err(AppError::not_found(format!("task '{}' not found in project '{}'", task_id, project_id))),
        Err(e) => Err(AppError::internal(e.to_string())),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn build_router(store: RegistryStore, events: Arc<EventLog>) -> Router {
    let state = AppState { store, events };
    Router::new()
        .route("/internal/tasks/{pid}/{tid}/status", post(post_status))
        .route("/internal/tasks/{pid}/{tid}", get(get_task))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the callback receiver until the process exits.
pub async fn serve(store: RegistryStore, events: Arc<EventLog>, bind_addr: &str) -> crate::error::Result<()> {
    let app = build_router(store, events);
    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| crate::error::CorralError::ConfigError(format!("invalid callback_bind_addr '{}': {}", bind_addr, e)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| crate::error::CorralError::ConfigError(format!("failed to bind '{}': {}", addr, e)))?;

    tracing::info!(%addr, "status callback receiver listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::CorralError::ConfigError(format!("callback server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Project, ProjectSource, ProjectStatus};
    use chrono::Utc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn store() -> (TempDir, RegistryStore) {
        let dir = TempDir::new().unwrap();
        (dir, RegistryStore::new(dir.path()))
    }

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            name: "demo".to_string(),
            source: ProjectSource::New,
            remote_url: None,
            base_branch: "main".to_string(),
            remote_name: "origin".to_string(),
            auto_merge: false,
            auto_push: false,
            merge_test_command: vec!["./merge_and_test.sh".to_string()],
            status: ProjectStatus::Ready,
            error: None,
            created_at: Utc::now(),
        }
    }

    fn task(id: &str, project_id: &str) -> Task {
        Task {
            id: id.to_string(),
            project_id: project_id.to_string(),
            title: "demo".to_string(),
            description: "demo".to_string(),
            priority: 0,
            depends_on: None,
            plan_mode: false,
            plan: None,
            plan_session_id: None,
            plan_answers: Default::default(),
            plan_messages: Vec::new(),
            worker_id: Some("worker-1".to_string()),
            branch: None,
            commit_id: None,
            error: None,
            status: TaskStatus::Running,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn rejects_unknown_status_with_400() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        store.create_task("proj0001", task("task0001", "proj0001")).unwrap();

        let app = build_router(store, Arc::new(EventLog::new(10)));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/internal/tasks/proj0001/task0001/status")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"status":"bogus"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn applies_valid_status_update() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        store.create_task("proj0001", task("task0001", "proj0001")).unwrap();

        let app = build_router(store.clone(), Arc::new(EventLog::new(10)));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/internal/tasks/proj0001/task0001/status")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"status":"merging","commit":"abc123"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated = store.get_task("proj0001", "task0001").unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Merging);
        assert_eq!(updated.commit_id.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let (_dir, store) = store();
        let app = build_router(store, Arc::new(EventLog::new(10)));
        let request = axum::http::Request::builder().uri("/healthz").body(axum::body::Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

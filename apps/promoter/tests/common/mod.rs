//! In-process mock of the MLflow REST endpoints used by the registry client.
//!
//! The server runs on its own thread with a current-thread tokio runtime so
//! tests can drive the blocking client from the test thread.

// Not every test binary uses every helper.
#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use promoter::mlflow::{
    CreateModelVersionRequest, CreateRegisteredModelRequest, TransitionStageRequest,
};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    GetRun {
        run_id: String,
    },
    CreateModel {
        name: String,
    },
    CreateVersion {
        name: String,
        source: String,
        run_id: String,
    },
    GetVersion {
        name: String,
        version: String,
    },
    Transition {
        name: String,
        version: String,
        stage: String,
        archive_existing_versions: bool,
    },
}

/// Registry contents and scripted behaviour.
#[derive(Debug)]
pub struct MockState {
    /// run_id -> artifact_uri
    pub runs: HashMap<String, String>,
    pub registered_models: HashSet<String>,
    /// (name, version) -> current stage
    pub versions: HashMap<(String, String), String>,
    pub next_version: u64,
    /// Exact `Authorization` header required, if any.
    pub expected_auth: Option<String>,
    /// Number of readiness checks answered with PENDING_REGISTRATION.
    pub pending_polls: u32,
    /// Status reported once pending polls are used up.
    pub final_status: &'static str,
    /// (status, error_code, message) returned by transition-stage.
    pub transition_error: Option<(u16, String, String)>,
    pub calls: Vec<Recorded>,
    pub auth_headers: Vec<Option<String>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            runs: HashMap::new(),
            registered_models: HashSet::new(),
            versions: HashMap::new(),
            next_version: 0,
            expected_auth: None,
            pending_polls: 0,
            final_status: "READY",
            transition_error: None,
            calls: Vec::new(),
            auth_headers: Vec::new(),
        }
    }
}

impl MockState {
    /// A registry that knows a single run.
    pub fn with_run(run_id: &str, artifact_uri: &str) -> Self {
        let mut state = Self::default();
        state
            .runs
            .insert(run_id.to_string(), artifact_uri.to_string());
        state
    }
}

type Shared = Arc<Mutex<MockState>>;

/// Handle to a running mock server.
pub struct MockMlflow {
    /// Tracking URI to hand to the client.
    pub uri: String,
    state: Shared,
}

impl MockMlflow {
    /// Serve the API at the server root.
    pub fn start(state: MockState) -> Self {
        Self::start_at("", state)
    }

    /// Serve the API below `prefix` (e.g. `/acme/repo.mlflow`).
    pub fn start_at(prefix: &str, state: MockState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let api = format!("{prefix}/api/2.0/mlflow");
        let router = Router::new()
            .route(&format!("{api}/runs/get"), get(get_run))
            .route(
                &format!("{api}/registered-models/create"),
                post(create_registered_model),
            )
            .route(
                &format!("{api}/model-versions/create"),
                post(create_model_version),
            )
            .route(&format!("{api}/model-versions/get"), get(get_model_version))
            .route(
                &format!("{api}/model-versions/transition-stage"),
                post(transition_stage),
            )
            .with_state(state.clone());

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, router).await.unwrap();
            });
        });
        let addr = rx.recv().unwrap();

        Self {
            uri: format!("http://{addr}{prefix}"),
            state,
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().auth_headers.clone()
    }

    pub fn stage_of(&self, name: &str, version: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .versions
            .get(&(name.to_string(), version.to_string()))
            .cloned()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

fn mlflow_error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({"error_code": code, "message": message}))).into_response()
}

/// Record the Authorization header and enforce it when configured.
fn authorize(state: &mut MockState, headers: &HeaderMap) -> Result<(), Response> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.auth_headers.push(provided.clone());

    match &state.expected_auth {
        Some(expected) if provided.as_ref() != Some(expected) => {
            Err((StatusCode::UNAUTHORIZED, "Unauthorized").into_response())
        }
        _ => Ok(()),
    }
}

fn version_json(name: &str, version: &str, stage: &str, status: &str) -> Value {
    json!({
        "model_version": {
            "name": name,
            "version": version,
            "current_stage": stage,
            "status": status,
        }
    })
}

async fn get_run(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    let run_id = query.get("run_id").cloned().unwrap_or_default();
    state.calls.push(Recorded::GetRun {
        run_id: run_id.clone(),
    });

    match state.runs.get(&run_id) {
        Some(artifact_uri) => Json(json!({
            "run": {"info": {"run_id": run_id, "artifact_uri": artifact_uri}}
        }))
        .into_response(),
        None => mlflow_error(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            &format!("Run '{run_id}' not found"),
        ),
    }
}

async fn create_registered_model(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CreateRegisteredModelRequest>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    state.calls.push(Recorded::CreateModel {
        name: body.name.clone(),
    });

    if !state.registered_models.insert(body.name.clone()) {
        return mlflow_error(
            StatusCode::BAD_REQUEST,
            "RESOURCE_ALREADY_EXISTS",
            &format!("Registered Model (name={}) already exists.", body.name),
        );
    }
    Json(json!({"registered_model": {"name": body.name}})).into_response()
}

async fn create_model_version(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CreateModelVersionRequest>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    state.calls.push(Recorded::CreateVersion {
        name: body.name.clone(),
        source: body.source.clone(),
        run_id: body.run_id.clone(),
    });

    state.next_version += 1;
    let version = state.next_version.to_string();
    state
        .versions
        .insert((body.name.clone(), version.clone()), "None".to_string());
    let status = if state.pending_polls > 0 {
        "PENDING_REGISTRATION"
    } else {
        state.final_status
    };
    Json(version_json(&body.name, &version, "None", status)).into_response()
}

async fn get_model_version(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    let name = query.get("name").cloned().unwrap_or_default();
    let version = query.get("version").cloned().unwrap_or_default();
    state.calls.push(Recorded::GetVersion {
        name: name.clone(),
        version: version.clone(),
    });

    let Some(stage) = state.versions.get(&(name.clone(), version.clone())).cloned() else {
        return mlflow_error(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            &format!("Model Version (name={name}, version={version}) not found"),
        );
    };
    if state.pending_polls > 0 {
        state.pending_polls -= 1;
    }
    let status = if state.pending_polls > 0 {
        "PENDING_REGISTRATION"
    } else {
        state.final_status
    };
    Json(version_json(&name, &version, &stage, status)).into_response()
}

async fn transition_stage(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<TransitionStageRequest>,
) -> Response {
    let mut state = state.lock().unwrap();
    if let Err(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    state.calls.push(Recorded::Transition {
        name: body.name.clone(),
        version: body.version.clone(),
        stage: body.stage.clone(),
        archive_existing_versions: body.archive_existing_versions,
    });

    if let Some((status, code, message)) = state.transition_error.clone() {
        let status = StatusCode::from_u16(status).unwrap();
        return mlflow_error(status, &code, &message);
    }

    let key = (body.name.clone(), body.version.clone());
    match state.versions.get_mut(&key) {
        Some(stage) => {
            *stage = body.stage.clone();
            Json(version_json(&body.name, &body.version, &body.stage, "READY")).into_response()
        }
        None => mlflow_error(
            StatusCode::NOT_FOUND,
            "RESOURCE_DOES_NOT_EXIST",
            &format!(
                "Model Version (name={}, version={}) not found",
                body.name, body.version
            ),
        ),
    }
}

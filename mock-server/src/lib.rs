//! In-process mock of a Parse-style REST backend.
//!
//! # Design
//! Handlers are thin: they pull path, query, headers and body out of the
//! request and delegate to `store::Store`, which owns all semantics. Every
//! `/1/...` route sits behind a key check that mirrors the real service's
//! identification headers; downloads under `/files/...` are public.

pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::store::{BatchOp, Failure, ListParams, Record, Store, ROLE_CLASS, USER_CLASS};

pub const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
pub const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";
pub const MASTER_KEY_HEADER: &str = "X-Parse-Master-Key";
pub const SESSION_TOKEN_HEADER: &str = "X-Parse-Session-Token";

/// Credentials the mock accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub application_id: String,
    pub rest_api_key: String,
    pub master_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application_id: "test-app-id".to_string(),
            rest_api_key: "test-rest-key".to_string(),
            master_key: "test-master-key".to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `MOCK_PARSE_APPLICATION_ID`, `MOCK_PARSE_REST_API_KEY` and
    /// `MOCK_PARSE_MASTER_KEY`, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, default: String| std::env::var(name).unwrap_or(default);
        Self {
            application_id: var("MOCK_PARSE_APPLICATION_ID", defaults.application_id),
            rest_api_key: var("MOCK_PARSE_REST_API_KEY", defaults.rest_api_key),
            master_key: var("MOCK_PARSE_MASTER_KEY", defaults.master_key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            config: Arc::new(config),
        }
    }

    fn is_master(&self, headers: &HeaderMap) -> bool {
        header_value(headers, MASTER_KEY_HEADER) == Some(self.config.master_key.as_str())
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

type Reply = Result<(StatusCode, Json<Value>), Failure>;

fn ok(body: Record) -> Reply {
    Ok((StatusCode::OK, Json(Value::Object(body))))
}

fn created(body: Record) -> Reply {
    Ok((StatusCode::CREATED, Json(Value::Object(body))))
}

pub fn app(config: ServerConfig) -> Router {
    router(AppState::new(config))
}

/// Router over caller-supplied state, so tests can inspect the store.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/1/users", post(sign_up).get(list_users))
        .route("/1/users/me", get(current_user))
        .route("/1/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/1/login", get(log_in))
        .route("/1/requestPasswordReset", post(request_password_reset))
        .route("/1/classes/{class}", post(create_object).get(query_objects))
        .route(
            "/1/classes/{class}/{id}",
            get(get_object).put(update_object).delete(delete_object),
        )
        .route("/1/roles", post(create_role).get(list_roles))
        .route("/1/roles/{id}", get(get_role).put(update_role).delete(delete_role))
        .route("/1/batch", post(batch))
        .route("/1/files/{name}", post(upload_file).delete(delete_file))
        .route("/1/events/{name}", post(track_event))
        .route("/1/push", post(send_push))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_keys));

    Router::new()
        .route("/files/{app}/{name}", get(download_file))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: ServerConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

async fn require_keys(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let app_ok = header_value(headers, APPLICATION_ID_HEADER) == Some(state.config.application_id.as_str());
    let key_ok = header_value(headers, REST_API_KEY_HEADER) == Some(state.config.rest_api_key.as_str())
        || state.is_master(headers);
    if !(app_ok && key_ok) {
        warn!(path = %request.uri().path(), "rejected request with missing or wrong keys");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response();
    }
    next.run(request).await
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Decode a JSON-object body; an empty body is an empty object.
fn json_object(body: &Bytes) -> Result<Record, Failure> {
    if body.is_empty() {
        return Ok(Record::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        _ => Err(Failure::invalid_json()),
    }
}

fn require_master(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    if state.is_master(headers) {
        Ok(())
    } else {
        Err(Failure::new(StatusCode::FORBIDDEN, 119, "master key is required"))
    }
}

/// Users may only be changed by themselves (session token) or the master key.
async fn require_user_access(state: &AppState, headers: &HeaderMap, user_id: &str) -> Result<(), Failure> {
    if state.is_master(headers) {
        return Ok(());
    }
    let store = state.store.read().await;
    match header_value(headers, SESSION_TOKEN_HEADER).and_then(|token| store.session_user(token)) {
        Some(owner) if owner == user_id => Ok(()),
        _ => Err(Failure::bad_request(206, format!("cannot modify user {user_id}"))),
    }
}

// --- users ---

async fn sign_up(State(state): State<AppState>, body: Bytes) -> Reply {
    let mut fields = json_object(&body)?;
    let mut store = state.store.write().await;
    if !fields.contains_key("username") {
        if let Some(auth_data) = fields.remove("authData") {
            let (status, user) = store.log_in_with(auth_data)?;
            return Ok((status, Json(Value::Object(user))));
        }
    }
    created(store.create(USER_CLASS, fields)?)
}

async fn log_in(State(state): State<AppState>, Query(query): Query<HashMap<String, String>>) -> Reply {
    let username = query.get("username").map(String::as_str).unwrap_or_default();
    let password = query.get("password").map(String::as_str).unwrap_or_default();
    ok(state.store.write().await.log_in(username, password)?)
}

async fn current_user(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let store = state.store.read().await;
    ok(store.current_user(header_value(&headers, SESSION_TOKEN_HEADER))?)
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Reply {
    ok(state.store.read().await.get(USER_CLASS, &id, params.keys.as_deref())?)
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    let fields = json_object(&body)?;
    require_user_access(&state, &headers, &id).await?;
    ok(state.store.write().await.update(USER_CLASS, &id, fields)?)
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    require_user_access(&state, &headers, &id).await?;
    ok(state.store.write().await.delete(USER_CLASS, &id)?)
}

async fn list_users(State(state): State<AppState>, Query(params): Query<ListParams>) -> Reply {
    ok(state.store.read().await.query(USER_CLASS, &params)?)
}

async fn request_password_reset(State(state): State<AppState>, body: Bytes) -> Reply {
    let fields = json_object(&body)?;
    let email = fields.get("email").and_then(Value::as_str).unwrap_or_default();
    ok(state.store.read().await.request_password_reset(email)?)
}

// --- classes ---

async fn create_object(State(state): State<AppState>, Path(class): Path<String>, body: Bytes) -> Reply {
    let fields = json_object(&body)?;
    created(state.store.write().await.create(&class, fields)?)
}

async fn query_objects(
    State(state): State<AppState>,
    Path(class): Path<String>,
    Query(params): Query<ListParams>,
) -> Reply {
    ok(state.store.read().await.query(&class, &params)?)
}

async fn get_object(
    State(state): State<AppState>,
    Path((class, id)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Reply {
    ok(state.store.read().await.get(&class, &id, params.keys.as_deref())?)
}

async fn update_object(
    State(state): State<AppState>,
    Path((class, id)): Path<(String, String)>,
    body: Bytes,
) -> Reply {
    let fields = json_object(&body)?;
    ok(state.store.write().await.update(&class, &id, fields)?)
}

async fn delete_object(State(state): State<AppState>, Path((class, id)): Path<(String, String)>) -> Reply {
    ok(state.store.write().await.delete(&class, &id)?)
}

// --- roles ---

async fn create_role(State(state): State<AppState>, body: Bytes) -> Reply {
    let fields = json_object(&body)?;
    created(state.store.write().await.create(ROLE_CLASS, fields)?)
}

async fn list_roles(State(state): State<AppState>, Query(params): Query<ListParams>) -> Reply {
    ok(state.store.read().await.query(ROLE_CLASS, &params)?)
}

async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Reply {
    ok(state.store.read().await.get(ROLE_CLASS, &id, params.keys.as_deref())?)
}

async fn update_role(State(state): State<AppState>, Path(id): Path<String>, body: Bytes) -> Reply {
    let fields = json_object(&body)?;
    ok(state.store.write().await.update(ROLE_CLASS, &id, fields)?)
}

async fn delete_role(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    ok(state.store.write().await.delete(ROLE_CLASS, &id)?)
}

// --- batch ---

async fn batch(State(state): State<AppState>, body: Bytes) -> Reply {
    let fields = json_object(&body)?;
    let requests: Vec<BatchOp> = fields
        .get("requests")
        .cloned()
        .and_then(|requests| serde_json::from_value(requests).ok())
        .ok_or_else(|| Failure::bad_request(107, "batch requires a requests array"))?;
    debug!(count = requests.len(), "running batch");
    let results = state.store.write().await.batch(requests)?;
    Ok((StatusCode::OK, Json(Value::Array(results))))
}

// --- files ---

async fn upload_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    let content_type = header_value(&headers, header::CONTENT_TYPE.as_str()).unwrap_or("application/octet-stream");
    let stored = state
        .store
        .write()
        .await
        .put_file(&name, content_type, body.to_vec())?;
    let host = header_value(&headers, header::HOST.as_str()).unwrap_or("localhost");
    let url = format!("http://{host}/files/{}/{stored}", state.config.application_id);

    let mut response = Record::new();
    response.insert("name".to_string(), Value::from(stored));
    response.insert("url".to_string(), Value::from(url));
    created(response)
}

async fn delete_file(State(state): State<AppState>, Path(name): Path<String>, headers: HeaderMap) -> Reply {
    require_master(&state, &headers)?;
    state.store.write().await.delete_file(&name)?;
    ok(Record::new())
}

async fn download_file(
    State(state): State<AppState>,
    Path((app, name)): Path<(String, String)>,
) -> Response {
    if app != state.config.application_id {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.store.read().await.file(&name) {
        Some(file) => (
            [(header::CONTENT_TYPE, file.content_type.clone())],
            file.bytes.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// --- analytics and push ---

async fn track_event(State(state): State<AppState>, Path(name): Path<String>, body: Bytes) -> Reply {
    let fields = json_object(&body)?;
    state.store.write().await.track(&name, fields)?;
    ok(Record::new())
}

async fn send_push(State(state): State<AppState>, body: Bytes) -> Reply {
    let fields = json_object(&body)?;
    ok(state.store.write().await.push(fields)?)
}

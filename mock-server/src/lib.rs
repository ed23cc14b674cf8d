//! In-memory stand-in for the BBJ forum service.
//!
//! Every endpoint is `POST /api/{endpoint}` with a JSON object body. Success
//! responses are `{"data": ..., "usermap"?: ...}`; failures are
//! `{"error": {"code", "description"}}` with a non-2xx status.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_hash: Option<String>,
    pub quip: String,
    pub bio: String,
    pub color: u8,
    pub is_admin: bool,
    pub created: f64,
}

impl User {
    /// The profile as other users see it.
    fn public(&self) -> User {
        User {
            auth_hash: None,
            ..self.clone()
        }
    }

    fn anonymous() -> User {
        User {
            user_id: "anonymous".to_string(),
            user_name: "anonymous".to_string(),
            auth_hash: None,
            quip: String::new(),
            bio: String::new(),
            color: 0,
            is_admin: false,
            created: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub post_id: u64,
    pub thread_id: String,
    pub author: String,
    pub body: String,
    pub created: f64,
    pub edited: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub title: String,
    pub author: String,
    pub created: f64,
    pub last_mod: f64,
    pub reply_count: u64,
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

#[derive(Debug, Default)]
pub struct Store {
    users: HashMap<String, User>,
    threads: Vec<Thread>,
}

impl Store {
    fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.values().find(|u| u.user_name == name)
    }

    fn usermap<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Map<String, Value> {
        ids.into_iter()
            .filter_map(|id| self.users.get(id))
            .map(|u| (u.user_id.clone(), json!(u.public())))
            .collect()
    }
}

pub type Db = Arc<RwLock<Store>>;

/// A business error in the service's envelope format.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    code: i64,
    description: String,
}

impl ApiFailure {
    fn new(status: StatusCode, code: i64, description: impl Into<String>) -> Self {
        Self {
            status,
            code,
            description: description.into(),
        }
    }

    fn undecodable(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, 2, description)
    }

    fn invalid(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, 3, description)
    }

    fn policy(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, 4, description)
    }

    fn denied(description: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, 5, description)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "code": self.code, "description": self.description } });
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/{endpoint}", post(dispatch))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn dispatch(
    State(db): State<Db>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(&db, &endpoint, &headers, &body).await {
        Ok(value) => Json(value).into_response(),
        Err(failure) => {
            tracing::debug!(
                endpoint = %endpoint,
                code = failure.code,
                description = %failure.description,
                "request rejected"
            );
            failure.into_response()
        }
    }
}

async fn handle(db: &Db, endpoint: &str, headers: &HeaderMap, body: &[u8]) -> Result<Value, ApiFailure> {
    let params: Map<String, Value> = if body.is_empty() {
        Map::new()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ApiFailure::undecodable(format!("Could not decode request body: {e}")))?
    };

    match endpoint {
        "db_validate" => db_validate(&params),
        "get_me" => {
            let store = db.read().await;
            let me = authenticate(&store, headers)?.map_or_else(User::anonymous, User::public);
            Ok(json!({ "data": me }))
        }
        "check_auth" => check_auth(&*db.read().await, &params),
        "user_is_registered" => {
            let name = required_str(&params, "target_user")?;
            Ok(json!({ "data": db.read().await.user_by_name(name).is_some() }))
        }
        "user_register" => user_register(&mut *db.write().await, &params),
        "user_update" => user_update(&mut *db.write().await, headers, &params),
        "thread_index" => thread_index(&*db.read().await),
        "thread_load" => thread_load(&*db.read().await, &params),
        "thread_create" => thread_create(&mut *db.write().await, headers, &params),
        other => Err(ApiFailure::new(
            StatusCode::NOT_FOUND,
            3,
            format!("Invalid endpoint: {other}"),
        )),
    }
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn required<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a Value, ApiFailure> {
    params
        .get(name)
        .ok_or_else(|| ApiFailure::invalid(format!("Missing parameter: {name}")))
}

fn required_str<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a str, ApiFailure> {
    required(params, name)?
        .as_str()
        .ok_or_else(|| ApiFailure::invalid(format!("Parameter {name} must be a string")))
}

/// The reason `value` is unacceptable for `key`, or `None` when it is fine.
pub fn rule_violation(key: &str, value: &Value) -> Result<Option<String>, ApiFailure> {
    let text = value.as_str();
    let reason = match key {
        "user_name" => match text {
            None => Some("Username must be a string."),
            Some(s) if s.is_empty() => Some("Username may not be empty."),
            Some(s) if s.chars().count() > 24 => Some("Username may not be longer than 24 characters."),
            Some(s) if s.chars().any(|c| c.is_whitespace() || c.is_control()) => {
                Some("Username cannot contain whitespace or control characters.")
            }
            Some(_) => None,
        },
        "auth_hash" => match text {
            Some(s) if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) => None,
            _ => Some("Invalid auth hash: it must be a 64 character SHA-256 hex digest."),
        },
        "title" => match text {
            None => Some("Title must be a string."),
            Some(s) if s.trim().is_empty() => Some("Title may not be empty."),
            Some(s) if s.chars().count() > 120 => Some("Title may not be longer than 120 characters."),
            Some(s) if s.contains('\n') => Some("Title may not contain newlines."),
            Some(_) => None,
        },
        "body" => match text {
            Some(s) if !s.trim().is_empty() => None,
            _ => Some("Post body may not be empty."),
        },
        "quip" => match text {
            None => Some("Quip must be a string."),
            Some(s) if s.chars().count() > 120 => Some("Quip may not be longer than 120 characters."),
            Some(s) if s.contains('\n') => Some("Quip may not contain newlines."),
            Some(_) => None,
        },
        "bio" => match text {
            None => Some("Bio must be a string."),
            Some(s) if s.chars().count() > 4096 => Some("Bio may not be longer than 4096 characters."),
            Some(_) => None,
        },
        "color" => match value.as_u64() {
            Some(0..=6) => None,
            _ => Some("Color must be an integer from 0 to 6."),
        },
        other => return Err(ApiFailure::invalid(format!("Cannot validate unknown key: {other}"))),
    };
    Ok(reason.map(str::to_string))
}

fn enforce(key: &str, value: &Value) -> Result<(), ApiFailure> {
    match rule_violation(key, value)? {
        Some(reason) => Err(ApiFailure::policy(reason)),
        None => Ok(()),
    }
}

/// Resolve the `User`/`Auth` headers. No `User` header means anonymous.
fn authenticate<'a>(store: &'a Store, headers: &HeaderMap) -> Result<Option<&'a User>, ApiFailure> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let Some(name) = header("User") else {
        return Ok(None);
    };
    let user = store
        .user_by_name(name)
        .ok_or_else(|| ApiFailure::denied(format!("User {name} is not registered.")))?;
    match header("Auth") {
        Some(hash) if user.auth_hash.as_deref() == Some(hash) => Ok(Some(user)),
        _ => Err(ApiFailure::denied("Invalid authorization key for user.")),
    }
}

fn require_user<'a>(store: &'a Store, headers: &HeaderMap) -> Result<&'a User, ApiFailure> {
    authenticate(store, headers)?.ok_or_else(|| ApiFailure::denied("You must be logged in to do that."))
}

fn db_validate(params: &Map<String, Value>) -> Result<Value, ApiFailure> {
    let key = required_str(params, "key")?;
    let value = required(params, "value")?;
    let reason = rule_violation(key, value)?;
    Ok(json!({ "data": { "bool": reason.is_none(), "description": reason } }))
}

fn check_auth(store: &Store, params: &Map<String, Value>) -> Result<Value, ApiFailure> {
    let name = required_str(params, "target_user")?;
    let hash = required_str(params, "target_hash")?;
    let user = store
        .user_by_name(name)
        .ok_or_else(|| ApiFailure::invalid(format!("User {name} is not registered.")))?;
    if user.auth_hash.as_deref() != Some(hash) {
        return Err(ApiFailure::denied("Invalid authorization hash."));
    }
    Ok(json!({ "data": true }))
}

fn user_register(store: &mut Store, params: &Map<String, Value>) -> Result<Value, ApiFailure> {
    enforce("user_name", required(params, "user_name")?)?;
    enforce("auth_hash", required(params, "auth_hash")?)?;
    let name = required_str(params, "user_name")?;
    let hash = required_str(params, "auth_hash")?;
    if store.user_by_name(name).is_some() {
        return Err(ApiFailure::policy(format!("Username {name} is already taken.")));
    }

    let user = User {
        user_id: Uuid::new_v4().simple().to_string(),
        user_name: name.to_string(),
        auth_hash: Some(hash.to_string()),
        quip: String::new(),
        bio: String::new(),
        color: 0,
        is_admin: false,
        created: now(),
    };
    store.users.insert(user.user_id.clone(), user.clone());
    tracing::info!(user_name = %user.user_name, "user registered");
    Ok(json!({ "data": user }))
}

fn user_update(store: &mut Store, headers: &HeaderMap, params: &Map<String, Value>) -> Result<Value, ApiFailure> {
    let user_id = require_user(store, headers)?.user_id.clone();
    for (key, value) in params {
        if !matches!(key.as_str(), "quip" | "bio" | "color") {
            return Err(ApiFailure::invalid(format!("Invalid parameter for user_update: {key}")));
        }
        enforce(key, value)?;
    }

    let Some(user) = store.users.get_mut(&user_id) else {
        return Err(ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, 0, "Authenticated user vanished."));
    };
    if let Some(quip) = params.get("quip").and_then(Value::as_str) {
        user.quip = quip.to_string();
    }
    if let Some(bio) = params.get("bio").and_then(Value::as_str) {
        user.bio = bio.to_string();
    }
    if let Some(color) = params.get("color").and_then(Value::as_u64) {
        user.color = color as u8;
    }
    Ok(json!({ "data": user.public() }))
}

fn thread_index(store: &Store) -> Result<Value, ApiFailure> {
    // Newest-created first so equal timestamps still order deterministically.
    let mut threads: Vec<Thread> = store
        .threads
        .iter()
        .rev()
        .map(|t| Thread {
            messages: Vec::new(),
            ..t.clone()
        })
        .collect();
    threads.sort_by(|a, b| b.pinned.cmp(&a.pinned).then(b.last_mod.total_cmp(&a.last_mod)));
    let usermap = store.usermap(threads.iter().map(|t| t.author.as_str()));
    Ok(json!({ "data": threads, "usermap": usermap }))
}

fn find_thread<'a>(store: &'a Store, params: &Map<String, Value>) -> Result<&'a Thread, ApiFailure> {
    let thread_id = required_str(params, "thread_id")?;
    store
        .threads
        .iter()
        .find(|t| t.thread_id == thread_id)
        .ok_or_else(|| ApiFailure::invalid(format!("Thread {thread_id} does not exist.")))
}

fn thread_load(store: &Store, params: &Map<String, Value>) -> Result<Value, ApiFailure> {
    let thread = find_thread(store, params)?;
    let authors = std::iter::once(thread.author.as_str()).chain(thread.messages.iter().map(|m| m.author.as_str()));
    let usermap = store.usermap(authors);
    Ok(json!({ "data": thread, "usermap": usermap }))
}

fn thread_create(store: &mut Store, headers: &HeaderMap, params: &Map<String, Value>) -> Result<Value, ApiFailure> {
    let author = require_user(store, headers)?.user_id.clone();
    enforce("title", required(params, "title")?)?;
    enforce("body", required(params, "body")?)?;

    let created = now();
    let thread_id = Uuid::new_v4().simple().to_string();
    let thread = Thread {
        thread_id: thread_id.clone(),
        title: required_str(params, "title")?.to_string(),
        author: author.clone(),
        created,
        last_mod: created,
        reply_count: 0,
        pinned: false,
        messages: vec![Message {
            post_id: 0,
            thread_id,
            author: author.clone(),
            body: required_str(params, "body")?.to_string(),
            created,
            edited: false,
        }],
    };
    store.threads.push(thread.clone());
    let usermap = store.usermap([author.as_str()]);
    Ok(json!({ "data": thread, "usermap": usermap }))
}

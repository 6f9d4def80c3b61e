//! In-process stand-in for the managed backend.
//!
//! Serves the subset of the REST, RPC and auth endpoints the service calls,
//! over an in-memory table map, on an ephemeral local port.
//!
//! Table calls need a token issued by `/auth/v1/token`. Rows carrying a
//! `user_id` are only visible to that user; inserts are stamped with the
//! caller's id.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use money_flow::{app, backend::Store, change_feed, config::Config, state::AppState};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ANON_KEY: &str = "anon-key";
pub const FEED_SECRET: &str = "feed-secret";
pub const EMAIL: &str = "an@example.com";
pub const PASSWORD: &str = "secret123";

#[derive(Default)]
pub struct FakeDb {
    pub tables: HashMap<String, Vec<Value>>,
    /// email → (password, user)
    pub users: HashMap<String, (String, Value)>,
    /// access token → user
    pub tokens: HashMap<String, Value>,
    /// `METHOD path` of every call received
    pub calls: Vec<String>,
    /// `METHOD path?query` of every table call
    pub queries: Vec<String>,
    /// bodies of every PATCH
    pub patches: Vec<Value>,
}

#[derive(Clone)]
pub struct FakeBackend {
    pub url: String,
    pub db: Arc<Mutex<FakeDb>>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let db = Arc::new(Mutex::new(FakeDb::default()));
        let app = Router::new()
            .route("/auth/v1/health", get(|| async { Json(json!({ "name": "GoTrue" })) }))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route("/auth/v1/user", get(user))
            .route("/rest/v1/rpc/{function}", post(rpc))
            .route(
                "/rest/v1/{table}",
                get(select).post(insert).patch(update).delete(remove),
            )
            .with_state(db.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend");
        });

        Self {
            url: format!("http://{}", addr),
            db,
        }
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.db
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn add_user(&self, email: &str, password: &str) {
        let user = json!({
            "id": format!("user-{}", email),
            "email": email,
            "user_metadata": { "name": "An" }
        });
        self.db
            .lock()
            .unwrap()
            .users
            .insert(email.to_string(), (password.to_string(), user));
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.db
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.db.lock().unwrap().calls.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.db.lock().unwrap().queries.clone()
    }

    pub fn patches(&self) -> Vec<Value> {
        self.db.lock().unwrap().patches.clone()
    }

    /// Invalidate every issued token, as an expiry or a sign-out elsewhere would.
    pub fn revoke_tokens(&self) {
        self.db.lock().unwrap().tokens.clear();
    }

    pub fn config(&self) -> Config {
        let mut config = Config::for_backend(self.url.clone(), ANON_KEY);
        config.change_feed_secret = FEED_SECRET.to_string();
        config
    }
}

type Db = State<Arc<Mutex<FakeDb>>>;

fn record(db: &Arc<Mutex<FakeDb>>, call: String) {
    db.lock().unwrap().calls.push(call);
}

fn record_query(db: &mut FakeDb, method: &str, table: &str, query: Option<String>) {
    db.queries.push(format!(
        "{} /rest/v1/{}?{}",
        method,
        table,
        query.unwrap_or_default()
    ));
}

fn jwt_expired() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "code": "PGRST301", "message": "JWT expired" })),
    )
        .into_response()
}

/// Id of the user behind the request's token.
fn caller(db: &FakeDb, headers: &HeaderMap) -> Option<String> {
    let token = bearer(headers)?;
    db.tokens.get(&token)?["id"].as_str().map(str::to_string)
}

fn visible(row: &Value, user_id: &str) -> bool {
    match row.get("user_id").and_then(Value::as_str) {
        Some(owner) => owner == user_id,
        None => true,
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn signup(State(db): Db, Json(body): Json<Value>) -> Response {
    record(&db, "POST /auth/v1/signup".into());
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut db = db.lock().unwrap();
    if db.users.contains_key(&email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 422, "msg": "User already registered" })),
        )
            .into_response();
    }
    let user = json!({
        "id": format!("user-{}", email),
        "email": email,
        "user_metadata": body["data"].clone()
    });
    let password = body["password"].as_str().unwrap_or_default().to_string();
    db.users.insert(email, (password, user.clone()));
    Json(user).into_response()
}

async fn token(State(db): Db, Json(body): Json<Value>) -> Response {
    record(&db, "POST /auth/v1/token".into());
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let mut db = db.lock().unwrap();
    let user = match db.users.get(email) {
        Some((stored, user)) if stored == password => user.clone(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                })),
            )
                .into_response();
        }
    };
    let access_token = format!("token-{}-{}", email, db.tokens.len());
    db.tokens.insert(access_token.clone(), user.clone());
    Json(json!({
        "access_token": access_token,
        "refresh_token": "refresh",
        "expires_in": 3600,
        "user": user
    }))
    .into_response()
}

async fn logout(State(db): Db, headers: HeaderMap) -> StatusCode {
    record(&db, "POST /auth/v1/logout".into());
    if let Some(token) = bearer(&headers) {
        db.lock().unwrap().tokens.remove(&token);
    }
    StatusCode::NO_CONTENT
}

async fn user(State(db): Db, headers: HeaderMap) -> Response {
    record(&db, "GET /auth/v1/user".into());
    let db = db.lock().unwrap();
    match bearer(&headers).and_then(|t| db.tokens.get(&t).cloned()) {
        Some(user) => Json(user).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": 401, "msg": "invalid JWT" })),
        )
            .into_response(),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep the rows matching every `column=eq.value` pair.
fn matches(row: &Value, params: &[(String, String)]) -> bool {
    params.iter().all(|(column, filter)| match filter.strip_prefix("eq.") {
        Some(expected) if !["select", "order", "limit"].contains(&column.as_str()) => {
            row.get(column).map(as_text).as_deref() == Some(expected)
        }
        _ => true,
    })
}

async fn select(
    State(db): Db,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> Response {
    record(&db, format!("GET /rest/v1/{}", table));
    let mut db = db.lock().unwrap();
    record_query(&mut db, "GET", &table, raw);
    let Some(user_id) = caller(&db, &headers) else {
        return jwt_expired();
    };
    let limit = params
        .iter()
        .find(|(k, _)| k == "limit")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    let rows: Vec<Value> = db
        .tables
        .get(&table)
        .map(|rows| {
            rows.iter()
                .filter(|row| visible(row, &user_id) && matches(row, &params))
                .take(limit)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(rows).into_response()
}

async fn insert(
    State(db): Db,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(mut rows): Json<Vec<Value>>,
) -> Response {
    record(&db, format!("POST /rest/v1/{}", table));
    let mut db = db.lock().unwrap();
    let Some(user_id) = caller(&db, &headers) else {
        return jwt_expired();
    };
    for row in rows.iter_mut() {
        if row.get("user_id").is_none() {
            row["user_id"] = json!(user_id);
        }
    }
    db.tables.entry(table).or_default().extend(rows.clone());
    (StatusCode::CREATED, Json(rows)).into_response()
}

async fn update(
    State(db): Db,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    record(&db, format!("PATCH /rest/v1/{}", table));
    let mut db = db.lock().unwrap();
    record_query(&mut db, "PATCH", &table, raw);
    db.patches.push(patch.clone());
    let Some(user_id) = caller(&db, &headers) else {
        return jwt_expired();
    };
    let mut updated = Vec::new();
    for row in db.tables.entry(table).or_default().iter_mut() {
        if visible(row, &user_id) && matches(row, &params) {
            if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in patch {
                    row.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
    }
    Json(updated).into_response()
}

async fn remove(
    State(db): Db,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    record(&db, format!("DELETE /rest/v1/{}", table));
    let mut db = db.lock().unwrap();
    let Some(user_id) = caller(&db, &headers) else {
        return jwt_expired();
    };
    db.tables
        .entry(table)
        .or_default()
        .retain(|row| !(visible(row, &user_id) && matches(row, &params)));
    StatusCode::NO_CONTENT.into_response()
}

/// `process_debt_repayment`: move `p_amount` from `sum_debt` to `sum_repaid`.
async fn rpc(
    State(db): Db,
    Path(function): Path<String>,
    headers: HeaderMap,
    Json(args): Json<Value>,
) -> Response {
    record(&db, format!("POST /rest/v1/rpc/{}", function));
    if caller(&db.lock().unwrap(), &headers).is_none() {
        return jwt_expired();
    }
    if function != "process_debt_repayment" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "function not found" })),
        )
            .into_response();
    }
    let ledger_id = args["p_ledger_id"].as_str().unwrap_or_default().to_string();
    let amount = args["p_amount"].as_f64().unwrap_or_default();
    let mut db = db.lock().unwrap();
    for row in db.tables.entry("debt_ledger".into()).or_default().iter_mut() {
        if row["ledger_id"] == ledger_id.as_str() {
            let repaid = row["sum_repaid"].as_f64().unwrap_or_default() + amount;
            row["sum_repaid"] = json!(repaid);
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

/// The service under test wired to a fresh fake backend.
pub struct TestApp {
    pub backend: FakeBackend,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start with adjusted configuration.
    pub async fn start_with(adjust: impl FnOnce(&mut Config)) -> Self {
        let backend = FakeBackend::start().await;
        backend.add_user(EMAIL, PASSWORD);
        let mut config = backend.config();
        adjust(&mut config);
        let state = AppState::new(config).expect("state");
        let router = app::router(state.clone());
        Self {
            backend,
            state,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::get(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, body: Value, cookie: Option<&str>) -> Response {
        let mut builder = Request::post(path).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Post a signed change event.
    pub async fn push_change(&self, payload: Value) -> Response {
        let body = payload.to_string();
        let signature = change_feed::sign(FEED_SECRET, body.as_bytes());
        self.send(
            Request::post("/hooks/changes")
                .header(header::CONTENT_TYPE, "application/json")
                .header(change_feed::SIGNATURE_HEADER, signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Sign in and return the `Cookie` header value for later requests.
    pub async fn login(&self) -> String {
        self.login_as(EMAIL, PASSWORD).await
    }

    pub async fn login_as(&self, email: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/login",
                json!({ "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Table access with the token behind a session cookie.
    pub fn store(&self, cookie: &str) -> Store {
        let token = cookie.strip_prefix("mf_session=").expect("session cookie");
        self.state.client.store(token)
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

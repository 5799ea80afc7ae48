//! Mock identity provider, management API and browser shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{self, Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeDelta, Utc};
use librhoas::alias::{AliasTable, UrlAliases};
use librhoas::auth::Browser;
use librhoas::config::{Config, ConfigStore};
use librhoas::ctx::Ctx;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use url::Url;

pub const SSO_REALM: &str = "redhat-external";
pub const MAS_REALM: &str = "rhoas";
pub const USERNAME: &str = "test-user";

/// An unsigned JWT carrying `claims`.
pub fn jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn jwt_expiring_in(delta: TimeDelta) -> String {
    jwt(json!({
        "exp": (Utc::now() + delta).timestamp(),
        "preferred_username": USERNAME,
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub realm: String,
    pub grant_type: String,
}

#[derive(Default)]
struct MockState {
    base_url: String,
    grants: Mutex<Vec<Grant>>,
    issued: AtomicU32,
    fail_refresh: AtomicBool,
    failing_realms: Mutex<Vec<String>>,
    rotate_refresh: AtomicBool,
    instances: Mutex<Vec<(String, Value)>>,
}

impl MockState {
    fn realm_url(&self, realm: &str) -> String {
        format!("{}/auth/realms/{realm}", self.base_url)
    }
}

/// Serves OpenID discovery and token endpoints for any realm under
/// `/auth/realms/{realm}`, and the Kafka and Service Registry management APIs.
pub struct MockServer {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(MockState {
            base_url: format!("http://{addr}"),
            ..MockState::default()
        });

        let app = Router::new()
            .route(
                "/auth/realms/{realm}/.well-known/openid-configuration",
                get(discovery),
            )
            .route(
                "/auth/realms/{realm}/protocol/openid-connect/token",
                post(token),
            )
            .route("/api/{service}/v1/{collection}", get(list_instances))
            .route("/api/{service}/v1/{collection}/{id}", get(get_instance))
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        self.state.base_url.clone()
    }

    pub fn realm_url(&self, realm: &str) -> String {
        self.state.realm_url(realm)
    }

    /// Alias tables whose `staging` and `production` entries point here.
    pub fn aliases(&self) -> UrlAliases {
        let base = self.base_url();
        let sso = self.realm_url(SSO_REALM);
        let mas = self.realm_url(MAS_REALM);
        UrlAliases {
            api_gateway: AliasTable::environments(&base, &base),
            auth: AliasTable::environments(&sso, &sso),
            mas_auth: AliasTable::environments(&mas, &mas),
        }
    }

    pub fn grants(&self) -> Vec<Grant> {
        self.state.grants.lock().unwrap().clone()
    }

    pub fn count_grants(&self, grant_type: &str) -> usize {
        self.grants()
            .iter()
            .filter(|g| g.grant_type == grant_type)
            .count()
    }

    pub fn fail_refresh(&self) {
        self.state.fail_refresh.store(true, Ordering::SeqCst);
    }

    /// Reject refresh grants for one realm only.
    pub fn fail_refresh_in(&self, realm: &str) {
        self.state
            .failing_realms
            .lock()
            .unwrap()
            .push(realm.to_string());
    }

    /// Issue a new refresh token on every refresh grant.
    pub fn rotate_refresh_tokens(&self) {
        self.state.rotate_refresh.store(true, Ordering::SeqCst);
    }

    /// Register an instance under `collection` ("kafkas" or "registries").
    pub fn add_instance(&self, collection: &str, id: &str, name: &str) {
        self.state.instances.lock().unwrap().push((
            collection.to_string(),
            json!({"id": id, "name": name, "status": "ready", "owner": USERNAME}),
        ));
    }
}

async fn discovery(
    State(state): State<Arc<MockState>>,
    extract::Path(realm): extract::Path<String>,
) -> Json<Value> {
    let realm_url = state.realm_url(&realm);
    Json(json!({
        "issuer": realm_url,
        "authorization_endpoint": format!("{realm_url}/protocol/openid-connect/auth"),
        "token_endpoint": format!("{realm_url}/protocol/openid-connect/token"),
    }))
}

async fn token(
    State(state): State<Arc<MockState>>,
    extract::Path(realm): extract::Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let grant_type = form.get("grant_type").cloned().unwrap_or_default();
    state.grants.lock().unwrap().push(Grant {
        realm: realm.clone(),
        grant_type: grant_type.clone(),
    });

    let failing = state.fail_refresh.load(Ordering::SeqCst)
        || state.failing_realms.lock().unwrap().contains(&realm);
    if grant_type == "refresh_token" && failing {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Token is not active"})),
        );
    }

    let serial = state.issued.fetch_add(1, Ordering::SeqCst);
    let rotate = state.rotate_refresh.load(Ordering::SeqCst);
    // Unless rotating, refresh tokens are echoed back as Keycloak does for
    // offline tokens
    let refresh_token = match grant_type.as_str() {
        "refresh_token" if !rotate => form.get("refresh_token").cloned().unwrap_or_default(),
        _ => jwt(json!({
            "exp": (Utc::now() + TimeDelta::days(1)).timestamp(),
            "jti": serial,
        })),
    };

    (
        StatusCode::OK,
        Json(json!({
            "access_token": jwt(json!({
                "exp": (Utc::now() + TimeDelta::hours(1)).timestamp(),
                "preferred_username": USERNAME,
                "azp": realm,
                "jti": serial,
            })),
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": refresh_token,
        })),
    )
}

fn unauthorized(headers: &HeaderMap) -> Option<(StatusCode, Json<Value>)> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len());
    (!authorized).then(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"kind": "Error", "reason": "missing bearer token"})),
        )
    })
}

async fn get_instance(
    State(state): State<Arc<MockState>>,
    extract::Path((_service, collection, id)): extract::Path<(String, String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }

    let found = state
        .instances
        .lock()
        .unwrap()
        .iter()
        .find(|(c, i)| *c == collection && i["id"] == id.as_str())
        .map(|(_, i)| i.clone());
    match found {
        Some(instance) => (StatusCode::OK, Json(instance)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"kind": "Error", "reason": format!("{id} not found")})),
        ),
    }
}

async fn list_instances(
    State(state): State<Arc<MockState>>,
    extract::Path((_service, collection)): extract::Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if let Some(rejection) = unauthorized(&headers) {
        return rejection;
    }

    let name = query
        .get("search")
        .and_then(|s| s.strip_prefix("name = "))
        .map(str::to_string);
    let items: Vec<Value> = state
        .instances
        .lock()
        .unwrap()
        .iter()
        .filter(|(c, i)| {
            *c == collection && name.as_ref().is_none_or(|n| i["name"] == n.as_str())
        })
        .map(|(_, i)| i.clone())
        .collect();

    (
        StatusCode::OK,
        Json(json!({"kind": "List", "total": items.len(), "items": items})),
    )
}

/// What the fake browser does with the authorization URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserMode {
    /// Redirect back with a code and the expected state.
    Approve,
    /// Redirect back with a code and a different state.
    ForgeState,
    /// Redirect back with `error=access_denied`.
    Deny,
    /// Never come back.
    Ignore,
}

/// Plays the user: follows the authorization URL straight back to the
/// loopback listener.
#[derive(Clone)]
pub struct FakeBrowser {
    mode: BrowserMode,
    redirect_uris: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    pub fn new(mode: BrowserMode) -> Self {
        Self {
            mode,
            redirect_uris: Arc::default(),
        }
    }

    /// Redirect URIs seen so far, one per domain.
    pub fn redirect_uris(&self) -> Vec<String> {
        self.redirect_uris.lock().unwrap().clone()
    }
}

impl Browser for FakeBrowser {
    fn open(&self, url: &Url) -> librhoas::Result<()> {
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let redirect_uri = params.get("redirect_uri").cloned().unwrap_or_default();
        let state = params.get("state").cloned().unwrap_or_default();
        self.redirect_uris.lock().unwrap().push(redirect_uri.clone());

        let mut target = Url::parse(&redirect_uri).map_err(|e| e.to_string())?;
        target
            .set_host(Some("127.0.0.1"))
            .map_err(|e| e.to_string())?;
        match self.mode {
            BrowserMode::Ignore => return Ok(()),
            BrowserMode::Approve => {
                target
                    .query_pairs_mut()
                    .append_pair("code", "test-code")
                    .append_pair("state", &state);
            }
            BrowserMode::ForgeState => {
                target
                    .query_pairs_mut()
                    .append_pair("code", "test-code")
                    .append_pair("state", "forged");
            }
            BrowserMode::Deny => {
                target
                    .query_pairs_mut()
                    .append_pair("error", "access_denied")
                    .append_pair("error_description", "User declined consent")
                    .append_pair("state", &state);
            }
        }

        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
        Ok(())
    }
}

/// A context whose config file lives in a fresh temporary directory.
pub fn test_ctx() -> (Ctx, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let ctx = Ctx::new(dir.path().join("rhoas").join("config.json"), None, false, false, 80);
    (ctx, dir)
}

pub fn store_config(path: &Path, config: &Config) {
    ConfigStore::new(path.to_path_buf())
        .save(config)
        .expect("save config");
}

pub fn load_config(path: &Path) -> Config {
    ConfigStore::new(path.to_path_buf()).load().expect("load config")
}

/// A config logged in to both domains against `server`.
pub fn logged_in_config(server: &MockServer, access_expiry: TimeDelta) -> Config {
    Config {
        api_url: server.base_url(),
        auth_url: server.realm_url(SSO_REALM),
        mas_auth_url: server.realm_url(MAS_REALM),
        client_id: "rhoas-cli-prod".to_string(),
        scopes: vec!["openid".to_string()],
        access_token: jwt_expiring_in(access_expiry),
        refresh_token: jwt_expiring_in(TimeDelta::days(1)),
        mas_access_token: jwt_expiring_in(access_expiry),
        mas_refresh_token: jwt_expiring_in(TimeDelta::days(1)),
        ..Config::default()
    }
}

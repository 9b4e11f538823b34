// Fake identity-toolkit REST API for integration tests.
#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;

use session_sync::interface_adapters::RestIdentityProvider;

pub const API_KEY: &str = "test-key";

#[derive(Clone, Debug)]
pub struct FakeUser {
    pub local_id: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

#[derive(Default)]
pub struct FakeDirectory {
    pub users: HashMap<String, FakeUser>,
    pub reset_emails: Vec<String>,
    pub requests: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeIdentityApi {
    pub directory: Arc<Mutex<FakeDirectory>>,
}

impl FakeIdentityApi {
    pub async fn add_user(&self, email: &str, password: &str, display_name: Option<&str>) {
        let mut directory = self.directory.lock().await;
        let local_id = format!("uid-{}", directory.users.len() + 1);
        directory.users.insert(
            email.to_string(),
            FakeUser {
                local_id,
                email: email.to_string(),
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
                email_verified: true,
            },
        );
    }

    pub async fn requests(&self) -> Vec<String> {
        self.directory.lock().await.requests.clone()
    }

    pub async fn reset_emails(&self) -> Vec<String> {
        self.directory.lock().await.reset_emails.clone()
    }

    pub async fn user(&self, email: &str) -> Option<FakeUser> {
        self.directory.lock().await.users.get(email).cloned()
    }
}

pub struct RunningApi {
    pub api: FakeIdentityApi,
    pub base_url: String,
}

impl RunningApi {
    pub fn provider(&self) -> RestIdentityProvider {
        RestIdentityProvider::new(&self.base_url, API_KEY, Duration::from_secs(2))
            .expect("expected rest provider to build")
    }
}

// Boots the fake API on an ephemeral port inside the current test runtime.
pub async fn spawn_identity_api() -> RunningApi {
    let api = FakeIdentityApi::default();
    let app = Router::new()
        .route("/v1/{operation}", post(accounts))
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake identity api failed");
    });

    RunningApi {
        api,
        base_url: format!("http://{addr}"),
    }
}

// Returns a base URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    drop(listener);
    format!("http://{addr}")
}

#[derive(Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

fn api_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": { "code": 400, "message": message } })),
    )
        .into_response()
}

fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn token_for(user: &FakeUser) -> String {
    format!("token-{}", user.local_id)
}

fn account_body(user: &FakeUser) -> Value {
    json!({
        "localId": user.local_id,
        "email": user.email,
        "displayName": user.display_name,
        "idToken": token_for(user),
    })
}

async fn accounts(
    State(api): State<FakeIdentityApi>,
    Path(operation): Path<String>,
    Query(query): Query<KeyQuery>,
    Json(body): Json<Value>,
) -> Response {
    if query.key.as_deref() != Some(API_KEY) {
        return api_error("API_KEY_INVALID");
    }

    let mut directory = api.directory.lock().await;
    directory.requests.push(operation.clone());

    match operation.as_str() {
        "accounts:signInWithPassword" => {
            let Some(user) = directory.users.get(field(&body, "email")) else {
                return api_error("EMAIL_NOT_FOUND");
            };
            if user.password != field(&body, "password") {
                return api_error("INVALID_PASSWORD");
            }
            Json(account_body(user)).into_response()
        }
        "accounts:lookup" => {
            let token = field(&body, "idToken");
            match directory.users.values().find(|user| token_for(user) == token) {
                Some(user) => Json(json!({
                    "users": [{
                        "localId": user.local_id,
                        "email": user.email,
                        "displayName": user.display_name,
                        "emailVerified": user.email_verified,
                    }]
                }))
                .into_response(),
                None => api_error("INVALID_ID_TOKEN"),
            }
        }
        "accounts:signUp" => {
            let email = field(&body, "email").to_string();
            let password = field(&body, "password").to_string();
            if directory.users.contains_key(&email) {
                return api_error("EMAIL_EXISTS");
            }
            if password.chars().count() < 6 {
                return api_error("WEAK_PASSWORD : Password should be at least 6 characters");
            }
            let user = FakeUser {
                local_id: format!("uid-{}", directory.users.len() + 1),
                email: email.clone(),
                password,
                display_name: None,
                email_verified: false,
            };
            let response = account_body(&user);
            directory.users.insert(email, user);
            Json(response).into_response()
        }
        "accounts:update" => {
            let token = field(&body, "idToken").to_string();
            let display_name = field(&body, "displayName").to_string();
            match directory
                .users
                .values_mut()
                .find(|user| token_for(user) == token)
            {
                Some(user) => {
                    user.display_name = Some(display_name);
                    Json(account_body(user)).into_response()
                }
                None => api_error("INVALID_ID_TOKEN"),
            }
        }
        "accounts:sendOobCode" => {
            let email = field(&body, "email").to_string();
            if field(&body, "requestType") != "PASSWORD_RESET" {
                return api_error("INVALID_REQ_TYPE");
            }
            if !directory.users.contains_key(&email) {
                return api_error("EMAIL_NOT_FOUND");
            }
            directory.reset_emails.push(email.clone());
            Json(json!({ "email": email })).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": 404, "message": "NOT_FOUND" } })),
        )
            .into_response(),
    }
}

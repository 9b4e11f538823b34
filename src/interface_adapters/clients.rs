use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::domain::entities::{Identity, OAuthProviderKind};
use crate::domain::errors::{codes, ProviderError};
use crate::domain::ports::{IdentityListener, IdentityProvider, Unsubscribe};
use crate::interface_adapters::listeners::ListenerRegistry;

// The clients defined here talk to a hosted identity service over REST.
// Wire payloads stay in this module; only Identity and ProviderError leave it.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileResponse {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeRequest<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RestClientError {
    #[error("invalid identity api url: {0}")]
    InvalidBaseUrl(url::ParseError),
    #[error("failed to build http client: {0}")]
    Build(reqwest::Error),
}

struct SignedIn {
    id_token: String,
    identity: Identity,
}

/// Identity provider backed by an Identity-Toolkit style REST API.
///
/// Session-changed events are emitted locally after the REST calls that change
/// who is signed in, the same way a hosted SDK reports them.
pub struct RestIdentityProvider {
    http: Client,
    base_url: Url,
    api_key: String,
    session: Mutex<Option<SignedIn>>,
    listeners: ListenerRegistry,
}

impl RestIdentityProvider {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RestClientError> {
        let mut base_url = Url::parse(base_url).map_err(RestClientError::InvalidBaseUrl)?;
        // Relative joins below need the base path to end in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RestClientError::Build)?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            session: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    fn endpoint(&self, operation: &str) -> Result<Url, ProviderError> {
        let mut url = self
            .base_url
            .join(&format!("v1/accounts:{operation}"))
            .map_err(|err| ProviderError::new(codes::INTERNAL_ERROR, err.to_string()))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call<B, R>(&self, operation: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(operation)?;
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                warn!(operation, error = %err, "identity api transport error");
                ProviderError::new(codes::NETWORK_REQUEST_FAILED, err.to_string())
            })?;
        let status = res.status();

        // Keep the upstream reason so it can be mapped to a provider code.
        if !status.is_success() {
            let message = res
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .map(|payload| payload.error.message);
            debug!(operation, %status, ?message, "identity api rejected request");
            return Err(upstream_error(status, message));
        }

        res.json::<R>()
            .await
            .map_err(|err| ProviderError::new(codes::INTERNAL_ERROR, format!("decode: {err}")))
    }

    fn publish_signed_in(&self, id_token: String, identity: Identity) {
        self.listeners.publish(|| {
            *self.session.lock() = Some(SignedIn {
                id_token,
                identity: identity.clone(),
            });
            Some(identity)
        });
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, ProviderError> {
        let response: LookupResponse = self.call("lookup", &LookupRequest { id_token }).await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new(codes::USER_NOT_FOUND, "lookup returned no user"))?;

        Ok(Identity {
            id: user.local_id,
            email: user.email,
            display_name: user.display_name,
            email_verified: user.email_verified,
        })
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    fn subscribe(&self, listener: IdentityListener) -> Result<Unsubscribe, ProviderError> {
        Ok(self.listeners.register(listener, || {
            self.session
                .lock()
                .as_ref()
                .map(|signed_in| signed_in.identity.clone())
        }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let signed_in: PasswordResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let identity = self.lookup(&signed_in.id_token).await?;

        self.publish_signed_in(signed_in.id_token, identity.clone());
        Ok(identity)
    }

    async fn sign_in_with_oauth(&self, kind: OAuthProviderKind) -> Result<Identity, ProviderError> {
        // Popup sign-in needs a browser; the REST surface cannot host one.
        Err(ProviderError::new(
            codes::OPERATION_NOT_SUPPORTED,
            format!("{} popup sign-in is unavailable", kind.provider_id()),
        ))
    }

    async fn register(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let created: PasswordResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let identity = Identity {
            id: created.local_id,
            email: created.email,
            display_name: created.display_name,
            email_verified: false,
        };

        self.publish_signed_in(created.id_token, identity.clone());
        Ok(identity)
    }

    async fn update_profile(&self, display_name: &str) -> Result<Identity, ProviderError> {
        let (id_token, current) = self
            .session
            .lock()
            .as_ref()
            .map(|signed_in| (signed_in.id_token.clone(), signed_in.identity.clone()))
            .ok_or_else(|| ProviderError::new("auth/no-current-user", "nobody signed in"))?;

        let response: UpdateProfileResponse = self
            .call(
                "update",
                &UpdateProfileRequest {
                    id_token: &id_token,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await?;
        let updated = Identity {
            display_name: Some(display_name.to_string()),
            ..current
        };

        self.publish_signed_in(response.id_token.unwrap_or(id_token), updated.clone());
        Ok(updated)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                &OobCodeRequest {
                    request_type: "PASSWORD_RESET",
                    email,
                },
            )
            .await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        // Tokens are bearer credentials; forgetting them is the whole sign-out.
        self.listeners.publish(|| {
            self.session.lock().take();
            None
        });
        Ok(())
    }
}

// Translates the REST error reason (e.g. "WEAK_PASSWORD : Password should be
// at least 6 characters") into a provider code.
fn upstream_error(status: StatusCode, message: Option<String>) -> ProviderError {
    let Some(message) = message else {
        return ProviderError::new(codes::INTERNAL_ERROR, format!("http status {status}"));
    };
    let reason = message.split(':').next().unwrap_or_default().trim();
    let code = match reason {
        "EMAIL_NOT_FOUND" => codes::USER_NOT_FOUND.to_string(),
        "INVALID_PASSWORD" => codes::WRONG_PASSWORD.to_string(),
        "INVALID_LOGIN_CREDENTIALS" => codes::INVALID_LOGIN_CREDENTIALS.to_string(),
        "INVALID_EMAIL" | "MISSING_EMAIL" => codes::INVALID_EMAIL.to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" | "RESET_PASSWORD_EXCEED_LIMIT" => {
            codes::TOO_MANY_REQUESTS.to_string()
        }
        "EMAIL_EXISTS" => codes::EMAIL_ALREADY_IN_USE.to_string(),
        "WEAK_PASSWORD" => codes::WEAK_PASSWORD.to_string(),
        other => format!("auth/{}", other.to_ascii_lowercase().replace('_', "-")),
    };
    ProviderError::new(code, message)
}

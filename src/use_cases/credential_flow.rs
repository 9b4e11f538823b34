// Credential operations for one UI surface: login, registration, third-party
// sign-in, password reset and sign-out.
//
// None of these write the session store. The provider reports the resulting
// session change through its own listener channel, which the synchronizers
// apply; the store therefore has a single writer path.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::entities::{
    CredentialFlowRequest, FlowKind, Identity, OAuthProviderKind, Profile,
};
use crate::domain::errors::{DomainError, ProviderError};
use crate::domain::ports::{Clock, IdentityProvider};

// Registration minimum enforced by the hosted provider.
const MIN_PASSWORD_LEN: usize = 6;

/// UI-local state of a flow, as rendered by its form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowStatus {
    Idle,
    Submitting(FlowKind),
    Succeeded(FlowKind),
    Failed(DomainError),
}

impl FlowStatus {
    pub fn is_submitting(&self) -> bool {
        matches!(self, FlowStatus::Submitting(_))
    }

    // Banner text for the form, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            FlowStatus::Failed(err) => err.user_message(),
            FlowStatus::Succeeded(FlowKind::PasswordReset) => {
                Some("Password reset link sent! Please check your email.")
            }
            _ => None,
        }
    }
}

struct FlowState {
    pending: Option<CredentialFlowRequest>,
    status: FlowStatus,
    mounted: bool,
}

/// Credential flow controller owned by one mounted surface.
///
/// At most one request is in flight per instance; a submission made while
/// another is pending is rejected with `DomainError::RequestPending` and never
/// reaches the provider. Provider failures are translated to `DomainError`
/// here and nowhere else.
pub struct CredentialFlow<P: ?Sized, C> {
    provider: Arc<P>,
    clock: C,
    surface: String,
    state: Mutex<FlowState>,
}

impl<P, C> CredentialFlow<P, C>
where
    P: IdentityProvider + ?Sized,
    C: Clock,
{
    pub fn new(provider: Arc<P>, clock: C, surface: impl Into<String>) -> Self {
        Self {
            provider,
            clock,
            surface: surface.into(),
            state: Mutex::new(FlowState {
                pending: None,
                status: FlowStatus::Idle,
                mounted: true,
            }),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, DomainError> {
        let email = email.trim();
        let validation = validate_email(email).and_then(|()| {
            if password.is_empty() {
                Err(DomainError::WrongCredentials)
            } else {
                Ok(())
            }
        });

        let provider = &self.provider;
        self.submit(FlowKind::Login, validation, || provider.sign_in(email, password))
            .await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: &Profile,
    ) -> Result<Identity, DomainError> {
        let email = email.trim();
        let validation = validate_email(email).and_then(|()| {
            if password.chars().count() < MIN_PASSWORD_LEN {
                Err(DomainError::WeakPassword)
            } else {
                Ok(())
            }
        });
        let display_name = profile
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let provider = &self.provider;
        self.submit(FlowKind::Register, validation, || {
            Self::register_with_profile(provider, email, password, display_name)
        })
        .await
    }

    pub async fn sign_in_with_oauth(
        &self,
        kind: OAuthProviderKind,
    ) -> Result<Identity, DomainError> {
        let provider = &self.provider;
        self.submit(FlowKind::OAuthSignIn, Ok(()), || provider.sign_in_with_oauth(kind))
            .await
    }

    /// Asks the provider to email a reset link. Every call is forwarded.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), DomainError> {
        let email = email.trim();
        let provider = &self.provider;
        self.submit(FlowKind::PasswordReset, validate_email(email), || {
            provider.send_password_reset(email)
        })
        .await
    }

    pub async fn sign_out(&self) -> Result<(), DomainError> {
        let provider = &self.provider;
        self.submit(FlowKind::SignOut, Ok(()), || provider.sign_out())
            .await
    }

    pub fn status(&self) -> FlowStatus {
        self.state.lock().status.clone()
    }

    pub fn pending(&self) -> Option<CredentialFlowRequest> {
        self.state.lock().pending.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted
    }

    /// Marks the owning surface as gone. Later resolutions are discarded and
    /// new submissions fail with `DomainError::Unmounted`.
    pub fn unmount(&self) {
        let mut state = self.state.lock();
        state.mounted = false;
        debug!(surface = %self.surface, "credential flow unmounted");
    }

    async fn register_with_profile(
        provider: &P,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, ProviderError> {
        let created = provider.register(email, password).await?;
        let Some(name) = display_name else {
            return Ok(created);
        };
        match provider.update_profile(name).await {
            Ok(updated) => Ok(updated),
            Err(err) => {
                // The account exists; a missing display name is not worth failing over.
                warn!(code = %err.code, error = %err, "profile update after registration failed");
                Ok(created)
            }
        }
    }

    async fn submit<T, F, Fut>(
        &self,
        kind: FlowKind,
        validation: Result<(), DomainError>,
        call: F,
    ) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let request = self.admit(kind, validation)?;
        let slot = PendingSlot {
            state: &self.state,
            request_id: request.request_id.clone(),
        };
        let span = info_span!(
            "credential_flow",
            surface = %self.surface,
            %kind,
            request_id = %request.request_id
        );

        let result = call()
            .instrument(span)
            .await
            .map_err(|err| {
                debug!(surface = %self.surface, %kind, code = %err.code, "provider rejected request");
                DomainError::from(err)
            });

        let result = self.resolve(&request, result);
        drop(slot);
        result
    }

    fn admit(
        &self,
        kind: FlowKind,
        validation: Result<(), DomainError>,
    ) -> Result<CredentialFlowRequest, DomainError> {
        let mut state = self.state.lock();
        if !state.mounted {
            return Err(DomainError::Unmounted);
        }
        if let Some(pending) = &state.pending {
            debug!(
                surface = %self.surface,
                %kind,
                pending_kind = %pending.kind,
                pending_request_id = %pending.request_id,
                "submission rejected; request already in flight"
            );
            return Err(DomainError::RequestPending);
        }
        if let Err(err) = validation {
            debug!(surface = %self.surface, %kind, error = %err, "submission failed validation");
            state.status = FlowStatus::Failed(err.clone());
            return Err(err);
        }

        let request = CredentialFlowRequest {
            request_id: Uuid::new_v4().to_string(),
            kind,
            submitted_at: self.clock.now_epoch_millis(),
        };
        state.pending = Some(request.clone());
        state.status = FlowStatus::Submitting(kind);
        Ok(request)
    }

    fn resolve<T>(
        &self,
        request: &CredentialFlowRequest,
        result: Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut state = self.state.lock();
        if !state.mounted {
            debug!(
                surface = %self.surface,
                kind = %request.kind,
                request_id = %request.request_id,
                "resolution after unmount discarded"
            );
            return Err(DomainError::Unmounted);
        }

        state.status = match &result {
            Ok(_) => {
                info!(surface = %self.surface, kind = %request.kind, "credential request succeeded");
                FlowStatus::Succeeded(request.kind)
            }
            Err(DomainError::PopupCancelled) => {
                debug!(surface = %self.surface, "sign-in popup dismissed");
                FlowStatus::Idle
            }
            Err(err) => {
                warn!(
                    surface = %self.surface,
                    kind = %request.kind,
                    error = %err,
                    "credential request failed"
                );
                FlowStatus::Failed(err.clone())
            }
        };
        result
    }
}

// Frees the pending slot when the request resolves or its future is dropped.
struct PendingSlot<'a> {
    state: &'a Mutex<FlowState>,
    request_id: String,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        let owns_slot = state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.request_id == self.request_id);
        if !owns_slot {
            return;
        }
        state.pending = None;
        if state.mounted && state.status.is_submitting() {
            state.status = FlowStatus::Idle;
        }
    }
}

// Cheap shape check; the provider remains the authority on address validity.
fn validate_email(email: &str) -> Result<(), DomainError> {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DomainError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(DomainError::InvalidEmail);
    }
    Ok(())
}

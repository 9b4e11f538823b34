use thiserror::Error;

// Raw failure reported by the identity provider, keyed by its code string.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("identity provider error {code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// Provider codes understood by the mapping below.
pub mod codes {
    pub const INVALID_EMAIL: &str = "auth/invalid-email";
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const INVALID_LOGIN_CREDENTIALS: &str = "auth/invalid-login-credentials";
    pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
    pub const POPUP_CLOSED_BY_USER: &str = "auth/popup-closed-by-user";
    pub const CANCELLED_POPUP_REQUEST: &str = "auth/cancelled-popup-request";
    pub const USER_CANCELLED: &str = "auth/user-cancelled";
    pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";
    pub const EMAIL_ALREADY_IN_USE: &str = "auth/email-already-in-use";
    pub const WEAK_PASSWORD: &str = "auth/weak-password";
    pub const OPERATION_NOT_SUPPORTED: &str = "auth/operation-not-supported-in-this-environment";
    pub const INTERNAL_ERROR: &str = "auth/internal-error";
}

// Domain-level errors for credential flows. UI code only ever sees these.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("no account for this email")]
    UserNotFound,
    #[error("wrong credentials")]
    WrongCredentials,
    #[error("too many attempts")]
    TooManyAttempts,
    #[error("sign-in popup dismissed")]
    PopupCancelled,
    #[error("network unavailable")]
    NetworkUnavailable,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("password too weak")]
    WeakPassword,
    #[error("a request is already pending")]
    RequestPending,
    #[error("surface is no longer mounted")]
    Unmounted,
    #[error("unrecognized provider error: {0}")]
    Unknown(String),
}

impl DomainError {
    // Message shown to the user, or None when nothing should be displayed.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            DomainError::InvalidEmail => Some("Please enter a valid email address."),
            DomainError::UserNotFound => Some("No account found with this email address."),
            DomainError::WrongCredentials => {
                Some("Failed to login. Please check your credentials and try again.")
            }
            DomainError::TooManyAttempts => Some("Too many attempts. Please try again later."),
            DomainError::NetworkUnavailable => {
                Some("Network unavailable. Please check your connection and try again.")
            }
            DomainError::EmailAlreadyInUse => Some("An account with this email already exists."),
            DomainError::WeakPassword => Some("Please choose a stronger password."),
            DomainError::Unknown(_) => Some("An error occurred. Please try again later."),
            DomainError::PopupCancelled | DomainError::RequestPending | DomainError::Unmounted => {
                None
            }
        }
    }

    // False for outcomes the user caused on purpose or that are plain no-ops.
    pub fn is_fault(&self) -> bool {
        !matches!(
            self,
            DomainError::PopupCancelled | DomainError::RequestPending | DomainError::Unmounted
        )
    }
}

impl From<ProviderError> for DomainError {
    fn from(err: ProviderError) -> Self {
        match err.code.as_str() {
            codes::INVALID_EMAIL => DomainError::InvalidEmail,
            codes::USER_NOT_FOUND => DomainError::UserNotFound,
            codes::WRONG_PASSWORD | codes::INVALID_CREDENTIAL | codes::INVALID_LOGIN_CREDENTIALS => {
                DomainError::WrongCredentials
            }
            codes::TOO_MANY_REQUESTS => DomainError::TooManyAttempts,
            codes::POPUP_CLOSED_BY_USER | codes::CANCELLED_POPUP_REQUEST | codes::USER_CANCELLED => {
                DomainError::PopupCancelled
            }
            codes::NETWORK_REQUEST_FAILED => DomainError::NetworkUnavailable,
            codes::EMAIL_ALREADY_IN_USE => DomainError::EmailAlreadyInUse,
            codes::WEAK_PASSWORD => DomainError::WeakPassword,
            _ => DomainError::Unknown(err.code),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

// Signed-in account as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

// The application's belief about who is signed in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    Authenticated(Identity),
    #[default]
    Unauthenticated,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Authenticated(identity) => Some(identity),
            Session::Unauthenticated => None,
        }
    }
}

impl From<Option<Identity>> for Session {
    fn from(value: Option<Identity>) -> Self {
        match value {
            Some(identity) => Session::Authenticated(identity),
            None => Session::Unauthenticated,
        }
    }
}

// Credential operations a flow can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
    Login,
    Register,
    PasswordReset,
    OAuthSignIn,
    SignOut,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlowKind::Login => "login",
            FlowKind::Register => "register",
            FlowKind::PasswordReset => "password_reset",
            FlowKind::OAuthSignIn => "oauth_sign_in",
            FlowKind::SignOut => "sign_out",
        };
        f.write_str(label)
    }
}

// One submitted credential operation. Lives until the provider resolves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialFlowRequest {
    pub request_id: String,
    pub kind: FlowKind,
    pub submitted_at: u64,
}

// Optional account details collected on the registration form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub display_name: Option<String>,
}

// Third-party sign-in providers offered on the login screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OAuthProviderKind {
    Google,
    GitHub,
    Apple,
}

impl OAuthProviderKind {
    // Provider id as used by hosted identity services.
    pub fn provider_id(self) -> &'static str {
        match self {
            OAuthProviderKind::Google => "google.com",
            OAuthProviderKind::GitHub => "github.com",
            OAuthProviderKind::Apple => "apple.com",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" | "google.com" => Some(OAuthProviderKind::Google),
            "github" | "github.com" => Some(OAuthProviderKind::GitHub),
            "apple" | "apple.com" => Some(OAuthProviderKind::Apple),
            _ => None,
        }
    }
}

// Result of evaluating the redirect policy for one session change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationAction {
    NavigateTo(String),
    NoOp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_identity_is_present_then_session_is_authenticated() {
        let identity = Identity {
            id: "uid-1".to_string(),
            email: "pilot@example.com".to_string(),
            display_name: None,
            email_verified: false,
        };

        let session = Session::from(Some(identity.clone()));

        assert!(session.is_authenticated());
        assert_eq!(session.identity(), Some(&identity));
        assert_eq!(Session::from(None), Session::Unauthenticated);
    }

    #[test]
    fn when_oauth_kind_is_parsed_then_aliases_are_accepted() {
        assert_eq!(OAuthProviderKind::parse("Google"), Some(OAuthProviderKind::Google));
        assert_eq!(OAuthProviderKind::parse("github.com"), Some(OAuthProviderKind::GitHub));
        assert_eq!(OAuthProviderKind::parse("myspace"), None);
    }
}

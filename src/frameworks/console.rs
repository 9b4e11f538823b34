// Console driver: wires the provider, store, surfaces and route guard, then
// reads commands from stdin.

use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::domain::entities::{Identity, OAuthProviderKind, Profile, Session};
use crate::domain::errors::DomainError;
use crate::domain::ports::IdentityProvider;
use crate::frameworks::config;
use crate::interface_adapters::state::SurfaceFlow;
use crate::interface_adapters::{
    AppState, InMemoryIdentityProvider, RestIdentityProvider, RouteGuard, TracingNavigator,
};

const USAGE: &str = "commands: login <email> <password> | register <email> <password> [name] | \
reset <email> | oauth <google|github|apple> | logout | goto <route> | status | quit";

// Dependencies stay quiet unless RUST_LOG asks for them.
const DEFAULT_LOG_FILTER: &str = "warn,session_sync=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    match LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init(),
    }

    // Panics go through tracing with their source location.
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|location| format!("{}:{}", location.file(), location.line()));
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?location, ?backtrace, "session driver panic");
    }));
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Register {
        email: String,
        password: String,
        display_name: Option<String>,
    },
    Reset { email: String },
    OAuth(OAuthProviderKind),
    Logout,
    Goto(String),
    Status,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };

        match verb.to_ascii_lowercase().as_str() {
            "login" => match (words.next(), words.next()) {
                (Some(email), Some(password)) => Ok(Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => Err(CommandError::Usage("login <email> <password>")),
            },
            "register" => match (words.next(), words.next()) {
                (Some(email), Some(password)) => {
                    let name = words.collect::<Vec<_>>().join(" ");
                    Ok(Command::Register {
                        email: email.to_string(),
                        password: password.to_string(),
                        display_name: (!name.is_empty()).then_some(name),
                    })
                }
                _ => Err(CommandError::Usage("register <email> <password> [name]")),
            },
            "reset" => words
                .next()
                .map(|email| Command::Reset {
                    email: email.to_string(),
                })
                .ok_or(CommandError::Usage("reset <email>")),
            "oauth" => words
                .next()
                .and_then(OAuthProviderKind::parse)
                .map(Command::OAuth)
                .ok_or(CommandError::Usage("oauth <google|github|apple>")),
            "logout" => Ok(Command::Logout),
            "goto" => words
                .next()
                .map(|route| Command::Goto(route.to_string()))
                .ok_or(CommandError::Usage("goto <route>")),
            "status" => Ok(Command::Status),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn build_provider() -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match config::identity_api_url() {
        Some(url) => {
            let provider = RestIdentityProvider::new(
                &url,
                config::identity_api_key(),
                config::identity_timeout(),
            )
            .context("failed to build identity api client")?;
            info!(%url, "using REST identity provider");
            Ok(Arc::new(provider))
        }
        None => {
            info!("IDENTITY_API_URL not set; using offline demo accounts");
            Ok(Arc::new(demo_provider()))
        }
    }
}

fn demo_provider() -> InMemoryIdentityProvider {
    InMemoryIdentityProvider::new()
        .with_account("demo@example.com", "demo-pass", Some("Demo Pilot"))
        .with_oauth_account(
            OAuthProviderKind::Google,
            Identity {
                id: "google-demo".to_string(),
                email: "demo.google@example.com".to_string(),
                display_name: Some("Google Demo".to_string()),
                email_verified: true,
            },
        )
}

pub async fn run() -> anyhow::Result<()> {
    init_runtime();

    let policy = config::route_policy().context("failed to load route policy")?;
    let app = AppState::new(build_provider()?);

    let navbar = app.mount("navbar");
    let login = app.mount("login");
    let _transitions = app.store.subscribe(|session| match session {
        Session::Authenticated(identity) => {
            info!(user_id = %identity.id, email = %identity.email, "session authenticated")
        }
        Session::Unauthenticated => info!("session unauthenticated"),
    });
    let guard = RouteGuard::mount(&app.store, policy, Arc::new(TracingNavigator), "/login");
    info!("{USAGE}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(err) => {
                warn!(error = %err, "{USAGE}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        execute(command, &login.flow, &guard, &app).await;
    }

    login.unmount();
    navbar.unmount();
    info!("console driver stopped");
    Ok(())
}

async fn execute(command: Command, flow: &SurfaceFlow, guard: &RouteGuard, app: &AppState) {
    match command {
        Command::Login { email, password } => {
            report(flow.login(&email, &password).await.map(|_| ()), flow)
        }
        Command::Register {
            email,
            password,
            display_name,
        } => {
            let profile = Profile { display_name };
            report(
                flow.register(&email, &password, &profile).await.map(|_| ()),
                flow,
            )
        }
        Command::Reset { email } => report(flow.request_password_reset(&email).await, flow),
        Command::OAuth(kind) => report(flow.sign_in_with_oauth(kind).await.map(|_| ()), flow),
        Command::Logout => report(flow.sign_out().await, flow),
        Command::Goto(route) => {
            guard.set_route(route);
            info!(route = %guard.current_route(), "route changed");
        }
        Command::Status => match app.store.get() {
            Session::Authenticated(identity) => info!(
                user_id = %identity.id,
                email = %identity.email,
                display_name = identity.display_name.as_deref().unwrap_or(""),
                route = %guard.current_route(),
                "signed in"
            ),
            Session::Unauthenticated => info!(route = %guard.current_route(), "signed out"),
        },
        Command::Quit => {}
    }
}

fn report(result: Result<(), DomainError>, flow: &SurfaceFlow) {
    match result {
        Ok(()) => {
            if let Some(message) = flow.status().message() {
                info!("{message}");
            }
        }
        Err(err) => match err.user_message() {
            Some(message) => warn!(error = %err, "{message}"),
            None => info!(error = %err, "request dropped"),
        },
    }
}

use std::{env, fs, io, path::Path, time::Duration};

use crate::use_cases::redirect::RoutePolicy;

// Runtime settings read from the environment.

/// Base URL of the REST identity API. Unset means the offline in-memory
/// provider is used.
pub fn identity_api_url() -> Option<String> {
    env::var("IDENTITY_API_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn identity_api_key() -> String {
    env::var("IDENTITY_API_KEY").unwrap_or_default()
}

pub fn identity_timeout() -> Duration {
    let millis = env::var("IDENTITY_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(5000);
    Duration::from_millis(millis)
}

pub fn routes_path() -> Option<String> {
    env::var("SESSION_ROUTES_PATH").ok()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read route policy {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("invalid route policy: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads the route policy from `SESSION_ROUTES_PATH`, falling back to the
/// built-in routes when the variable is unset.
pub fn route_policy() -> Result<RoutePolicy, ConfigError> {
    match routes_path() {
        Some(path) => load_route_policy(&path),
        None => Ok(RoutePolicy::default()),
    }
}

pub fn load_route_policy(path: impl AsRef<Path>) -> Result<RoutePolicy, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_route_policy(&raw)
}

/// Missing keys keep their built-in values.
pub fn parse_route_policy(raw: &str) -> Result<RoutePolicy, ConfigError> {
    Ok(toml::from_str(raw)?)
}

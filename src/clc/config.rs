//! Credential and endpoint resolution from the environment

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::clc::error::ClcError;

pub const DEFAULT_API_URL: &str = "https://api.ctl.io";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_LOOKUP_ATTEMPTS: u32 = 5;
const DEFAULT_LOOKUP_BACKOFF_SECS: u64 = 2;

pub const ENV_API_TOKEN: &str = "CLC_V2_API_TOKEN";
pub const ENV_ACCOUNT_ALIAS: &str = "CLC_ACCT_ALIAS";
pub const ENV_API_USERNAME: &str = "CLC_V2_API_USERNAME";
pub const ENV_API_PASSWORD: &str = "CLC_V2_API_PASSWD";
pub const ENV_API_URL: &str = "CLC_V2_API_URL";
pub const ENV_LOCATION: &str = "CLC_LOCATION";
const ENV_V1_API_KEY: &str = "CLC_V1_API_KEY";
const ENV_V1_API_PASSWORD: &str = "CLC_V1_API_PASSWD";

#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued bearer token scoped to an account alias
    Token { token: String, alias: String },
    /// Username/password exchanged for a token at connect time
    Password { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token { alias, .. } => f
                .debug_struct("Token")
                .field("alias", alias)
                .field("token", &"<redacted>")
                .finish(),
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClcConfig {
    /// Endpoint root, without a trailing slash
    pub api_url: String,
    pub credentials: Credentials,
    /// Datacenter used when a module is given no `location`
    pub location: Option<String>,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub wait_timeout: Duration,
    /// Attempts made to fetch a freshly created server by UUID
    pub lookup_attempts: u32,
    /// First delay between UUID lookups; doubles after each 404
    pub lookup_backoff: Duration,
}

impl ClcConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credentials,
            location: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
            lookup_attempts: DEFAULT_LOOKUP_ATTEMPTS,
            lookup_backoff: Duration::from_secs(DEFAULT_LOOKUP_BACKOFF_SECS),
        }
    }

    /// Resolve credentials the way every CLC module does: a token plus
    /// account alias wins, otherwise a username/password pair is required.
    pub fn from_env(env: &HashMap<String, String>) -> Result<Self, ClcError> {
        let var = |name: &str| env.get(name).filter(|v| !v.is_empty()).cloned();

        let credentials = match (
            var(ENV_API_TOKEN),
            var(ENV_ACCOUNT_ALIAS),
            var(ENV_API_USERNAME),
            var(ENV_API_PASSWORD),
        ) {
            (Some(token), Some(alias), _, _) => Credentials::Token { token, alias },
            (_, _, Some(username), Some(password)) => Credentials::Password { username, password },
            _ => {
                return Err(ClcError::Credentials(
                    "You must set the CLC_V2_API_USERNAME and CLC_V2_API_PASSWD \
                     environment variables"
                        .to_string(),
                ))
            }
        };

        for ignored in ignored_settings(env) {
            warn!("{ignored}");
        }

        let mut config = Self::new(credentials);
        if let Some(api_url) = var(ENV_API_URL) {
            let parsed = Url::parse(&api_url)?;
            config.api_url = parsed.as_str().trim_end_matches('/').to_string();
        }
        config.location = var(ENV_LOCATION);
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_lookup_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.lookup_attempts = attempts;
        self.lookup_backoff = backoff;
        self
    }
}

/// Settings present in `env` that have no effect, as user-facing warnings
pub fn ignored_settings(env: &HashMap<String, String>) -> Vec<String> {
    [ENV_V1_API_KEY, ENV_V1_API_PASSWORD]
        .into_iter()
        .filter(|name| env.get(*name).is_some_and(|v| !v.is_empty()))
        .map(|name| format!("{name} is set but ignored: every call goes through the v2 API"))
        .collect()
}

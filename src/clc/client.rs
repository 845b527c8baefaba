//! Authenticated HTTP client for the CLC v2 API.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::clc::{
    config::{ClcConfig, Credentials},
    error::ClcError,
    models::LoginResponse,
};

/// An authenticated API session
#[derive(Debug, Clone)]
struct Session {
    alias: String,
    bearer_token: String,
    location: Option<String>,
}

/// CLC API client shared by every module
#[derive(Debug, Clone)]
pub struct ClcClient {
    client: Client,
    config: ClcConfig,
    session: Session,
}

impl ClcClient {
    /// Build the HTTP client and establish a session, logging in when the
    /// configuration carries a username and password.
    pub async fn connect(config: ClcConfig) -> Result<Self, ClcError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("clc-modules/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let session = match &config.credentials {
            Credentials::Token { token, alias } => Session {
                alias: alias.clone(),
                bearer_token: token.clone(),
                location: config.location.clone(),
            },
            Credentials::Password { username, password } => {
                let url = format!("{}/v2/authentication/login", config.api_url);
                debug!(url = %url, user = %username, "logging in");
                let response = client
                    .post(&url)
                    .json(&serde_json::json!({
                        "username": username,
                        "password": password,
                    }))
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    warn!(status = status.as_u16(), "CLC login rejected");
                    return Err(ClcError::Credentials(format!(
                        "Failed to authenticate with clc V2 api: {text}"
                    )));
                }

                let login: LoginResponse = response.json().await?;
                info!(user = %login.user_name, alias = %login.account_alias, "authenticated");
                Session {
                    alias: login.account_alias,
                    bearer_token: login.bearer_token,
                    location: config.location.clone().or(login.location_alias),
                }
            }
        };

        Ok(Self {
            client,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ClcConfig {
        &self.config
    }

    /// Account alias API paths are scoped to
    pub fn alias(&self) -> &str {
        &self.session.alias
    }

    /// The datacenter of the authenticated account, or `CLC_LOCATION`
    pub fn default_location(&self) -> Option<&str> {
        self.session.location.as_deref()
    }

    /// Same session, scoped to a different (sub-)account alias
    pub fn for_account(&self, alias: &str) -> Self {
        let mut scoped = self.clone();
        scoped.session.alias = alias.to_string();
        scoped
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        // Links handed back by the API are usually relative, but not always
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.config.api_url, path)
        };
        debug!(method = %method, url = %url, "CLC request");
        self.client
            .request(method, url)
            .bearer_auth(&self.session.bearer_token)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClcError> {
        let response = self.request(Method::GET, path).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ClcError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ClcError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ClcError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.request(Method::PATCH, path).json(body).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClcError> {
        let response = self.request(Method::DELETE, path).send().await?;
        Self::handle_response(response).await
    }

    /// Send a request whose response body carries nothing of interest
    pub(crate) async fn send_empty<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ClcError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(Self::status_error(status, text))
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClcError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            // Some endpoints answer 204; let unit-like targets accept that
            let body = if text.trim().is_empty() { "null" } else { text.as_str() };
            serde_json::from_str(body).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                ClcError::Serialization(e)
            })
        } else {
            Err(Self::status_error(status, text))
        }
    }

    fn status_error(status: StatusCode, text: String) -> ClcError {
        if status == StatusCode::NOT_FOUND {
            ClcError::NotFound(text)
        } else {
            ClcError::Api {
                status: status.as_u16(),
                message: extract_message(&text),
            }
        }
    }
}

/// CLC error bodies look like `{"message": "..."}`; fall back to the raw text
fn extract_message(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| text.to_string())
}

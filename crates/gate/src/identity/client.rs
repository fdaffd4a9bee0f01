//! HTTP client for the remote identity service
//!
//! Three independent calls, none of them retried: a reachability probe,
//! a credential login and a current-identity lookup.

use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{Credentials, CurrentIdentity, Envelope, LoginResult, SessionToken};
use crate::config::{IdentityServiceConfig, Routes};
use crate::error::{GateError, GateResult};

/// Identity service client. Holds no session state: tokens are returned to
/// the caller and passed back in explicitly.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http_client: Client,
    base_url: String,
    routes: Routes,
}

impl IdentityClient {
    pub fn new(http_client: Client, base_url: impl Into<String>, routes: Routes) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            routes,
        }
    }

    /// Build a client with its own connection pool.
    pub fn from_config(config: &IdentityServiceConfig) -> GateResult<Self> {
        let http_client = Client::builder().build().map_err(|e| {
            GateError::Configuration(format!("failed to build identity http client: {}", e))
        })?;

        Ok(Self::new(
            http_client,
            config.base_url.clone(),
            config.routes.clone(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// Check the identity service answers at all.
    ///
    /// Any completed round trip counts as reachable, whatever the status.
    pub async fn probe(&self) -> GateResult<()> {
        let url = self.url(&self.routes.health);
        tracing::debug!(url = %url, "probing identity service");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| GateError::transport(&url, e))?;

        tracing::debug!(url = %url, status = %response.status(), "identity service answered probe");
        Ok(())
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, credentials: &Credentials) -> GateResult<SessionToken> {
        let url = self.url(&self.routes.login);
        tracing::debug!(url = %url, username = %credentials.username, "logging in to identity service");

        let response = self
            .http_client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| GateError::transport(&url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GateError::Authentication {
                url,
                status: status.as_u16(),
            });
        }

        let login: LoginResult = read_envelope(&url, response).await?;
        Ok(SessionToken::new(login.jwt))
    }

    /// Resolve the identifier owning `token`.
    ///
    /// Membership in an allow-list is the caller's business.
    pub async fn verify_identity(&self, token: &SessionToken) -> GateResult<String> {
        let url = self.url(&self.routes.identity_lookup);
        tracing::debug!(url = %url, "looking up current identity");

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, token.bearer_header())
            .send()
            .await
            .map_err(|e| GateError::transport(&url, e))?;

        let identity: CurrentIdentity = read_envelope(&url, response).await?;
        Ok(identity.id)
    }
}

/// Read a `{"result": T}` body, mapping unreadable or unexpected JSON to a malformed response.
async fn read_envelope<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> GateResult<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| GateError::transport(url, e))?;

    serde_json::from_slice::<Envelope<T>>(&body)
        .map(|envelope| envelope.result)
        .map_err(|e| GateError::malformed(url, e))
}

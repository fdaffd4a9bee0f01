//! Authorization decision for one inbound request
//!
//! Construction probes the identity service and fails if it is unreachable,
//! so an `AuthGate` value always means "ready". Each request then runs:
//! extract credentials -> login -> (identity check if restricted) -> decision.

use std::future::Future;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use tokio::time::Instant;

use super::credentials::extract_basic_credentials;
use crate::allow_list::AllowList;
use crate::config::Config;
use crate::error::{GateError, GateResult};
use crate::health;
use crate::identity::IdentityClient;

/// Step of the per-request chain an error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    ExtractingCredentials,
    LoggingIn,
    CheckingIdentity,
}

/// Successful decision. Only used for logging, nothing is attached to the forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub username: String,
    /// Resolved identity, present only when the allow-list is restricted.
    pub identity: Option<String>,
}

#[derive(Debug)]
pub struct Rejection {
    pub stage: AuthStage,
    pub error: GateError,
}

impl Rejection {
    fn at(stage: AuthStage) -> impl FnOnce(GateError) -> Rejection {
        move |error| Rejection { stage, error }
    }
}

#[derive(Debug)]
pub struct AuthGate {
    client: IdentityClient,
    allow_list: AllowList,
    realm_label: String,
    challenge: HeaderValue,
    request_timeout: Option<Duration>,
}

impl AuthGate {
    /// Validate `config`, build the identity client and probe the service.
    ///
    /// Any failure here means the gate must not be installed.
    pub async fn new(config: Config) -> GateResult<Self> {
        let config = config.with_defaults().validate()?;
        let request_timeout = config.request_timeout();
        let challenge = challenge_header(&config.realm_label)?;
        let client = IdentityClient::from_config(&config.identity)?;

        within(deadline_from(request_timeout), health::ensure_reachable(&client)).await?;

        let allow_list = AllowList::new(config.identity.allowed_identities);
        tracing::info!(
            base_url = %client.base_url(),
            restricted = allow_list.is_restricted(),
            allowed_identities = allow_list.identities().len(),
            request_timeout = ?request_timeout,
            "identity gate ready"
        );

        Ok(Self {
            client,
            allow_list,
            realm_label: config.realm_label,
            challenge,
            request_timeout,
        })
    }

    pub fn realm_label(&self) -> &str {
        &self.realm_label
    }

    /// Prebuilt `WWW-Authenticate` value for rejections
    pub fn challenge(&self) -> &HeaderValue {
        &self.challenge
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Decide whether the request carrying `headers` may pass.
    ///
    /// The session token produced by login lives only in this call's stack
    /// frame, so concurrent requests never see each other's token.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<Authorized, Rejection> {
        let credentials = extract_basic_credentials(headers).ok_or(Rejection {
            stage: AuthStage::ExtractingCredentials,
            error: GateError::MissingCredentials,
        })?;

        let deadline = deadline_from(self.request_timeout);

        let token = within(deadline, self.client.login(&credentials))
            .await
            .map_err(Rejection::at(AuthStage::LoggingIn))?;

        if !self.allow_list.is_restricted() {
            return Ok(Authorized {
                username: credentials.username,
                identity: None,
            });
        }

        let identity = within(deadline, self.client.verify_identity(&token))
            .await
            .map_err(Rejection::at(AuthStage::CheckingIdentity))?;

        if !self.allow_list.is_allowed(&identity) {
            return Err(Rejection {
                stage: AuthStage::CheckingIdentity,
                error: GateError::NotAllowed {
                    identity,
                    allowed: self.allow_list.identities().to_vec(),
                },
            });
        }

        Ok(Authorized {
            username: credentials.username,
            identity: Some(identity),
        })
    }
}

/// Deadline starting now. A timeout too large to represent means no deadline.
fn deadline_from(timeout: Option<Duration>) -> Option<(Instant, Duration)> {
    let after = timeout?;
    Instant::now().checked_add(after).map(|at| (at, after))
}

/// Run `call` under the request deadline, if one is configured.
async fn within<T>(
    deadline: Option<(Instant, Duration)>,
    call: impl Future<Output = GateResult<T>>,
) -> GateResult<T> {
    match deadline {
        Some((at, after)) => tokio::time::timeout_at(at, call)
            .await
            .map_err(|_| GateError::DeadlineExceeded { after })?,
        None => call.await,
    }
}

fn challenge_header(realm_label: &str) -> GateResult<HeaderValue> {
    let escaped = realm_label.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("Basic realm=\"{}\"", escaped)).map_err(|_| {
        GateError::Configuration(format!(
            "realm label '{}' cannot be used in a header",
            realm_label
        ))
    })
}

//! Error types for the identity gate

use std::time::Duration;

/// Everything that can go wrong between construction and a forward/reject decision.
///
/// Per-request variants all collapse to the same challenge response; the
/// detail carried here is for logs only.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The remote call could not complete (refused connection, DNS, timeout).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The per-request deadline elapsed before the authorization chain finished.
    #[error("authorization chain exceeded deadline of {after:?}")]
    DeadlineExceeded { after: Duration },
    /// Login answered with something other than 200.
    #[error("authentication request sent to {url} failed: status code {status}")]
    Authentication { url: String, status: u16 },
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
    #[error("identity {identity} is not part of allowed identities: {allowed:?}")]
    NotAllowed {
        identity: String,
        allowed: Vec<String>,
    },
    #[error("missing or malformed basic auth credentials")]
    MissingCredentials,
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GateError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        GateError::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl std::fmt::Display) -> Self {
        GateError::MalformedResponse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type GateResult<T> = Result<T, GateError>;

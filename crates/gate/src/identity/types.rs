//! Values exchanged with the identity service

use std::fmt;

use serde::{Deserialize, Serialize};

/// Username and password taken from one inbound request. Never stored.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Bearer token returned by a successful login.
///
/// Only valid for the request that produced it; it is handed from `login`
/// to `verify_identity` by value and dropped with the request.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// `{"result": {...}}` wrapper used by every identity service answer
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResult {
    pub jwt: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentIdentity {
    #[serde(rename = "_id")]
    pub id: String,
}

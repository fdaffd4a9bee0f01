// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Identity Gate Library
//!
//! Basic auth gate that exchanges inbound credentials for a session token
//! against a remote identity service, optionally checks the resolved
//! identity against an allow-list, and forwards or rejects the request.

pub mod allow_list;
pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod identity;
pub mod proxy;
#[cfg(test)]
pub(crate) mod test_support;

pub use allow_list::AllowList;
pub use auth::{protect, require_identity, AuthGate};
pub use config::{Config, ServerConfig};
pub use error::{GateError, GateResult};
pub use identity::{Credentials, IdentityClient, SessionToken};

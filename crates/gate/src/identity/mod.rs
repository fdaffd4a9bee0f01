//! Remote identity service access

pub mod client;
pub mod types;

pub use client::IdentityClient;
pub use types::{Credentials, SessionToken};

//! Basic auth gate backed by the remote identity service

pub mod credentials;
pub mod gate;
pub mod middleware;

pub use credentials::extract_basic_credentials;
pub use gate::{AuthGate, AuthStage, Authorized, Rejection};
pub use middleware::{protect, require_identity, unauthorized};

//! One-shot reachability check run when the gate is built

use crate::error::{GateError, GateResult};
use crate::identity::IdentityClient;

/// Probe the identity service once. No retry: an unreachable service stops startup.
pub async fn ensure_reachable(client: &IdentityClient) -> GateResult<()> {
    match client.probe().await {
        Ok(()) => {
            tracing::info!(base_url = %client.base_url(), "identity service reachable");
            Ok(())
        }
        Err(err) => {
            tracing::error!(base_url = %client.base_url(), error = %err, "unable to reach identity service");
            Err(err)
        }
    }
}

//! Endpoint resolution: selector in, one concrete endpoint out.

use crate::cluster::{ClusterApi, Endpoint, Selector};
use crate::error::{BridgeError, Result};

/// Resolve a selector to a single endpoint.
///
/// When several endpoints match, the first one in listing order wins. The
/// listing order is stable for a given cluster state, so this is a
/// deterministic tie-break rather than a random pick. Callers that need a
/// strict singleton must narrow the selector instead.
///
/// # Errors
///
/// Returns `NotFound` when no endpoint matches, or passes through the
/// listing failure (`Upstream`) from the cluster handle.
pub async fn resolve(cluster: &dyn ClusterApi, selector: &Selector) -> Result<Endpoint> {
    let endpoints = cluster.list_endpoints(selector).await?;
    let matched = endpoints.len();

    let endpoint = endpoints
        .into_iter()
        .next()
        .ok_or_else(|| BridgeError::NotFound(selector.expression.clone()))?;

    if matched > 1 {
        tracing::debug!(
            selector = %selector.expression,
            scope = %selector.scope,
            matched,
            endpoint = %endpoint.name,
            "Multiple endpoints matched, using first in listing order"
        );
    }

    Ok(endpoint)
}

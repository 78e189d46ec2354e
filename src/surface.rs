//! Surface selection: pick the execution context that should receive the
//! command when an endpoint hosts several co-located processes.

use std::collections::HashSet;

use crate::cluster::Endpoint;
use crate::error::{BridgeError, Result};

/// Pick the first surface, in declared order, whose name is not excluded.
///
/// The exclusion set is fixed configuration (known proxy-sidecar names), so
/// this is a best-effort name heuristic rather than content inspection.
///
/// # Errors
///
/// Returns `NoEligibleSurface` when the endpoint has no surfaces or every
/// surface name is excluded.
pub fn select_surface<'a>(
    endpoint: &'a Endpoint,
    exclusions: &HashSet<String>,
) -> Result<&'a str> {
    endpoint
        .surfaces
        .iter()
        .map(|surface| surface.name.as_str())
        .find(|name| !exclusions.contains(*name))
        .ok_or_else(|| BridgeError::NoEligibleSurface(endpoint.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Surface;

    fn endpoint(surfaces: &[&str]) -> Endpoint {
        Endpoint {
            name: "useradm-0".to_string(),
            scope: "default".to_string(),
            surfaces: surfaces.iter().map(|s| Surface::new(*s)).collect(),
        }
    }

    fn exclusions(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_first_surface_when_nothing_excluded() {
        let ep = endpoint(&["app", "metrics"]);
        assert_eq!(select_surface(&ep, &exclusions(&[])).unwrap(), "app");
    }

    #[test]
    fn skips_excluded_sidecar() {
        let ep = endpoint(&["istio-proxy", "app"]);
        let result = select_surface(&ep, &exclusions(&["istio-proxy"])).unwrap();
        assert_eq!(result, "app");
    }

    #[test]
    fn declared_order_breaks_ties() {
        let ep = endpoint(&["istio-proxy", "app", "worker"]);
        let result = select_surface(&ep, &exclusions(&["istio-proxy"])).unwrap();
        assert_eq!(result, "app");
    }

    #[test]
    fn fails_when_every_surface_excluded() {
        let ep = endpoint(&["istio-proxy", "linkerd-proxy"]);
        let result = select_surface(&ep, &exclusions(&["istio-proxy", "linkerd-proxy"]));
        assert!(matches!(result, Err(BridgeError::NoEligibleSurface(_))));
    }

    #[test]
    fn fails_when_endpoint_has_no_surfaces() {
        let ep = endpoint(&[]);
        let result = select_surface(&ep, &exclusions(&[]));
        assert!(matches!(result, Err(BridgeError::NoEligibleSurface(_))));
    }
}

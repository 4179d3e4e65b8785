//! Internal status virtual host.
//!
//! Signals that the proxy has been configured. Readiness and liveness probes
//! hit `/ready` on the internal domain, which is answered from the proxy's
//! own stats cluster.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::kourier::INTERNAL_KOURIER_DOMAIN;
use crate::envoy::filter::FilterOverride;
use crate::envoy::route::{new_route, new_virtual_host, new_weighted_cluster, Route, VirtualHost};
use crate::envoy::HTTP_EXTERNAL_AUTHORIZATION;

/// Cluster backing the readiness route. It is defined by the data plane's
/// static bootstrap, not published by this control plane.
pub const SERVICE_STATS_CLUSTER_NAME: &str = "service_stats";

const READY_ROUTE_NAME: &str = "gateway_ready";
const READY_PATH: &str = "/ready";
const READY_TIMEOUT: Duration = Duration::from_secs(1);

/// The status virtual host, to be merged into every generated route table.
///
/// External authorization is always disabled here so readiness never depends
/// on the authorizer being reachable.
pub fn status_vhost() -> VirtualHost {
    let mut vhost = new_virtual_host(
        INTERNAL_KOURIER_DOMAIN,
        vec![INTERNAL_KOURIER_DOMAIN.to_string()],
        vec![ready_route()],
    );

    vhost.typed_per_filter_config.insert(
        HTTP_EXTERNAL_AUTHORIZATION.to_string(),
        FilterOverride::ext_authz_disabled(),
    );

    vhost
}

fn ready_route() -> Route {
    let cluster = new_weighted_cluster(SERVICE_STATS_CLUSTER_NAME, 100, BTreeMap::new());
    new_route(
        READY_ROUTE_NAME,
        Vec::new(),
        READY_PATH,
        vec![cluster],
        READY_TIMEOUT,
        BTreeMap::new(),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envoy::filter::ExtAuthzPerRoute;

    #[test]
    fn test_status_vhost() {
        let vhost = status_vhost();

        assert_eq!(vhost.domains, vec![INTERNAL_KOURIER_DOMAIN.to_string()]);
        assert_eq!(vhost.routes.len(), 1);

        let route = &vhost.routes[0];
        assert_eq!(route.name, READY_ROUTE_NAME);
        assert_eq!(route.route_match.prefix, READY_PATH);
        assert_eq!(route.route.timeout, READY_TIMEOUT);
        let clusters = &route.route.weighted_clusters.clusters;
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].name, SERVICE_STATS_CLUSTER_NAME);
        assert_eq!(clusters[0].weight, 100);

        assert_eq!(
            vhost.typed_per_filter_config.get(HTTP_EXTERNAL_AUTHORIZATION),
            Some(&FilterOverride::ExtAuthzPerRoute(ExtAuthzPerRoute { disabled: true }))
        );
    }
}

//! Upstream cluster for the tracing collector.

use std::time::Duration;

use crate::config::kourier::Tracing;
use crate::envoy::cluster::{Cluster, UpstreamHttpProtocol};
use crate::envoy::connection_manager::TRACING_COLLECTOR_CLUSTER;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The cluster the Zipkin tracer posts spans to, if tracing is enabled.
pub fn tracing_collector_cluster(tracing: &Tracing) -> Option<Cluster> {
    if !tracing.enabled {
        return None;
    }
    Some(Cluster::strict_dns(
        TRACING_COLLECTOR_CLUSTER,
        tracing.collector_host.clone(),
        tracing.collector_port,
        CONNECT_TIMEOUT,
        UpstreamHttpProtocol::Http1,
    ))
}

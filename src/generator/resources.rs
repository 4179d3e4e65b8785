//! Resources produced by one generation pass.
//!
//! Route tables are published with cluster validation on, so a route that
//! names a cluster missing from the inventory would be rejected by the data
//! plane. `validate` catches that before anything is handed to the
//! publisher.

use serde::Serialize;

use crate::config::kourier::KourierConfig;
use crate::envoy::cluster::Cluster;
use crate::envoy::listener::Listener;
use crate::envoy::route::RouteConfiguration;
use crate::generator::collector::tracing_collector_cluster;
use crate::generator::status_vhost::SERVICE_STATS_CLUSTER_NAME;
use crate::generator::GeneratorError;

/// Clusters the data plane defines in its static bootstrap.
const BOOTSTRAP_CLUSTERS: &[&str] = &[SERVICE_STATS_CLUSTER_NAME];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSet {
    pub listeners: Vec<Listener>,
    pub routes: Vec<RouteConfiguration>,
    pub clusters: Vec<Cluster>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set seeded with the clusters `config` implies: the authorizer when
    /// external authorization is on, the collector when tracing is on.
    pub fn for_config(config: &KourierConfig) -> Self {
        let mut set = Self::new();
        if config.external_authz.enabled {
            set.add_cluster(config.external_authz.cluster());
        }
        if let Some(cluster) = tracing_collector_cluster(&config.tracing) {
            set.add_cluster(cluster);
        }
        set
    }

    /// Add a cluster, replacing any cluster of the same name.
    pub fn add_cluster(&mut self, cluster: Cluster) {
        match self.clusters.iter_mut().find(|c| c.name == cluster.name) {
            Some(existing) => *existing = cluster,
            None => self.clusters.push(cluster),
        }
    }

    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn add_route_config(&mut self, route_config: RouteConfiguration) {
        self.routes.push(route_config);
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.name == name)
    }

    fn has_cluster(&self, name: &str) -> bool {
        BOOTSTRAP_CLUSTERS.contains(&name) || self.cluster(name).is_some()
    }

    /// Check that every route target exists in the cluster inventory.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        for route_config in &self.routes {
            for (route, cluster) in route_config.cluster_names() {
                if !self.has_cluster(cluster) {
                    return Err(GeneratorError::MissingCluster {
                        route_config: route_config.name.clone(),
                        route: route.to_string(),
                        cluster: cluster.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

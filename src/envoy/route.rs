//! Route table descriptors and their builders.
//!
//! Route tables are published under a name and referenced from the
//! connection manager through route discovery, so a route change never
//! forces a listener reload.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::envoy::core::{proto_duration, HeaderValue, HeaderValueOption};
use crate::envoy::filter::FilterOverride;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteConfiguration {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
    pub validate_clusters: bool,
}

impl RouteConfiguration {
    /// Names of every cluster any route of this table can dispatch to.
    pub fn cluster_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.virtual_hosts.iter().flat_map(|vh| {
            vh.routes.iter().flat_map(|r| {
                let route = r.name.as_str();
                r.cluster_names().map(move |c| (route, c))
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub typed_per_filter_config: BTreeMap<String, FilterOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderMatcher {
    pub name: String,
    pub exact_match: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    pub prefix: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderMatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterWeight {
    pub name: String,
    pub weight: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub request_headers_to_add: Vec<HeaderValueOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeightedCluster {
    pub clusters: Vec<ClusterWeight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeConfig {
    pub upgrade_type: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteAction {
    pub weighted_clusters: WeightedCluster,
    #[serde(serialize_with = "proto_duration::serialize")]
    pub timeout: Duration,
    pub upgrade_configs: Vec<UpgradeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_rewrite_literal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub name: String,
    #[serde(rename = "match")]
    pub route_match: RouteMatch,
    pub route: RouteAction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub request_headers_to_add: Vec<HeaderValueOption>,
}

impl Route {
    pub fn cluster_names(&self) -> impl Iterator<Item = &str> {
        self.route
            .weighted_clusters
            .clusters
            .iter()
            .map(|c| c.name.as_str())
    }
}

fn header_options(headers: BTreeMap<String, String>) -> Vec<HeaderValueOption> {
    headers
        .into_iter()
        .map(|(key, value)| HeaderValueOption {
            header: HeaderValue::new(key, value),
            append: false,
        })
        .collect()
}

/// Create a new RouteConfiguration with the given name and hosts.
///
/// Cluster validation is always on: a table that points at a cluster the
/// data plane does not know is rejected on load instead of failing requests
/// at traffic time.
pub fn new_route_config(name: impl Into<String>, virtual_hosts: Vec<VirtualHost>) -> RouteConfiguration {
    RouteConfiguration {
        name: name.into(),
        virtual_hosts,
        validate_clusters: true,
    }
}

pub fn new_virtual_host(name: impl Into<String>, domains: Vec<String>, routes: Vec<Route>) -> VirtualHost {
    VirtualHost {
        name: name.into(),
        domains,
        routes,
        typed_per_filter_config: BTreeMap::new(),
    }
}

pub fn new_weighted_cluster(
    name: impl Into<String>,
    weight: u32,
    headers: BTreeMap<String, String>,
) -> ClusterWeight {
    ClusterWeight {
        name: name.into(),
        weight,
        request_headers_to_add: header_options(headers),
    }
}

/// Create a prefix-matched route splitting traffic over weighted clusters.
/// Websocket upgrades are always allowed.
pub fn new_route(
    name: impl Into<String>,
    headers_match: Vec<HeaderMatcher>,
    path: &str,
    clusters: Vec<ClusterWeight>,
    timeout: Duration,
    headers: BTreeMap<String, String>,
    host_rewrite: Option<String>,
) -> Route {
    Route {
        name: name.into(),
        route_match: RouteMatch {
            prefix: path.to_string(),
            headers: headers_match,
        },
        route: RouteAction {
            weighted_clusters: WeightedCluster { clusters },
            timeout,
            upgrade_configs: vec![UpgradeConfig {
                upgrade_type: "websocket".to_string(),
                enabled: true,
            }],
            host_rewrite_literal: host_rewrite.filter(|h| !h.is_empty()),
        },
        request_headers_to_add: header_options(headers),
    }
}

//! Upstream cluster descriptors.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::envoy::core::{proto_duration, Address};

/// Key under which upstream HTTP options are attached to a cluster.
pub const HTTP_PROTOCOL_OPTIONS_KEY: &str = "envoy.extensions.upstreams.http.v3.HttpProtocolOptions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoveryType {
    Static,
    StrictDns,
    LogicalDns,
    Eds,
}

/// HTTP version spoken to the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamHttpProtocol {
    Http1,
    Http2,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Http1ProtocolOptions {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Http2ProtocolOptions {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExplicitHttpConfig {
    #[serde(rename = "http_protocol_options")]
    Http1(Http1ProtocolOptions),
    #[serde(rename = "http2_protocol_options")]
    Http2(Http2ProtocolOptions),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpProtocolOptions {
    pub explicit_http_config: ExplicitHttpConfig,
}

impl HttpProtocolOptions {
    pub fn explicit(protocol: UpstreamHttpProtocol) -> Self {
        let explicit_http_config = match protocol {
            UpstreamHttpProtocol::Http1 => ExplicitHttpConfig::Http1(Http1ProtocolOptions {}),
            UpstreamHttpProtocol::Http2 => ExplicitHttpConfig::Http2(Http2ProtocolOptions {}),
        };
        Self {
            explicit_http_config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum ProtocolOptions {
    #[serde(rename = "type.googleapis.com/envoy.extensions.upstreams.http.v3.HttpProtocolOptions")]
    Http(HttpProtocolOptions),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LbEndpoint {
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalityLbEndpoints {
    pub lb_endpoints: Vec<LbEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterLoadAssignment {
    pub cluster_name: String,
    pub endpoints: Vec<LocalityLbEndpoints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub name: String,
    #[serde(rename = "type")]
    pub discovery_type: DiscoveryType,
    #[serde(serialize_with = "proto_duration::serialize")]
    pub connect_timeout: Duration,
    pub load_assignment: ClusterLoadAssignment,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub typed_extension_protocol_options: BTreeMap<String, ProtocolOptions>,
}

impl Cluster {
    /// A strict-DNS cluster with a single `host:port` endpoint speaking the
    /// given HTTP version upstream.
    pub fn strict_dns(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        connect_timeout: Duration,
        protocol: UpstreamHttpProtocol,
    ) -> Self {
        let name = name.into();

        let mut address = Address::tcp(host, port);
        address.socket_address.ipv4_compat = true;

        let mut typed_extension_protocol_options = BTreeMap::new();
        typed_extension_protocol_options.insert(
            HTTP_PROTOCOL_OPTIONS_KEY.to_string(),
            ProtocolOptions::Http(HttpProtocolOptions::explicit(protocol)),
        );

        Self {
            load_assignment: ClusterLoadAssignment {
                cluster_name: name.clone(),
                endpoints: vec![LocalityLbEndpoints {
                    lb_endpoints: vec![LbEndpoint {
                        endpoint: Endpoint { address },
                    }],
                }],
            },
            name,
            discovery_type: DiscoveryType::StrictDns,
            connect_timeout,
            typed_extension_protocol_options,
        }
    }

    /// The explicitly configured upstream HTTP version, if any.
    pub fn upstream_http_protocol(&self) -> Option<UpstreamHttpProtocol> {
        match self.typed_extension_protocol_options.get(HTTP_PROTOCOL_OPTIONS_KEY)? {
            ProtocolOptions::Http(opts) => Some(match opts.explicit_http_config {
                ExplicitHttpConfig::Http1(_) => UpstreamHttpProtocol::Http1,
                ExplicitHttpConfig::Http2(_) => UpstreamHttpProtocol::Http2,
            }),
        }
    }

    /// Every endpoint address of the load assignment.
    pub fn endpoint_addresses(&self) -> impl Iterator<Item = &Address> {
        self.load_assignment
            .endpoints
            .iter()
            .flat_map(|l| l.lb_endpoints.iter())
            .map(|lb| &lb.endpoint.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_dns_cluster_shape() {
        let cluster = Cluster::strict_dns(
            "backend",
            "svc.local",
            8080,
            Duration::from_secs(5),
            UpstreamHttpProtocol::Http1,
        );

        assert_eq!(cluster.discovery_type, DiscoveryType::StrictDns);
        assert_eq!(cluster.load_assignment.cluster_name, "backend");
        assert_eq!(cluster.upstream_http_protocol(), Some(UpstreamHttpProtocol::Http1));

        let addrs: Vec<_> = cluster.endpoint_addresses().collect();
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].socket_address.address, "svc.local");
        assert_eq!(addrs[0].socket_address.port_value, 8080);
        assert!(addrs[0].socket_address.ipv4_compat);
    }

    #[test]
    fn test_cluster_json_uses_envoy_field_names() {
        let cluster = Cluster::strict_dns(
            "c",
            "h",
            1,
            Duration::from_secs(5),
            UpstreamHttpProtocol::Http2,
        );
        let json = serde_json::to_value(&cluster).unwrap();

        assert_eq!(json["type"], "STRICT_DNS");
        assert_eq!(json["connect_timeout"], "5s");
        let opts = &json["typed_extension_protocol_options"][HTTP_PROTOCOL_OPTIONS_KEY];
        assert_eq!(
            opts["@type"],
            "type.googleapis.com/envoy.extensions.upstreams.http.v3.HttpProtocolOptions"
        );
        assert!(opts["explicit_http_config"]["http2_protocol_options"].is_object());
    }
}

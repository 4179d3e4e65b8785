//! Listener descriptors wrapping a connection manager.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::envoy::connection_manager::HttpConnectionManager;
use crate::envoy::core::{Address, ConfigSource};
use crate::envoy::{HTTP_CONNECTION_MANAGER, PROXY_PROTOCOL, TLS_TRANSPORT_SOCKET};

const LISTEN_ADDRESS: &str = "0.0.0.0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyProtocol {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum ListenerFilterConfig {
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.listener.proxy_protocol.v3.ProxyProtocol")]
    ProxyProtocol(ProxyProtocol),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerFilter {
    pub name: String,
    pub typed_config: ListenerFilterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum NetworkFilterConfig {
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager")]
    HttpConnectionManager(Box<HttpConnectionManager>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkFilter {
    pub name: String,
    pub typed_config: NetworkFilterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsParameters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cipher_suites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdsSecretConfig {
    pub name: String,
    pub sds_config: ConfigSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonTlsContext {
    pub tls_params: TlsParameters,
    pub tls_certificate_sds_secret_configs: Vec<SdsSecretConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownstreamTlsContext {
    pub common_tls_context: CommonTlsContext,
}

impl DownstreamTlsContext {
    /// Serve the certificate published under `secret_name` over ADS,
    /// restricted to the given cipher suites (empty = data plane defaults).
    pub fn from_secret(secret_name: impl Into<String>, cipher_suites: &BTreeSet<String>) -> Self {
        Self {
            common_tls_context: CommonTlsContext {
                tls_params: TlsParameters {
                    cipher_suites: cipher_suites.iter().cloned().collect(),
                },
                tls_certificate_sds_secret_configs: vec![SdsSecretConfig {
                    name: secret_name.into(),
                    sds_config: ConfigSource::ads(None),
                }],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum TransportSocketConfig {
    #[serde(rename = "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext")]
    DownstreamTls(DownstreamTlsContext),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportSocket {
    pub name: String,
    pub typed_config: TransportSocketConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChain {
    pub filters: Vec<NetworkFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_socket: Option<TransportSocket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listener {
    pub name: String,
    pub address: Address,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listener_filters: Vec<ListenerFilter>,
    pub filter_chains: Vec<FilterChain>,
}

impl Listener {
    /// The connection managers served by this listener.
    pub fn connection_managers(&self) -> impl Iterator<Item = &HttpConnectionManager> {
        self.filter_chains
            .iter()
            .flat_map(|chain| chain.filters.iter())
            .map(|filter| match &filter.typed_config {
                NetworkFilterConfig::HttpConnectionManager(mgr) => mgr.as_ref(),
            })
    }
}

fn listener_name(port: u16) -> String {
    format!("listener_{port}")
}

fn new_listener(
    manager: HttpConnectionManager,
    port: u16,
    enable_proxy_protocol: bool,
    transport_socket: Option<TransportSocket>,
) -> Listener {
    let mut listener_filters = Vec::new();
    if enable_proxy_protocol {
        listener_filters.push(ListenerFilter {
            name: PROXY_PROTOCOL.to_string(),
            typed_config: ListenerFilterConfig::ProxyProtocol(ProxyProtocol {}),
        });
    }

    Listener {
        name: listener_name(port),
        address: Address::tcp(LISTEN_ADDRESS, port),
        listener_filters,
        filter_chains: vec![FilterChain {
            filters: vec![NetworkFilter {
                name: HTTP_CONNECTION_MANAGER.to_string(),
                typed_config: NetworkFilterConfig::HttpConnectionManager(Box::new(manager)),
            }],
            transport_socket,
        }],
    }
}

/// Plaintext listener on `port`.
pub fn new_http_listener(manager: HttpConnectionManager, port: u16, enable_proxy_protocol: bool) -> Listener {
    new_listener(manager, port, enable_proxy_protocol, None)
}

/// TLS-terminating listener on `port`.
pub fn new_https_listener(
    manager: HttpConnectionManager,
    port: u16,
    enable_proxy_protocol: bool,
    tls: DownstreamTlsContext,
) -> Listener {
    let socket = TransportSocket {
        name: TLS_TRANSPORT_SOCKET.to_string(),
        typed_config: TransportSocketConfig::DownstreamTls(tls),
    };
    new_listener(manager, port, enable_proxy_protocol, Some(socket))
}

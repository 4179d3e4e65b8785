//! External authorization settings and the descriptors built from them.
//!
//! The cluster and the filter share one logical cluster name so the filter
//! always resolves to the cluster published next to it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::loader::{split_host_port, ConfigError, RawSection};
use crate::envoy::cluster::{Cluster, UpstreamHttpProtocol};
use crate::envoy::core::{ApiVersion, HeaderValue};
use crate::envoy::filter::{
    AuthorizationRequest, BufferSettings, EnvoyGrpc, ExtAuthz, ExtAuthzService, GrpcService,
    HttpFilter, HttpService, HttpUri,
};

/// Logical name of the authorizer's upstream cluster.
pub const EXT_AUTHZ_CLUSTER_NAME: &str = "extAuthz";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CLIENT_HEADER: (&str, &str) = ("client", "kourier");

const HOST_KEY: &str = "extauthz-host";
const FAILURE_MODE_ALLOW_KEY: &str = "extauthz-failure-mode-allow";
const MAX_REQUEST_BYTES_KEY: &str = "extauthz-max-request-bytes";
const TIMEOUT_KEY: &str = "extauthz-timeout";
const PROTOCOL_KEY: &str = "extauthz-protocol";
const PACK_AS_BYTES_KEY: &str = "extauthz-pack-as-bytes";
const PATH_PREFIX_KEY: &str = "extauthz-path-prefix";

/// Fatal errors raised while building the authorization filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtAuthzError {
    #[error("pack as bytes option cannot be set when using {protocol} protocol")]
    PackAsBytesRequiresGrpc { protocol: AuthzProtocol },
}

/// Protocol used to talk to the authorizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthzProtocol {
    #[default]
    Grpc,
    Http,
    Https,
}

impl AuthzProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthzProtocol::Grpc => "grpc",
            AuthzProtocol::Http => "http",
            AuthzProtocol::Https => "https",
        }
    }

    fn upstream_http_protocol(&self) -> UpstreamHttpProtocol {
        match self {
            AuthzProtocol::Grpc => UpstreamHttpProtocol::Http2,
            AuthzProtocol::Http | AuthzProtocol::Https => UpstreamHttpProtocol::Http1,
        }
    }
}

impl fmt::Display for AuthzProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthzProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grpc" => Ok(AuthzProtocol::Grpc),
            "http" => Ok(AuthzProtocol::Http),
            "https" => Ok(AuthzProtocol::Https),
            other => Err(format!("unsupported protocol {other:?}, expected grpc, http or https")),
        }
    }
}

/// Connection and behaviour settings for the external authorizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalAuthzConfig {
    pub host: String,
    pub port: u16,

    /// Allow traffic when the authorizer cannot be reached.
    pub failure_mode_allow: bool,

    pub max_request_bytes: u32,

    /// Check timeout in milliseconds.
    pub timeout: u32,

    pub protocol: AuthzProtocol,

    /// Send the buffered body as raw bytes. gRPC only.
    pub pack_as_bytes: bool,

    /// Prefix prepended to the checked path (HTTP authorizers).
    pub path_prefix: String,
}

impl Default for ExternalAuthzConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            failure_mode_allow: false,
            max_request_bytes: 8192,
            timeout: 2000,
            protocol: AuthzProtocol::Grpc,
            pack_as_bytes: false,
            path_prefix: String::new(),
        }
    }
}

/// External authorization switch plus its settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalAuthz {
    pub enabled: bool,
    pub config: ExternalAuthzConfig,
}

impl ExternalAuthz {
    /// Read the `extauthz-*` keys of a routing section. A non-empty host
    /// enables authorization.
    pub fn from_section(raw: &RawSection) -> Result<Self, ConfigError> {
        let mut authz = ExternalAuthz::default();

        let Some(host) = raw.get(HOST_KEY) else {
            return Ok(authz);
        };
        let (host_name, port) = split_host_port(host)
            .ok_or_else(|| raw.invalid(HOST_KEY, host, "expected host:port"))?;

        let config = &mut authz.config;
        config.host = host_name;
        config.port = port;
        if let Some(allow) = raw.parse_bool(FAILURE_MODE_ALLOW_KEY)? {
            config.failure_mode_allow = allow;
        }
        if let Some(bytes) = raw.parse::<u32>(MAX_REQUEST_BYTES_KEY)? {
            config.max_request_bytes = bytes;
        }
        if let Some(timeout) = raw.parse::<u32>(TIMEOUT_KEY)? {
            config.timeout = timeout;
        }
        if let Some(protocol) = raw.parse::<AuthzProtocol>(PROTOCOL_KEY)? {
            config.protocol = protocol;
        }
        if let Some(pack) = raw.parse_bool(PACK_AS_BYTES_KEY)? {
            config.pack_as_bytes = pack;
        }
        if let Some(prefix) = raw.get(PATH_PREFIX_KEY) {
            config.path_prefix = prefix.to_string();
        }

        authz.enabled = true;
        Ok(authz)
    }

    /// Upstream cluster for the authorizer.
    pub fn cluster(&self) -> Cluster {
        external_authz_cluster(&self.config)
    }

    /// Authorization filter for the connection manager's filter chain.
    pub fn http_filter(&self) -> Result<HttpFilter, ExtAuthzError> {
        external_authz_filter(&self.config)
    }
}

fn external_authz_cluster(conf: &ExternalAuthzConfig) -> Cluster {
    Cluster::strict_dns(
        EXT_AUTHZ_CLUSTER_NAME,
        conf.host.clone(),
        conf.port,
        CONNECT_TIMEOUT,
        conf.protocol.upstream_http_protocol(),
    )
}

fn authorizer_uri(conf: &ExternalAuthzConfig) -> String {
    if conf.host.contains(':') {
        format!("{}://[{}]:{}", conf.protocol, conf.host, conf.port)
    } else {
        format!("{}://{}:{}", conf.protocol, conf.host, conf.port)
    }
}

fn external_authz_filter(conf: &ExternalAuthzConfig) -> Result<HttpFilter, ExtAuthzError> {
    if conf.pack_as_bytes && conf.protocol != AuthzProtocol::Grpc {
        return Err(ExtAuthzError::PackAsBytesRequiresGrpc {
            protocol: conf.protocol,
        });
    }

    let timeout = Duration::from_millis(u64::from(conf.timeout));
    let headers = vec![HeaderValue::new(CLIENT_HEADER.0, CLIENT_HEADER.1)];

    let services = match conf.protocol {
        AuthzProtocol::Grpc => ExtAuthzService::Grpc(GrpcService {
            envoy_grpc: EnvoyGrpc {
                cluster_name: EXT_AUTHZ_CLUSTER_NAME.to_string(),
            },
            timeout,
            initial_metadata: headers,
        }),
        AuthzProtocol::Http | AuthzProtocol::Https => ExtAuthzService::Http(HttpService {
            server_uri: HttpUri {
                uri: authorizer_uri(conf),
                cluster: EXT_AUTHZ_CLUSTER_NAME.to_string(),
                timeout,
            },
            path_prefix: conf.path_prefix.clone(),
            authorization_request: AuthorizationRequest {
                headers_to_add: headers,
            },
        }),
    };

    Ok(HttpFilter::ext_authz(ExtAuthz {
        transport_api_version: ApiVersion::V3,
        failure_mode_allow: conf.failure_mode_allow,
        with_request_body: BufferSettings {
            max_request_bytes: conf.max_request_bytes,
            allow_partial_message: true,
            pack_as_bytes: conf.pack_as_bytes,
        },
        clear_route_cache: false,
        services,
    }))
}

//! Routing section (`config-kourier`) schema.
//!
//! A new `KourierConfig` is built on every section change and never mutated
//! after it is published.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ext_authz::ExternalAuthz;
use crate::config::loader::{split_host_port, ConfigError, RawSection};
use crate::config::validation::validate_kourier;

/// Section name of the routing configuration.
pub const KOURIER_CONFIG_NAME: &str = "config-kourier";

/// Host matched by the internal status virtual host.
pub const INTERNAL_KOURIER_DOMAIN: &str = "internalkourier";

const ENABLE_SERVICE_ACCESS_LOGGING_KEY: &str = "enable-service-access-logging";
const SERVICE_ACCESS_LOG_TEMPLATE_KEY: &str = "service-access-log-template";
const ENABLE_PROXY_PROTOCOL_KEY: &str = "enable-proxy-protocol";
const CLUSTER_CERT_SECRET_KEY: &str = "cluster-cert-secret";
const DISABLE_ENVOY_SERVER_HEADER_KEY: &str = "disable-envoy-server-header";
const IDLE_TIMEOUT_KEY: &str = "stream-idle-timeout";
const TRUSTED_HOPS_COUNT_KEY: &str = "trusted-hops-count";
const USE_REMOTE_ADDRESS_KEY: &str = "use-remote-address";
const CIPHER_SUITES_KEY: &str = "cipher-suites";
const TRACING_COLLECTOR_FULL_ENDPOINT_KEY: &str = "tracing-collector-full-endpoint";

/// Zipkin tracing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tracing {
    pub enabled: bool,
    pub collector_host: String,
    pub collector_port: u16,
    /// Path spans are posted to, e.g. `/api/v2/spans`.
    pub collector_endpoint: String,
}

impl Tracing {
    /// Parse a `host:port/path` collector endpoint.
    fn from_full_endpoint(raw: &RawSection, value: &str) -> Result<Self, ConfigError> {
        let (authority, path) = match value.find('/') {
            Some(idx) => value.split_at(idx),
            None => (value, ""),
        };
        let (collector_host, collector_port) = split_host_port(authority)
            .ok_or_else(|| raw.invalid(TRACING_COLLECTOR_FULL_ENDPOINT_KEY, value, "expected host:port/path"))?;

        Ok(Self {
            enabled: true,
            collector_host,
            collector_port,
            collector_endpoint: path.to_string(),
        })
    }
}

/// Routing behaviour options.
///
/// `Default` is the zeroed record: every flag off, no timeouts, external
/// authorization disabled with its default settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KourierConfig {
    pub enable_service_access_logging: bool,

    /// Custom access log format string.
    pub service_access_log_template: Option<String>,

    pub enable_proxy_protocol: bool,

    /// Secret holding the certificate served by the TLS listener.
    pub cluster_cert_secret: Option<String>,

    /// Suppress the `server` response header set by the proxy.
    pub disable_envoy_server_header: bool,

    /// Stream idle timeout; zero disables it.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Number of trusted forwarding hops in `x-forwarded-for`.
    pub trusted_hops_count: u32,

    pub use_remote_address: bool,

    pub cipher_suites: BTreeSet<String>,

    pub tracing: Tracing,

    pub external_authz: ExternalAuthz,
}

impl KourierConfig {
    /// Build a record from a raw routing section.
    ///
    /// Absent keys keep their defaults; access logging defaults to on.
    pub fn from_section(raw: &RawSection) -> Result<Self, ConfigError> {
        let mut config = KourierConfig {
            enable_service_access_logging: true,
            ..Default::default()
        };

        if let Some(v) = raw.parse_bool(ENABLE_SERVICE_ACCESS_LOGGING_KEY)? {
            config.enable_service_access_logging = v;
        }
        config.service_access_log_template = raw.get(SERVICE_ACCESS_LOG_TEMPLATE_KEY).map(str::to_string);
        if let Some(v) = raw.parse_bool(ENABLE_PROXY_PROTOCOL_KEY)? {
            config.enable_proxy_protocol = v;
        }
        config.cluster_cert_secret = raw.get(CLUSTER_CERT_SECRET_KEY).map(str::to_string);
        if let Some(v) = raw.parse_bool(DISABLE_ENVOY_SERVER_HEADER_KEY)? {
            config.disable_envoy_server_header = v;
        }
        if let Some(v) = raw.parse_duration(IDLE_TIMEOUT_KEY)? {
            config.idle_timeout = v;
        }
        if let Some(v) = raw.parse::<u32>(TRUSTED_HOPS_COUNT_KEY)? {
            config.trusted_hops_count = v;
        }
        if let Some(v) = raw.parse_bool(USE_REMOTE_ADDRESS_KEY)? {
            config.use_remote_address = v;
        }
        config.cipher_suites = raw.parse_list(CIPHER_SUITES_KEY).into_iter().collect();
        if let Some(endpoint) = raw.get(TRACING_COLLECTOR_FULL_ENDPOINT_KEY) {
            config.tracing = Tracing::from_full_endpoint(raw, endpoint)?;
        }
        config.external_authz = ExternalAuthz::from_section(raw)?;

        validate_kourier(&config).map_err(|errors| ConfigError::Validation {
            section: raw.name.clone(),
            errors,
        })?;

        Ok(config)
    }
}

//! HTTP connection manager assembly.
//!
//! # Filter chain
//! ```text
//! [ext_authz]  (only when external authorization is enabled)
//!  router      (always present, always last)
//! ```

use std::time::Duration;

use serde::Serialize;

use crate::config::ext_authz::ExtAuthzError;
use crate::config::kourier::KourierConfig;
use crate::envoy::core::{proto_duration, ConfigSource, DataSource};
use crate::envoy::filter::HttpFilter;
use crate::envoy::{FILE_ACCESS_LOG, ZIPKIN};

/// Cluster the Zipkin tracer ships spans to.
pub const TRACING_COLLECTOR_CLUSTER: &str = "tracing-collector";

const STAT_PREFIX: &str = "ingress_http";
const ACCESS_LOG_PATH: &str = "/dev/stdout";
const RDS_INITIAL_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodecType {
    #[default]
    Auto,
    Http1,
    Http2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerHeaderTransformation {
    #[default]
    Overwrite,
    AppendIfAbsent,
    PassThrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rds {
    pub config_source: ConfigSource,
    pub route_config_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionFormatString {
    pub text_format_source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAccessLog {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<SubstitutionFormatString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum AccessLogConfig {
    #[serde(rename = "type.googleapis.com/envoy.extensions.access_loggers.file.v3.FileAccessLog")]
    File(FileAccessLog),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessLog {
    pub name: String,
    pub typed_config: AccessLogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectorEndpointVersion {
    HttpJson,
    HttpProto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipkinConfig {
    pub collector_cluster: String,
    pub collector_endpoint: String,
    pub shared_span_context: bool,
    pub collector_endpoint_version: CollectorEndpointVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum TracerConfig {
    #[serde(rename = "type.googleapis.com/envoy.config.trace.v3.ZipkinConfig")]
    Zipkin(ZipkinConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TracingProvider {
    pub name: String,
    pub typed_config: TracerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HcmTracing {
    pub provider: TracingProvider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpConnectionManager {
    pub codec_type: CodecType,
    pub stat_prefix: String,
    pub http_filters: Vec<HttpFilter>,
    pub rds: Rds,
    #[serde(serialize_with = "proto_duration::serialize")]
    pub stream_idle_timeout: Duration,
    pub xff_num_trusted_hops: u32,
    pub use_remote_address: bool,
    pub server_header_transformation: ServerHeaderTransformation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access_log: Vec<AccessLog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_request_id: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracing: Option<HcmTracing>,
}

/// Create a connection manager that points at the named route table.
///
/// Fails only when the external authorization filter cannot be built.
pub fn new_http_connection_manager(
    route_config_name: &str,
    config: &KourierConfig,
) -> Result<HttpConnectionManager, ExtAuthzError> {
    let mut http_filters = Vec::with_capacity(2);
    if config.external_authz.enabled {
        http_filters.push(config.external_authz.http_filter()?);
    }
    http_filters.push(HttpFilter::router());

    let mut mgr = HttpConnectionManager {
        codec_type: CodecType::Auto,
        stat_prefix: STAT_PREFIX.to_string(),
        http_filters,
        rds: Rds {
            config_source: ConfigSource::ads(Some(RDS_INITIAL_FETCH_TIMEOUT)),
            route_config_name: route_config_name.to_string(),
        },
        stream_idle_timeout: config.idle_timeout,
        xff_num_trusted_hops: config.trusted_hops_count,
        use_remote_address: config.use_remote_address,
        server_header_transformation: ServerHeaderTransformation::Overwrite,
        access_log: Vec::new(),
        generate_request_id: None,
        tracing: None,
    };

    // The proxy protocol header carries the real peer address; forwarded
    // headers must not override it.
    if config.enable_proxy_protocol {
        mgr.use_remote_address = true;
    }

    if config.disable_envoy_server_header {
        mgr.server_header_transformation = ServerHeaderTransformation::PassThrough;
    }

    if config.enable_service_access_logging {
        let log_format = config
            .service_access_log_template
            .as_ref()
            .map(|template| SubstitutionFormatString {
                text_format_source: DataSource {
                    inline_string: template.clone(),
                },
            });
        mgr.access_log.push(AccessLog {
            name: FILE_ACCESS_LOG.to_string(),
            typed_config: AccessLogConfig::File(FileAccessLog {
                path: ACCESS_LOG_PATH.to_string(),
                log_format,
            }),
        });
    }

    if config.tracing.enabled {
        mgr.generate_request_id = Some(true);
        mgr.tracing = Some(HcmTracing {
            provider: TracingProvider {
                name: ZIPKIN.to_string(),
                typed_config: TracerConfig::Zipkin(ZipkinConfig {
                    collector_cluster: TRACING_COLLECTOR_CLUSTER.to_string(),
                    collector_endpoint: config.tracing.collector_endpoint.clone(),
                    shared_span_context: false,
                    collector_endpoint_version: CollectorEndpointVersion::HttpJson,
                }),
            },
        });
    }

    tracing::debug!(
        route_config = route_config_name,
        filters = mgr.http_filters.len(),
        use_remote_address = mgr.use_remote_address,
        "Built HTTP connection manager"
    );

    Ok(mgr)
}

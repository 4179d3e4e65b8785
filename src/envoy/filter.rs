//! HTTP filter descriptors for the connection manager's filter chain.

use std::time::Duration;

use serde::Serialize;

use crate::envoy::core::{proto_duration, ApiVersion, HeaderValue};
use crate::envoy::{HTTP_EXTERNAL_AUTHORIZATION, ROUTER};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpFilter {
    pub name: String,
    pub typed_config: HttpFilterConfig,
}

impl HttpFilter {
    /// The terminal router filter.
    pub fn router() -> Self {
        Self {
            name: ROUTER.to_string(),
            typed_config: HttpFilterConfig::Router(Router {}),
        }
    }

    pub fn ext_authz(config: ExtAuthz) -> Self {
        Self {
            name: HTTP_EXTERNAL_AUTHORIZATION.to_string(),
            typed_config: HttpFilterConfig::ExtAuthz(Box::new(config)),
        }
    }

    pub fn is_router(&self) -> bool {
        matches!(self.typed_config, HttpFilterConfig::Router(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum HttpFilterConfig {
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.http.ext_authz.v3.ExtAuthz")]
    ExtAuthz(Box<ExtAuthz>),
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router")]
    Router(Router),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Router {}

/// Request body buffering for the authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferSettings {
    pub max_request_bytes: u32,
    pub allow_partial_message: bool,
    pub pack_as_bytes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvoyGrpc {
    pub cluster_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrpcService {
    pub envoy_grpc: EnvoyGrpc,
    #[serde(serialize_with = "proto_duration::serialize")]
    pub timeout: Duration,
    pub initial_metadata: Vec<HeaderValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpUri {
    pub uri: String,
    pub cluster: String,
    #[serde(serialize_with = "proto_duration::serialize")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationRequest {
    pub headers_to_add: Vec<HeaderValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpService {
    pub server_uri: HttpUri,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path_prefix: String,
    pub authorization_request: AuthorizationRequest,
}

/// How the authorization filter reaches the authorizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExtAuthzService {
    #[serde(rename = "grpc_service")]
    Grpc(GrpcService),
    #[serde(rename = "http_service")]
    Http(HttpService),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtAuthz {
    pub transport_api_version: ApiVersion,
    pub failure_mode_allow: bool,
    pub with_request_body: BufferSettings,
    pub clear_route_cache: bool,
    #[serde(flatten)]
    pub services: ExtAuthzService,
}

/// Per-route override of the authorization filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtAuthzPerRoute {
    pub disabled: bool,
}

/// Per-filter configuration attached to a virtual host or route, keyed by
/// filter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "@type")]
pub enum FilterOverride {
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.http.ext_authz.v3.ExtAuthzPerRoute")]
    ExtAuthzPerRoute(ExtAuthzPerRoute),
}

impl FilterOverride {
    pub fn ext_authz_disabled() -> Self {
        Self::ExtAuthzPerRoute(ExtAuthzPerRoute { disabled: true })
    }
}

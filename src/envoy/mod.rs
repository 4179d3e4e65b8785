//! Envoy v3 descriptor model.
//!
//! # Data Flow
//! ```text
//! KourierConfig
//!     → connection_manager.rs (filter chain, RDS reference, headers, logs, tracing)
//!     → listener.rs (wrap manager, proxy protocol, downstream TLS)
//!
//! VirtualHost[] (built by the caller)
//!     → route.rs (RouteConfiguration, cluster validation on)
//!
//! ExternalAuthz / tracing settings
//!     → cluster.rs (strict-DNS upstream clusters)
//! ```
//!
//! # Design Decisions
//! - Descriptors are plain owned values, rebuilt on every pass
//! - Serialized with Envoy's JSON field names; typed configs carry `@type`
//! - Discovery wire encoding lives with the publisher, not here

pub mod cluster;
pub mod connection_manager;
pub mod core;
pub mod filter;
pub mod listener;
pub mod route;

pub use cluster::Cluster;
pub use connection_manager::{new_http_connection_manager, HttpConnectionManager};
pub use filter::HttpFilter;
pub use listener::{new_http_listener, new_https_listener, Listener};
pub use route::{new_route, new_route_config, new_virtual_host, new_weighted_cluster, RouteConfiguration, VirtualHost};

// Well-known extension names.
pub const HTTP_EXTERNAL_AUTHORIZATION: &str = "envoy.filters.http.ext_authz";
pub const ROUTER: &str = "envoy.filters.http.router";
pub const HTTP_CONNECTION_MANAGER: &str = "envoy.filters.network.http_connection_manager";
pub const PROXY_PROTOCOL: &str = "envoy.filters.listener.proxy_protocol";
pub const TLS_TRANSPORT_SOCKET: &str = "envoy.transport_sockets.tls";
pub const ZIPKIN: &str = "envoy.tracers.zipkin";
pub const FILE_ACCESS_LOG: &str = "envoy.file_access_log";

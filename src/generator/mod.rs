//! Descriptor generation.
//!
//! # Data Flow
//! ```text
//! Context (bound Config)
//!     → KourierConfig
//!     → connection manager (ext_authz? → router)
//!     → HTTP listener (+ HTTPS listener when a cluster cert secret is set)
//!     → route table = caller's virtual hosts + status virtual host
//!     → clusters = caller's clusters + authz/collector clusters
//!     → ResourceSet::validate (every route target exists)
//! ```
//!
//! # Design Decisions
//! - Stateless: every pass allocates fresh descriptors
//! - Any error aborts the pass; nothing partial is returned

pub mod collector;
pub mod resources;
pub mod status_vhost;

use thiserror::Error;

use crate::config::context::{from_context, Context, ContextError};
use crate::config::ext_authz::ExtAuthzError;
use crate::config::kourier::KourierConfig;
use crate::envoy::cluster::Cluster;
use crate::envoy::connection_manager::new_http_connection_manager;
use crate::envoy::listener::{new_http_listener, new_https_listener, DownstreamTlsContext};
use crate::envoy::route::{new_route_config, VirtualHost};
use crate::observability::metrics;

pub use resources::ResourceSet;
pub use status_vhost::status_vhost;

/// Errors that abort a generation pass.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    ExtAuthz(#[from] ExtAuthzError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("route '{route}' in '{route_config}' references unknown cluster '{cluster}'")]
    MissingCluster {
        route_config: String,
        route: String,
        cluster: String,
    },
}

impl GeneratorError {
    /// Whether retrying the pass with the same configuration can succeed.
    ///
    /// A missing cluster clears once the caller supplies it; the other kinds
    /// need a configuration change.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GeneratorError::MissingCluster { .. })
    }

    fn reason(&self) -> &'static str {
        match self {
            GeneratorError::ExtAuthz(_) => "ext_authz",
            GeneratorError::Context(_) => "context",
            GeneratorError::MissingCluster { .. } => "missing_cluster",
        }
    }
}

/// Listener layout of the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySpec {
    pub route_config_name: String,
    pub http_port: u16,
    pub https_port: u16,
}

impl Default for GatewaySpec {
    fn default() -> Self {
        Self {
            route_config_name: "external_services".to_string(),
            http_port: 8080,
            https_port: 8443,
        }
    }
}

/// Build every resource for one pass from the configuration bound to `ctx`.
pub fn generate_for_pass(
    ctx: &Context,
    spec: &GatewaySpec,
    virtual_hosts: Vec<VirtualHost>,
    clusters: Vec<Cluster>,
) -> Result<ResourceSet, GeneratorError> {
    let config = from_context(ctx).inspect_err(|e| {
        metrics::record_generation_failure("context");
        tracing::error!(error = %e, "Generation pass started without a bound configuration");
    })?;
    generate(&config.kourier, spec, virtual_hosts, clusters)
}

/// Build every resource for one pass.
pub fn generate(
    config: &KourierConfig,
    spec: &GatewaySpec,
    virtual_hosts: Vec<VirtualHost>,
    clusters: Vec<Cluster>,
) -> Result<ResourceSet, GeneratorError> {
    build(config, spec, virtual_hosts, clusters).inspect_err(|e| {
        metrics::record_generation_failure(e.reason());
        tracing::error!(
            route_config = %spec.route_config_name,
            error = %e,
            "Generation pass aborted"
        );
    })
}

fn build(
    config: &KourierConfig,
    spec: &GatewaySpec,
    mut virtual_hosts: Vec<VirtualHost>,
    clusters: Vec<Cluster>,
) -> Result<ResourceSet, GeneratorError> {
    let mut resources = ResourceSet::for_config(config);
    for cluster in clusters {
        resources.add_cluster(cluster);
    }

    let manager = new_http_connection_manager(&spec.route_config_name, config)?;

    if let Some(secret) = &config.cluster_cert_secret {
        let tls = DownstreamTlsContext::from_secret(secret.clone(), &config.cipher_suites);
        resources.add_listener(new_https_listener(
            manager.clone(),
            spec.https_port,
            config.enable_proxy_protocol,
            tls,
        ));
    }
    resources.add_listener(new_http_listener(
        manager,
        spec.http_port,
        config.enable_proxy_protocol,
    ));

    virtual_hosts.push(status_vhost());
    resources.add_route_config(new_route_config(spec.route_config_name.clone(), virtual_hosts));

    resources.validate()?;

    tracing::debug!(
        listeners = resources.listeners.len(),
        routes = resources.routes.len(),
        clusters = resources.clusters.len(),
        "Generated resources"
    );
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::context::to_context;
    use crate::config::store::Config;

    #[test]
    fn test_generate_minimal() {
        let resources = generate(&KourierConfig::default(), &GatewaySpec::default(), Vec::new(), Vec::new())
            .unwrap();

        assert_eq!(resources.listeners.len(), 1);
        assert_eq!(resources.listeners[0].name, "listener_8080");
        assert_eq!(resources.routes.len(), 1);
        assert!(resources.routes[0].validate_clusters);
        assert_eq!(resources.routes[0].virtual_hosts.len(), 1);
        assert!(resources.clusters.is_empty());
    }

    #[test]
    fn test_https_listener_with_cert_secret() {
        let config = KourierConfig {
            cluster_cert_secret: Some("kourier-cert".into()),
            ..Default::default()
        };
        let resources = generate(&config, &GatewaySpec::default(), Vec::new(), Vec::new()).unwrap();

        let names: Vec<_> = resources.listeners.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["listener_8443", "listener_8080"]);
    }

    #[test]
    fn test_unbound_context_aborts_pass() {
        let err = generate_for_pass(&Context::background(), &GatewaySpec::default(), Vec::new(), Vec::new())
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Context(ContextError::NotBound)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_cluster_is_not_fatal() {
        let err = GeneratorError::MissingCluster {
            route_config: "rc".into(),
            route: "r".into(),
            cluster: "c".into(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_generate_for_bound_context() {
        let mut config = Config::default();
        config.kourier.trusted_hops_count = 1;
        let ctx = to_context(&Context::background(), config);

        let resources = generate_for_pass(&ctx, &GatewaySpec::default(), Vec::new(), Vec::new()).unwrap();
        let mgr = resources.listeners[0].connection_managers().next().unwrap();
        assert_eq!(mgr.xff_num_trusted_hops, 1);
    }
}

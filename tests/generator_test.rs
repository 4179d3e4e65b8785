//! End-to-end generation: stored configuration to Envoy resources.

use std::time::Duration;

use kourier_control::config::ext_authz::EXT_AUTHZ_CLUSTER_NAME;
use kourier_control::config::loader::{load_section_dir, RawSection};
use kourier_control::config::{Context, ExtAuthzError, KourierConfig, Store, KOURIER_CONFIG_NAME};
use kourier_control::envoy::cluster::{DiscoveryType, UpstreamHttpProtocol};
use kourier_control::envoy::connection_manager::{ServerHeaderTransformation, TRACING_COLLECTOR_CLUSTER};
use kourier_control::envoy::{new_http_connection_manager, HTTP_EXTERNAL_AUTHORIZATION, ROUTER};
use kourier_control::generator::{generate, generate_for_pass, GatewaySpec, GeneratorError};

mod common;

fn store_with(section: RawSection) -> Store {
    let store = Store::new();
    store.on_source_changed(&section).unwrap();
    store
}

#[test]
fn test_proxy_protocol_forces_remote_address() {
    let store = store_with(
        RawSection::new(KOURIER_CONFIG_NAME)
            .with("enable-proxy-protocol", "true")
            .with("use-remote-address", "false"),
    );
    let ctx = store.to_context(&Context::background());
    let resources = generate_for_pass(&ctx, &GatewaySpec::default(), Vec::new(), Vec::new()).unwrap();

    let listener = &resources.listeners[0];
    assert_eq!(listener.listener_filters.len(), 1);
    let mgr = listener.connection_managers().next().unwrap();
    assert!(mgr.use_remote_address);
}

#[test]
fn test_http_authz_with_pack_as_bytes_aborts_pass() {
    let store = store_with(common::authz_section("http", true));
    let ctx = store.to_context(&Context::background());

    let err = generate_for_pass(&ctx, &GatewaySpec::default(), Vec::new(), Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        GeneratorError::ExtAuthz(ExtAuthzError::PackAsBytesRequiresGrpc { .. })
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_authz_filter_precedes_router() {
    for protocol in ["grpc", "http", "https"] {
        let store = store_with(common::authz_section(protocol, false));
        let config = store.load();
        let mgr = new_http_connection_manager("external_services", &config.kourier).unwrap();

        assert!(mgr.http_filters.len() >= 2, "protocol {protocol}");
        assert_eq!(mgr.http_filters[0].name, HTTP_EXTERNAL_AUTHORIZATION);
        let last = mgr.http_filters.last().unwrap();
        assert_eq!(last.name, ROUTER);
        assert!(last.is_router());
    }
}

#[test]
fn test_grpc_authz_cluster() {
    let section = RawSection::new(KOURIER_CONFIG_NAME)
        .with("extauthz-host", "h:9000")
        .with("extauthz-protocol", "grpc");
    let config = store_with(section).load();

    let cluster = config.kourier.external_authz.cluster();
    assert_eq!(cluster.name, EXT_AUTHZ_CLUSTER_NAME);
    assert_eq!(cluster.discovery_type, DiscoveryType::StrictDns);
    assert_eq!(cluster.connect_timeout, Duration::from_secs(5));
    assert_eq!(cluster.upstream_http_protocol(), Some(UpstreamHttpProtocol::Http2));

    let addresses: Vec<_> = cluster.endpoint_addresses().collect();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].socket_address.address, "h");
    assert_eq!(addresses[0].socket_address.port_value, 9000);
}

#[test]
fn test_fixture_config_renders_full_gateway() {
    let store = Store::new();
    for section in load_section_dir(&common::testdata_dir()).unwrap() {
        store.on_source_changed(&section).unwrap();
    }
    let ctx = store.to_context(&Context::background());

    let resources = generate_for_pass(
        &ctx,
        &GatewaySpec::default(),
        vec![common::backend_vhost("hello.example.com", "hello")],
        vec![common::backend_cluster("hello")],
    )
    .unwrap();

    let names: Vec<_> = resources.listeners.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["listener_8443", "listener_8080"]);
    assert!(resources.listeners[0].filter_chains[0].transport_socket.is_some());

    for listener in &resources.listeners {
        let mgr = listener.connection_managers().next().unwrap();
        assert_eq!(mgr.http_filters[0].name, HTTP_EXTERNAL_AUTHORIZATION);
        assert_eq!(mgr.xff_num_trusted_hops, 1);
        assert_eq!(mgr.stream_idle_timeout, Duration::from_secs(300));
        assert_eq!(mgr.server_header_transformation, ServerHeaderTransformation::PassThrough);
        assert_eq!(mgr.access_log.len(), 1);
        assert_eq!(mgr.generate_request_id, Some(true));
        assert!(mgr.tracing.is_some());
    }

    assert!(resources.cluster("hello").is_some());
    assert!(resources.cluster(EXT_AUTHZ_CLUSTER_NAME).is_some());
    assert!(resources.cluster(TRACING_COLLECTOR_CLUSTER).is_some());

    let route_config = &resources.routes[0];
    assert_eq!(route_config.name, "external_services");
    assert!(route_config.validate_clusters);
    let domains: Vec<_> = route_config.virtual_hosts.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(domains, vec!["hello.example.com", "internalkourier"]);

    let json = serde_json::to_value(&resources).unwrap();
    let hcm = &json["listeners"][1]["filter_chains"][0]["filters"][0]["typed_config"];
    assert_eq!(hcm["stream_idle_timeout"], "300s");
    assert_eq!(hcm["http_filters"][0]["typed_config"]["grpc_service"]["timeout"], "1.500s");
    let vhost = &json["routes"][0]["virtual_hosts"][0];
    assert_eq!(vhost["routes"][0]["route"]["timeout"], "30s");
}

#[test]
fn test_missing_backend_cluster_is_reported() {
    let err = generate(
        &KourierConfig::default(),
        &GatewaySpec::default(),
        vec![common::backend_vhost("hello.example.com", "hello")],
        Vec::new(),
    )
    .unwrap_err();

    match &err {
        GeneratorError::MissingCluster { route, cluster, .. } => {
            assert_eq!(route, "hello.example.com-root");
            assert_eq!(cluster, "hello");
        }
        other => panic!("expected missing cluster, got {other:?}"),
    }
    assert!(!err.is_fatal());
}

#[test]
fn test_resources_serialize_with_envoy_field_names() {
    let config = store_with(common::authz_section("grpc", true)).load();
    let resources = generate(&config.kourier, &GatewaySpec::default(), Vec::new(), Vec::new()).unwrap();

    let json = serde_json::to_value(&resources).unwrap();

    let listener = &json["listeners"][0];
    assert_eq!(listener["address"]["socket_address"]["port_value"], 8080);
    let hcm = &listener["filter_chains"][0]["filters"][0]["typed_config"];
    assert_eq!(
        hcm["@type"],
        "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager"
    );
    assert_eq!(hcm["rds"]["route_config_name"], "external_services");

    let authz = &hcm["http_filters"][0]["typed_config"];
    assert_eq!(authz["grpc_service"]["envoy_grpc"]["cluster_name"], EXT_AUTHZ_CLUSTER_NAME);
    assert_eq!(authz["with_request_body"]["pack_as_bytes"], true);
    assert_eq!(authz["transport_api_version"], "V3");

    let cluster = &json["clusters"][0];
    assert_eq!(cluster["name"], EXT_AUTHZ_CLUSTER_NAME);
    assert_eq!(cluster["type"], "STRICT_DNS");

    let route = &json["routes"][0]["virtual_hosts"][0]["routes"][0];
    assert_eq!(route["match"]["prefix"], "/ready");
}

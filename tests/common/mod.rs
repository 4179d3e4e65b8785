//! Shared fixtures for integration tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kourier_control::config::loader::RawSection;
use kourier_control::config::KOURIER_CONFIG_NAME;
use kourier_control::envoy::cluster::{Cluster, UpstreamHttpProtocol};
use kourier_control::envoy::route::{new_route, new_virtual_host, new_weighted_cluster, VirtualHost};

/// Directory holding the TOML section fixtures.
pub fn testdata_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("testdata")
}

/// Copy every fixture section into `dir`.
#[allow(dead_code)]
pub fn copy_testdata(dir: &Path) {
    for entry in std::fs::read_dir(testdata_dir()).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, dir.join(path.file_name().unwrap())).unwrap();
    }
}

/// A routing section that enables external authorization.
#[allow(dead_code)]
pub fn authz_section(protocol: &str, pack_as_bytes: bool) -> RawSection {
    RawSection::new(KOURIER_CONFIG_NAME)
        .with("extauthz-host", "authz.auth:9000")
        .with("extauthz-protocol", protocol)
        .with("extauthz-pack-as-bytes", pack_as_bytes.to_string())
}

/// A backend cluster named `name` listening on port 80.
#[allow(dead_code)]
pub fn backend_cluster(name: &str) -> Cluster {
    Cluster::strict_dns(
        name,
        format!("{name}.default.svc.cluster.local"),
        80,
        Duration::from_secs(5),
        UpstreamHttpProtocol::Http2,
    )
}

/// A virtual host routing `/` on `domain` to `cluster`.
#[allow(dead_code)]
pub fn backend_vhost(domain: &str, cluster: &str) -> VirtualHost {
    let route = new_route(
        format!("{domain}-root"),
        Vec::new(),
        "/",
        vec![new_weighted_cluster(cluster, 100, BTreeMap::new())],
        Duration::from_secs(30),
        BTreeMap::new(),
        None,
    );
    new_virtual_host(domain, vec![domain.to_string()], vec![route])
}

//! Shared descriptor pieces: addresses, headers, config sources.

use std::time::Duration;

use serde::Serialize;

/// xDS transport/resource API version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiVersion {
    #[default]
    V3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketProtocol {
    #[default]
    Tcp,
    Udp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketAddress {
    pub protocol: SocketProtocol,
    pub address: String,
    pub port_value: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ipv4_compat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub socket_address: SocketAddress,
}

impl Address {
    /// TCP socket address.
    pub fn tcp(address: impl Into<String>, port: u16) -> Self {
        Self {
            socket_address: SocketAddress {
                protocol: SocketProtocol::Tcp,
                address: address.into(),
                port_value: u32::from(port),
                ipv4_compat: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderValue {
    pub key: String,
    pub value: String,
}

impl HeaderValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderValueOption {
    pub header: HeaderValue,
    pub append: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedConfigSource {}

/// Where the data plane fetches a dynamically discovered resource from.
/// Only the aggregated (ADS) stream is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSource {
    pub resource_api_version: ApiVersion,
    pub ads: AggregatedConfigSource,
    #[serde(serialize_with = "proto_duration::serialize_opt", skip_serializing_if = "Option::is_none")]
    pub initial_fetch_timeout: Option<Duration>,
}

impl ConfigSource {
    pub fn ads(initial_fetch_timeout: Option<Duration>) -> Self {
        Self {
            resource_api_version: ApiVersion::V3,
            ads: AggregatedConfigSource {},
            initial_fetch_timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSource {
    pub inline_string: String,
}

/// Durations in protobuf JSON form: whole seconds with an optional 3, 6 or
/// 9 digit fraction, suffixed with `s` (`"300s"`, `"1.500s"`).
pub mod proto_duration {
    use std::time::Duration;

    use serde::Serializer;

    pub fn format(duration: &Duration) -> String {
        let secs = duration.as_secs();
        let nanos = duration.subsec_nanos();
        if nanos == 0 {
            format!("{secs}s")
        } else if nanos % 1_000_000 == 0 {
            format!("{secs}.{:03}s", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{secs}.{:06}s", nanos / 1_000)
        } else {
            format!("{secs}.{nanos:09}s")
        }
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(duration))
    }

    pub fn serialize_opt<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&format(d)),
            None => serializer.serialize_none(),
        }
    }
}

//! Shared network section (`config-network`) schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::loader::{ConfigError, RawSection};
use crate::config::validation::validate_network;

/// Section name of the shared network configuration.
pub const NETWORK_CONFIG_NAME: &str = "config-network";

pub const DEFAULT_INGRESS_CLASS: &str = "kourier.ingress.networking.knative.dev";

const SYSTEM_INTERNAL_TLS_KEY: &str = "system-internal-tls";
const INGRESS_CLASS_KEY: &str = "ingress-class";
const HTTP_PROTOCOL_KEY: &str = "http-protocol";
const DEFAULT_EXTERNAL_SCHEME_KEY: &str = "default-external-scheme";

/// Whether traffic between system components is encrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    Enabled,
    #[default]
    Disabled,
}

impl FromStr for Encryption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enabled" => Ok(Encryption::Enabled),
            "disabled" => Ok(Encryption::Disabled),
            other => Err(format!("expected enabled or disabled, got {other:?}")),
        }
    }
}

/// How plain HTTP is served on external routes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpProtocol {
    #[default]
    Enabled,
    Redirected,
    Disabled,
}

impl fmt::Display for HttpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpProtocol::Enabled => "enabled",
            HttpProtocol::Redirected => "redirected",
            HttpProtocol::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

impl FromStr for HttpProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enabled" => Ok(HttpProtocol::Enabled),
            "redirected" => Ok(HttpProtocol::Redirected),
            "disabled" => Ok(HttpProtocol::Disabled),
            other => Err(format!("expected enabled, redirected or disabled, got {other:?}")),
        }
    }
}

/// Network settings shared with other ingress implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub system_internal_tls: Encryption,
    pub ingress_class: String,
    pub http_protocol: HttpProtocol,
    pub default_external_scheme: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            system_internal_tls: Encryption::Disabled,
            ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            http_protocol: HttpProtocol::Enabled,
            default_external_scheme: "http".to_string(),
        }
    }
}

impl NetworkConfig {
    /// Build a record from a raw network section.
    pub fn from_section(raw: &RawSection) -> Result<Self, ConfigError> {
        let mut config = NetworkConfig::default();

        if let Some(v) = raw.parse::<Encryption>(SYSTEM_INTERNAL_TLS_KEY)? {
            config.system_internal_tls = v;
        }
        if let Some(v) = raw.get(INGRESS_CLASS_KEY) {
            config.ingress_class = v.to_string();
        }
        if let Some(v) = raw.parse::<HttpProtocol>(HTTP_PROTOCOL_KEY)? {
            config.http_protocol = v;
        }
        if let Some(v) = raw.get(DEFAULT_EXTERNAL_SCHEME_KEY) {
            config.default_external_scheme = v.to_ascii_lowercase();
        }

        validate_network(&config).map_err(|errors| ConfigError::Validation {
            section: raw.name.clone(),
            errors,
        })?;

        Ok(config)
    }

    pub fn system_internal_tls_enabled(&self) -> bool {
        self.system_internal_tls == Encryption::Enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert!(!config.system_internal_tls_enabled());
        assert_eq!(config.ingress_class, DEFAULT_INGRESS_CLASS);
        assert_eq!(config.http_protocol, HttpProtocol::Enabled);
    }

    #[test]
    fn test_from_section() {
        let raw = RawSection::new(NETWORK_CONFIG_NAME)
            .with(SYSTEM_INTERNAL_TLS_KEY, "Enabled")
            .with(HTTP_PROTOCOL_KEY, "redirected")
            .with(DEFAULT_EXTERNAL_SCHEME_KEY, "HTTPS");
        let config = NetworkConfig::from_section(&raw).unwrap();

        assert!(config.system_internal_tls_enabled());
        assert_eq!(config.http_protocol, HttpProtocol::Redirected);
        assert_eq!(config.default_external_scheme, "https");
        assert_eq!(config.ingress_class, DEFAULT_INGRESS_CLASS);
    }

    #[test]
    fn test_invalid_values() {
        let raw = RawSection::new(NETWORK_CONFIG_NAME).with(HTTP_PROTOCOL_KEY, "sometimes");
        assert!(matches!(
            NetworkConfig::from_section(&raw),
            Err(ConfigError::InvalidValue { .. })
        ));

        let raw = RawSection::new(NETWORK_CONFIG_NAME).with(DEFAULT_EXTERNAL_SCHEME_KEY, "ws");
        assert!(matches!(
            NetworkConfig::from_section(&raw),
            Err(ConfigError::Validation { .. })
        ));
    }
}

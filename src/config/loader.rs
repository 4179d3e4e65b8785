//! Raw configuration sections and their loading from disk.
//!
//! A section is a named string-to-string map, the same shape a ConfigMap
//! carries. Typed records are built from sections by their own constructors
//! (`KourierConfig::from_section`, `NetworkConfig::from_section`); the
//! helpers here only deal with lookup and scalar parsing.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Error type for configuration loading and parsing.
///
/// Every variant is recoverable: the store keeps the previous value of the
/// affected section and reports the error to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown configuration section '{0}'")]
    UnknownSection(String),

    #[error("Invalid value {value:?} for {section}/{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Validation failed for {section}: {}", join_errors(.errors))]
    Validation {
        section: String,
        errors: Vec<ValidationError>,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A named, unparsed configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSection {
    pub name: String,
    pub data: BTreeMap<String, String>,
}

impl RawSection {
    /// Create an empty section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly useful in tests and fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Look up a key. Blank values are treated as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Build an `InvalidValue` error for a key of this section.
    pub fn invalid(&self, key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.clone(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Parse a value with its `FromStr` implementation.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| self.invalid(key, raw, e.to_string())),
        }
    }

    /// Parse a boolean, accepting the usual spellings (`true`, `t`, `1`, ...).
    pub fn parse_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "t" | "true" => Ok(Some(true)),
                "0" | "f" | "false" => Ok(Some(false)),
                _ => Err(self.invalid(key, raw, "expected a boolean")),
            },
        }
    }

    /// Parse a human readable duration such as `300s`, `5m` or `1h30m`.
    pub fn parse_duration(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => humantime::parse_duration(raw)
                .map(Some)
                .map_err(|e| self.invalid(key, raw, e.to_string())),
        }
    }

    /// Parse a comma separated list, dropping blank entries.
    pub fn parse_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Split `host:port` into its parts. The port must be a non-zero `u16`.
///
/// IPv6 hosts must be bracketed (`[::1]:9000`); the brackets are stripped.
pub fn split_host_port(value: &str) -> Option<(String, u16)> {
    let (host, port) = value.rsplit_once(':')?;
    let host = match host.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']')?,
        None if host.contains(':') => return None,
        None => host,
    };
    if host.is_empty() {
        return None;
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some((host.to_string(), port)),
    }
}

/// Load a section from a TOML file. The file stem is the section name and
/// every top-level key must hold a scalar.
pub fn load_section_file(path: &Path) -> Result<RawSection, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let mut section = RawSection::new(name);

    for (key, value) in table {
        let value = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Datetime(d) => d.to_string(),
            other => {
                return Err(section.invalid(&key, &other.to_string(), "expected a scalar value"));
            }
        };
        section.data.insert(key, value);
    }

    Ok(section)
}

/// Load every `*.toml` section file in a directory, sorted by file name.
pub fn load_section_dir(dir: &Path) -> Result<Vec<RawSection>, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if is_section_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|p| load_section_file(p)).collect()
}

/// Whether a path looks like a section file.
pub fn is_section_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_blank_values_are_absent() {
        let raw = RawSection::new("s").with("a", "  ").with("b", " x ");
        assert_eq!(raw.get("a"), None);
        assert_eq!(raw.get("b"), Some("x"));
        assert_eq!(raw.get("missing"), None);
    }

    #[test]
    fn test_parse_bool_spellings() {
        let raw = RawSection::new("s")
            .with("yes", "TRUE")
            .with("one", "1")
            .with("no", "f")
            .with("bad", "maybe");
        assert_eq!(raw.parse_bool("yes").unwrap(), Some(true));
        assert_eq!(raw.parse_bool("one").unwrap(), Some(true));
        assert_eq!(raw.parse_bool("no").unwrap(), Some(false));
        assert!(matches!(
            raw.parse_bool("bad"),
            Err(ConfigError::InvalidValue { key, .. }) if key == "bad"
        ));
    }

    #[test]
    fn test_parse_duration() {
        let raw = RawSection::new("s").with("d", "1h30m").with("bad", "soon");
        assert_eq!(
            raw.parse_duration("d").unwrap(),
            Some(Duration::from_secs(5400))
        );
        assert!(raw.parse_duration("bad").is_err());
    }

    #[test]
    fn test_parse_list() {
        let raw = RawSection::new("s").with("l", "a, b,,c ");
        assert_eq!(raw.parse_list("l"), vec!["a", "b", "c"]);
        assert!(raw.parse_list("missing").is_empty());
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("authz:9000"), Some(("authz".into(), 9000)));
        assert_eq!(split_host_port("authz"), None);
        assert_eq!(split_host_port(":9000"), None);
        assert_eq!(split_host_port("authz:0"), None);
        assert_eq!(split_host_port("authz:70000"), None);
    }

    #[test]
    fn test_split_host_port_ipv6() {
        assert_eq!(split_host_port("[::1]:9000"), Some(("::1".into(), 9000)));
        assert_eq!(
            split_host_port("[fd00::10]:443"),
            Some(("fd00::10".into(), 443))
        );
        assert_eq!(split_host_port("::1:9000"), None);
        assert_eq!(split_host_port("[::1:9000"), None);
        assert_eq!(split_host_port("[]:9000"), None);
    }

    #[test]
    fn test_load_section_file_stringifies_scalars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-kourier.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "enable-proxy-protocol = true").unwrap();
        writeln!(file, "trusted-hops-count = 2").unwrap();
        writeln!(file, "stream-idle-timeout = \"30s\"").unwrap();

        let raw = load_section_file(&path).unwrap();
        assert_eq!(raw.name, "config-kourier");
        assert_eq!(raw.get("enable-proxy-protocol"), Some("true"));
        assert_eq!(raw.get("trusted-hops-count"), Some("2"));
        assert_eq!(raw.get("stream-idle-timeout"), Some("30s"));
    }

    #[test]
    fn test_load_section_file_rejects_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-network.toml");
        fs::write(&path, "[nested]\nkey = 1\n").unwrap();

        assert!(matches!(
            load_section_file(&path),
            Err(ConfigError::InvalidValue { key, .. }) if key == "nested"
        ));
    }

    #[test]
    fn test_load_section_dir_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config-network.toml"), "ingress-class = \"x\"\n").unwrap();
        fs::write(dir.path().join("config-kourier.toml"), "").unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let sections = load_section_dir(dir.path()).unwrap();
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["config-kourier", "config-network"]);
    }
}

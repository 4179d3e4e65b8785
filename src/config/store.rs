//! Versionless, multi-section configuration store.
//!
//! # Data Flow
//! ```text
//! on_source_changed(raw)
//!     → section constructor (parse + validate)
//!     → Err: keep previous value, log, return error
//!     → Ok:  ArcSwap::store(Arc<new value>)
//!            → after-store callbacks (section, value)
//!
//! load()
//!     → ArcSwap::load() per section
//!     → deep copy into an owned Config
//! ```
//!
//! # Design Decisions
//! - Each section is replaced as one unit; readers never see a half-built value
//! - Sections advance independently; there is no joint generation
//! - `load()` hands out owned copies, so callers can never reach shared state

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::config::context::{self, Context};
use crate::config::kourier::{KourierConfig, KOURIER_CONFIG_NAME};
use crate::config::loader::{load_section_dir, ConfigError, RawSection};
use crate::config::network::{NetworkConfig, NETWORK_CONFIG_NAME};
use crate::observability::metrics;

/// One consistent view of every configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub kourier: KourierConfig,
    pub network: NetworkConfig,
}

/// A freshly parsed section value, as handed to after-store callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionValue {
    Kourier(Arc<KourierConfig>),
    Network(Arc<NetworkConfig>),
}

impl SectionValue {
    pub fn section_name(&self) -> &'static str {
        match self {
            SectionValue::Kourier(_) => KOURIER_CONFIG_NAME,
            SectionValue::Network(_) => NETWORK_CONFIG_NAME,
        }
    }

    fn parse(raw: &RawSection) -> Result<Self, ConfigError> {
        match raw.name.as_str() {
            KOURIER_CONFIG_NAME => Ok(SectionValue::Kourier(Arc::new(KourierConfig::from_section(raw)?))),
            NETWORK_CONFIG_NAME => Ok(SectionValue::Network(Arc::new(NetworkConfig::from_section(raw)?))),
            other => Err(ConfigError::UnknownSection(other.to_string())),
        }
    }
}

/// Callback run after a section value has been stored.
pub type AfterStore = Box<dyn Fn(&str, &SectionValue) + Send + Sync>;

/// Builder for [`Store`].
#[derive(Default)]
pub struct StoreBuilder {
    on_after_store: Vec<AfterStore>,
}

impl StoreBuilder {
    /// Register a callback invoked after every successful section update.
    pub fn on_after_store<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &SectionValue) + Send + Sync + 'static,
    {
        self.on_after_store.push(Box::new(f));
        self
    }

    pub fn build(self) -> Store {
        Store {
            kourier: ArcSwap::from_pointee(KourierConfig::default()),
            network: ArcSwap::from_pointee(NetworkConfig::default()),
            on_after_store: self.on_after_store,
        }
    }
}

/// Holds the latest valid value of each section.
///
/// Sections start out at their defaults, so `load()` is always answerable.
pub struct Store {
    kourier: ArcSwap<KourierConfig>,
    network: ArcSwap<NetworkConfig>,
    on_after_store: Vec<AfterStore>,
}

impl Store {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Parse and publish a changed section.
    ///
    /// On error the previously stored value stays in place.
    pub fn on_source_changed(&self, raw: &RawSection) -> Result<(), ConfigError> {
        let value = match SectionValue::parse(raw) {
            Ok(value) => value,
            Err(e) => {
                metrics::record_config_update_failure(&raw.name);
                tracing::error!(
                    section = %raw.name,
                    error = %e,
                    "Failed to parse configuration section, keeping previous value"
                );
                return Err(e);
            }
        };

        match &value {
            SectionValue::Kourier(config) => self.kourier.store(Arc::clone(config)),
            SectionValue::Network(config) => self.network.store(Arc::clone(config)),
        }

        metrics::record_config_update(value.section_name());
        tracing::info!(section = value.section_name(), "Configuration section updated");

        for callback in &self.on_after_store {
            callback(value.section_name(), &value);
        }
        Ok(())
    }

    /// An owned copy of every section's current value.
    pub fn load(&self) -> Config {
        Config {
            kourier: KourierConfig::clone(&self.kourier.load()),
            network: NetworkConfig::clone(&self.network.load()),
        }
    }

    /// Apply every section file in `dir`, stopping at the first rejected one.
    ///
    /// Returns the number of sections applied.
    pub fn apply_dir(&self, dir: &Path) -> Result<usize, ConfigError> {
        let sections = load_section_dir(dir)?;
        for section in &sections {
            self.on_source_changed(section)?;
        }
        Ok(sections.len())
    }

    /// Bind the current configuration onto a context for one pass.
    pub fn to_context(&self, ctx: &Context) -> Context {
        context::to_context(ctx, self.load())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

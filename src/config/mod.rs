//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! section file / ConfigMap data
//!     → loader.rs (RawSection: name + string map)
//!     → kourier.rs / network.rs (typed parse)
//!     → validation.rs (semantic checks)
//!     → store.rs (atomic swap of Arc<section>)
//!     → context.rs (one Config bound per reconciliation pass)
//!
//! On change:
//!     watcher.rs detects change
//!     → loader.rs loads the section
//!     → store.rs parses, validates, swaps
//!     → after-store callbacks observe the new value
//! ```
//!
//! # Design Decisions
//! - Section values are immutable once published; changes replace them whole
//! - Every field has a default so sparse sections are valid
//! - Parse failures keep the previous value and are reported, never fatal
//! - External authorization descriptors live next to their settings

pub mod context;
pub mod ext_authz;
pub mod kourier;
pub mod loader;
pub mod network;
pub mod store;
pub mod validation;
pub mod watcher;

pub use context::{from_context, from_context_or_defaults, to_context, Context, ContextError};
pub use ext_authz::{AuthzProtocol, ExtAuthzError, ExternalAuthz, ExternalAuthzConfig};
pub use kourier::{KourierConfig, Tracing, KOURIER_CONFIG_NAME};
pub use loader::{ConfigError, RawSection};
pub use network::{NetworkConfig, NETWORK_CONFIG_NAME};
pub use store::{Config, SectionValue, Store};

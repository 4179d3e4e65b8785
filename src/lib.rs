//! Kourier control plane core.
//!
//! Translates routing intent and the live Kourier configuration into Envoy
//! descriptors, and keeps that configuration in an immutable,
//! atomically-swapped store.

pub mod config;
pub mod envoy;
pub mod generator;
pub mod observability;

pub use config::{Config, Context, KourierConfig, Store};
pub use generator::{generate, generate_for_pass, GatewaySpec, GeneratorError, ResourceSet};

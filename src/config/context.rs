//! Per-pass propagation of a configuration snapshot.
//!
//! A reconciliation pass binds one `Config` onto a `Context` up front and
//! threads that context through every call, so the whole pass observes a
//! single consistent configuration.

use std::sync::Arc;

use thiserror::Error;

use crate::config::store::Config;

/// Raised when a caller reads a context nothing was bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("no configuration bound to context")]
    NotBound,
}

/// Carrier for the configuration observed by one pass.
#[derive(Debug, Clone, Default)]
pub struct Context {
    config: Option<Arc<Config>>,
}

impl Context {
    /// An empty context.
    pub fn background() -> Self {
        Self::default()
    }
}

/// Derive a context from `ctx` with `config` bound to it.
pub fn to_context(ctx: &Context, config: Config) -> Context {
    let mut next = ctx.clone();
    next.config = Some(Arc::new(config));
    next
}

/// The bound configuration.
///
/// An unbound context means the caller skipped binding; that is a plumbing
/// bug and is reported rather than papered over with defaults.
pub fn from_context(ctx: &Context) -> Result<Arc<Config>, ContextError> {
    ctx.config.clone().ok_or(ContextError::NotBound)
}

/// The bound configuration, or the defaults if nothing was bound yet.
pub fn from_context_or_defaults(ctx: &Context) -> Arc<Config> {
    ctx.config
        .clone()
        .unwrap_or_else(|| Arc::new(Config::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ext_authz::AuthzProtocol;
    use crate::config::network::Encryption;

    #[test]
    fn test_unbound_context_is_an_error() {
        assert_eq!(from_context(&Context::background()).unwrap_err(), ContextError::NotBound);
    }

    #[test]
    fn test_defaults_for_unbound_context() {
        let config = from_context_or_defaults(&Context::background());

        assert_eq!(config.network.system_internal_tls, Encryption::Disabled);
        let authz = &config.kourier.external_authz;
        assert!(!authz.enabled);
        assert_eq!(authz.config.max_request_bytes, 8192);
        assert_eq!(authz.config.timeout, 2000);
        assert_eq!(authz.config.protocol, AuthzProtocol::Grpc);
        assert!(!authz.config.pack_as_bytes);
    }

    #[test]
    fn test_bound_config_round_trips() {
        let mut config = Config::default();
        config.kourier.trusted_hops_count = 7;
        let ctx = to_context(&Context::background(), config.clone());

        assert_eq!(*from_context(&ctx).unwrap(), config);
        assert_eq!(*from_context_or_defaults(&ctx), config);
    }

    #[test]
    fn test_binding_does_not_touch_base() {
        let base = Context::background();
        let _bound = to_context(&base, Config::default());
        assert!(from_context(&base).is_err());
    }
}

//! Metrics collection.
//!
//! # Metrics
//! - `kourier_config_updates_total` (counter): accepted section updates, by section
//! - `kourier_config_update_failures_total` (counter): rejected section updates, by section
//! - `kourier_generation_failures_total` (counter): aborted generation passes, by reason
//!
//! # Design Decisions
//! - No exporter is installed here; the embedding process owns the recorder
//! - Without a recorder every call is a no-op

/// Record an accepted section update.
pub fn record_config_update(section: &str) {
    metrics::counter!("kourier_config_updates_total", "section" => section.to_string()).increment(1);
}

/// Record a rejected section update.
pub fn record_config_update_failure(section: &str) {
    metrics::counter!("kourier_config_update_failures_total", "section" => section.to_string())
        .increment(1);
}

/// Record a generation pass that was aborted.
pub fn record_generation_failure(reason: &'static str) {
    metrics::counter!("kourier_generation_failures_total", "reason" => reason).increment(1);
}

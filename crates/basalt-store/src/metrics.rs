//! Internal counters for the store manager.
//!
//! Rendering these as Prometheus exposition text is out of scope (spec
//! non-goal), but the counters themselves are named explicitly (§4.2) —
//! kept on a private registry so a future HTTP surface can mount it without
//! this crate knowing anything about HTTP.

use prometheus::{IntCounter, Registry};

pub struct Metrics {
    pub registry: Registry,
    pub applies_total: IntCounter,
    pub apply_errors_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        let registry = Registry::new();
        let applies_total = IntCounter::new(
            "basalt_store_applies_total",
            "Commands accepted by the store manager for proposal",
        )
        .expect("metric name/help are static and well-formed");
        let apply_errors_total = IntCounter::new(
            "basalt_store_apply_errors_total",
            "Commands the store manager failed to submit",
        )
        .expect("metric name/help are static and well-formed");

        registry
            .register(Box::new(applies_total.clone()))
            .expect("first registration of a uniquely-named counter cannot fail");
        registry
            .register(Box::new(apply_errors_total.clone()))
            .expect("first registration of a uniquely-named counter cannot fail");

        Self {
            registry,
            applies_total,
            apply_errors_total,
        }
    }
}

//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth flow metrics
    pub static ref SIGN_INS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("porchlight_sign_ins_total", "Total number of completed sign-in attempts"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref OAUTH_EXCHANGE_DURATION_SECONDS: prometheus::Histogram = prometheus::Histogram::with_opts(
        HistogramOpts::new(
            "porchlight_oauth_exchange_duration_seconds",
            "Duration of the provider code exchange and profile fetch"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("metric can be created");

    // Session metrics
    pub static ref SESSIONS_ESTABLISHED_TOTAL: IntCounter = IntCounter::new(
        "porchlight_sessions_established_total",
        "Total number of sessions established"
    ).expect("metric can be created");
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::new(
        "porchlight_sessions_active",
        "Current number of live sessions"
    ).expect("metric can be created");

    // User store metrics
    pub static ref USERS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "porchlight_users_created_total",
        "Total number of user records created"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("porchlight_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(SIGN_INS_TOTAL.clone()))
        .expect("SIGN_INS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(OAUTH_EXCHANGE_DURATION_SECONDS.clone()))
        .expect("OAUTH_EXCHANGE_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ESTABLISHED_TOTAL.clone()))
        .expect("SESSIONS_ESTABLISHED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("SESSIONS_ACTIVE can be registered");
    REGISTRY
        .register(Box::new(USERS_CREATED_TOTAL.clone()))
        .expect("USERS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

//! HTTP handlers beyond the auth flow

mod metrics;
mod pages;

pub use metrics::metrics_router;
pub use pages::pages_router;

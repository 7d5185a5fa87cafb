//! Observability utilities.

mod tracing;

pub use tracing::{build_filter, init_tracing, SpanTimer, LOG_ENV};

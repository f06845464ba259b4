//! Bridge logging setup
//!
//! The bridge emits `tracing` events for hosted reader lifecycles (construct,
//! open, end of stream, close) and for parameter maps when
//! `trace_parameters` is on. A host engine usually owns the global
//! subscriber already; these helpers are for standalone tools and tests.
//!
//! Filter lookup order: `XSCAN_LOG`, then `RUST_LOG`, then the given level
//! applied to the xscan crates only.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Bridge-specific filter variable, checked before `RUST_LOG`
pub const LOG_ENV: &str = "XSCAN_LOG";

#[cfg(feature = "logging")]
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(format!("xscan_core={level},xscan_ffi={level}")))
}

/// Lifecycle events at `info`, failures at `warn`.
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// `debug` shows every hosted open/close; `trace` adds each state transition.
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    // 호스트 엔진이 이미 전역 subscriber를 설치했을 수 있음
    let _ = fmt()
        .with_env_filter(filter_for(level))
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

/// Captured per test; shows bridge transitions so a failing lifecycle test
/// prints the call sequence that led to it.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(filter_for("trace"))
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}

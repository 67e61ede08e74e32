//! Telemetry helpers for hosts embedding `penseg`.
//!
//! Tracing setup stays explicit and opt-in. Hosts either call one of the
//! helpers below or install their own subscriber; every structural change to
//! selections and every load/export is emitted under the `penseg` target.

/// Default filter directive used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "penseg=info";

/// Installs a compact fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// Returns `false` when the `telemetry` feature is disabled or a global
/// subscriber is already installed.
#[must_use]
pub fn init_default_tracing() -> bool {
    init_tracing_with_filter(DEFAULT_FILTER)
}

/// Same as [`init_default_tracing`] with a caller-provided fallback directive,
/// e.g. `"penseg=trace"` to watch every pointer transition.
#[must_use]
pub fn init_tracing_with_filter(fallback_directive: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_directive));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = fallback_directive;
        false
    }
}

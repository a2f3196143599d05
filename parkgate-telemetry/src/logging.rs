//! ## parkgate-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Every gate emits its diagnostics through `tracing`. Severity follows the
//! gate's conventions: `info` for lifecycle, `debug` for per-vehicle
//! transitions, `warn` for transient failures the gate survives, `error`
//! for fatal startup problems.

use tracing::{info_span, Span};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
    pub fn init(default_level: &str) -> Result<(), InitError> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init()
    }

    /// Root span for everything a single gate does.
    #[inline]
    pub fn gate_span(gate_id: &str) -> Span {
        info_span!("gate", gate_id = gate_id)
    }
}

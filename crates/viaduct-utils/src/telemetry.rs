//! Logging setup shared by the binary: `tracing-subscriber`'s `fmt` layer
//! plus an `EnvFilter` driven by `RUST_LOG`. `spec.md` §6's
//! `logging.level`/`logging.verbose` config fields are mapped onto an
//! `EnvFilter` directive by the caller before this runs (see
//! `viaduct-cli`'s config loader).

use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Initializes the global `tracing` subscriber: a `log`-to-`tracing` bridge
/// plus fmt+filter layers. `directive` is an `EnvFilter`-compatible string
/// (e.g. `"info"`, `"debug,viaduct_agent=trace"`); `RUST_LOG` still
/// overrides it if set, since `EnvFilter::from_default_env` behavior is
/// preserved when `directive` is the default.
pub fn setup_telemetry(directive: &str) {
    LogTracer::init().expect("failed to install log -> tracing bridge");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let fmt_layer = fmt::layer().with_target(true);

    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to install global tracing subscriber");
}

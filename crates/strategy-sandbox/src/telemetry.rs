//! Tracing setup for processes hosting a [`crate::SandboxEngine`].
//!
//! The engine's lifecycle events (`sandbox.started`, `context.degraded`,
//! `program.synthesized`, `sandbox.finished`) and the `METRICS` flush all go
//! through the subscriber installed here. Log lines are written to stderr:
//! `strategy-sandboxd` prints the formatted script result on stdout, and the
//! two must never interleave.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is the default verbosity.
/// With `json`, each event is one JSON object per line. Later calls are
/// no-ops since the global subscriber can only be set once.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}


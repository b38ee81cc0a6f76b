//! Optional tracing setup for binaries embedding the engine.
//!
//! The library itself only emits `tracing` events; hosts that already run
//! their own subscriber should skip this and keep theirs.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes a compact stderr subscriber.
///
/// The `MERIT_LOG` environment variable overrides `default_level` (which
/// falls back to `merit_core=warn`). Safe to call more than once; later
/// calls lose the race and report an error.
pub fn init_tracing(default_level: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let fallback = default_level.unwrap_or("warn");
    let filter = EnvFilter::try_from_env("MERIT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if fallback.contains('=') {
            fallback.to_string()
        } else {
            format!("merit_core={fallback}")
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .try_init()?;
    Ok(())
}

use cws_core::LogConfig;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global stderr subscriber.
///
/// `RUST_LOG` overrides `log.level` when set. An unknown level falls back
/// to `debug` and is reported once the subscriber is live.
pub fn init(cfg: &LogConfig) {
    let (level, rejected) = match parse_level(&cfg.level) {
        Some(level) => (level, None),
        None => (LevelFilter::DEBUG, Some(cfg.level.as_str())),
    };

    if let Err(err) = install(level, cfg.timestamp) {
        debug!("logger already installed: {err}");
        return;
    }

    if let Some(value) = rejected {
        error!("failed to parse log level '{value}', falling back to debug");
    }
}

fn install(level: LevelFilter, timestamp: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let layer = fmt::layer().with_writer(std::io::stderr);

    if timestamp {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.without_time())
            .try_init()
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

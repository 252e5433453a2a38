//! Tracing subscriber setup
//!
//! The subscriber is installed before the config file is read so config
//! loading itself is logged. Once the TOML `logging.level` is known the
//! filter is swapped in place through a reload handle.
//!
//! **Filter priority:** `RUST_LOG` → `--log-level` → TOML → "info"

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Filter used until (and unless) a config file says otherwise
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Handle for adjusting the installed filter
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` or `--log-level` was given and wins over TOML
    pinned: bool,
}

impl LogControl {
    /// Apply the TOML log level unless a higher-priority source chose one
    pub fn apply_config_level(&self, toml_level: &str) {
        if self.pinned || toml_level.trim().is_empty() {
            return;
        }

        match self.handle.reload(EnvFilter::new(toml_level)) {
            Ok(()) => tracing::debug!(level = %toml_level, "Log filter set from config file"),
            Err(e) => tracing::warn!(error = %e, "Failed to apply config log level"),
        }
    }
}

/// Build a subscriber writing to `writer`, plus its [`LogControl`]
///
/// `env_directives` is the `RUST_LOG` value, if any.
pub fn build_subscriber<W>(
    cli_level: Option<&str>,
    env_directives: Option<&str>,
    writer: W,
    ansi: bool,
) -> (impl tracing::Subscriber + Send + Sync + 'static, LogControl)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_directives = env_directives.filter(|d| !d.trim().is_empty());
    let cli_level = cli_level.filter(|l| !l.trim().is_empty());

    let initial = env_directives.or(cli_level).unwrap_or(DEFAULT_LOG_LEVEL);
    let (filter, handle) = reload::Layer::new(EnvFilter::new(initial));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi),
    );

    let control = LogControl {
        handle,
        pinned: env_directives.is_some() || cli_level.is_some(),
    };
    (subscriber, control)
}

/// Install the global subscriber on stderr
pub fn init_tracing(cli_level: Option<&str>) -> LogControl {
    use std::io::IsTerminal;

    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (subscriber, control) = build_subscriber(
        cli_level,
        env_directives.as_deref(),
        std::io::stderr,
        std::io::stderr().is_terminal(),
    );
    subscriber.init();
    control
}

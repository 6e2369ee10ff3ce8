//! Log output for the sync pipeline.
//!
//! Every subsystem logs through `tracing` with a bracketed component prefix,
//! e.g. `[detector] started: 3 files under /repo`. Output goes to stderr;
//! `docsync watch` writes client notifications to stdout.
//!
//! Levels come from the `[logging]` section of `.docsync/settings.toml`:
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "docsync::watcher" = "debug"
//! ```
//!
//! When `RUST_LOG` is set it replaces the configured levels entirely, e.g.
//! `RUST_LOG=docsync::generated=trace docsync watch`.

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// `HH:MM:SS.mmm` in local time.
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// `default,module=level,...` as understood by [`EnvFilter`].
fn filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.default.clone();
    for (module, level) in &config.modules {
        filter_str.push_str(&format!(",{module}={level}"));
    }
    filter_str
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// [`init_with_config`] with the default `warn` level.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Info-level `[component] event: detail` line.
///
/// # Examples
/// ```ignore
/// log_event!("detector", "scanned", "{} files", count);
/// log_event!("host", "started");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level counterpart of `log_event!`, for per-item noise.
///
/// # Examples
/// ```ignore
/// debug_event!("sync", "untracked", "{}", path.display());
/// ```
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

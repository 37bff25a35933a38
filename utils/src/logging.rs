//! Structured logging initialization via `tracing`.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is used as the filter.
/// `format` selects `"json"` output, anything else is human-readable.
/// Calling this twice is harmless: the second install is ignored.
pub fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

//! Structured JSON logging, gated by `-v`/`RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Initialize JSON logging. `verbosity` is the number of `-v` flags on the
/// command line; it sets a floor under whatever `RUST_LOG` already asks
/// for (so `-vv` without `RUST_LOG` gives debug, but `RUST_LOG=trace`
/// still wins).
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
}

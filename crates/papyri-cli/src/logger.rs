//! Logging setup for the papyri CLI
//!
//! Verbosity is decided in this order: `--verbose` gives debug output for
//! the papyri crates, `--quiet` keeps errors only, then `RUST_LOG`, then
//! info level for the papyri crates.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "papyri=info,papyri_core=info";
const VERBOSE_DIRECTIVES: &str = "papyri=debug,papyri_core=debug";
const QUIET_DIRECTIVES: &str = "papyri=error,papyri_core=error";

/// Filter for the given flags, consulting `RUST_LOG` when neither is set
fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_DIRECTIVES)
    } else if quiet {
        EnvFilter::new(QUIET_DIRECTIVES)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
    }
}

/// Install the global subscriber; call once before anything logs
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(fmt_layer)
        .init();
}

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,shop_dashboard_lib=info";

/// Logs go to stderr so receipts and reports on stdout stay clean.
/// `RUST_LOG` overrides the default filter; `verbose` raises this crate to debug.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,shop_dashboard_lib=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    // A second init (tests, embedding) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

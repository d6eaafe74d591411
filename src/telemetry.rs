use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins when set; otherwise
/// only warnings are shown, or debug output for this crate with `verbose`.
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,wasteledger=debug"
    } else {
        "warn"
    };

    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "server=debug,game_engine=debug,tower_http=debug,axum=debug"
    } else {
        "server=info,game_engine=info,tower_http=info"
    }
}

/// Installs the global fmt subscriber. `RUST_LOG` takes precedence over
/// `verbose`. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init();
}

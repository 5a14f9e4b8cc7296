use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber. `RUST_LOG` takes precedence over
/// `level`. Calling it again after a subscriber is installed does nothing.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod logging_test {
    use super::*;

    #[test]
    fn should_tolerate_repeated_initialization() {
        init_logging("debug");
        init_logging("warn");
        tracing::info!("logging initialized twice");
    }
}

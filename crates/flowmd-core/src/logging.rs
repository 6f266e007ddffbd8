use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; only the first call installs anything.
/// Returns whether this call installed the subscriber.
#[uniffi::export]
pub fn init_logging() -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();
    if installed {
        info!("FlowMD core {} starting", env!("CARGO_PKG_VERSION"));
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_logging();
        assert!(!init_logging());
    }
}

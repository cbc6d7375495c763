//! Logging setup.
//!
//! Library code logs through `tracing` macros; binaries call [`init`] once.
//! `RUST_LOG` wins over the default filter when set.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "lyrical_complexity=debug,info"
    } else {
        "lyrical_complexity=info,warn"
    }
}

/// Install the global subscriber, writing to stderr. Later calls are no-ops.
pub fn init(verbose: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_parse() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_filter(verbose)).is_ok());
        }
    }

    #[test]
    fn test_init_twice() {
        init(false);
        init(true);
    }
}

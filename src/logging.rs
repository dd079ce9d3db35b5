//! Logging setup for binaries and tests embedding the client.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` for this crate when `debug` is
/// true and `info` everywhere else. Returns `false` if a global subscriber already exists.
pub fn init(debug: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_target(true)
        .try_init()
        .is_ok()
}

fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

fn default_directives(debug: bool) -> &'static str {
    if debug {
        "info,base_api_client=debug"
    } else {
        "info"
    }
}

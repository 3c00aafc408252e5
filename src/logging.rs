//! Logging setup.
//!
//! Installs a `tracing` subscriber writing to stderr, keeping stdout free for
//! reports and plots. The filter comes from `TRAFFIC_CURVES_LOG`, then
//! `RUST_LOG`, then the `-v` count.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an explicit filter directive.
pub const LOG_ENV: &str = "TRAFFIC_CURVES_LOG";

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "traffic_curves=info",
        1 => "traffic_curves=debug",
        _ => "traffic_curves=trace",
    }
}

/// Initialize the global subscriber. Subsequent calls are no-ops.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0), "traffic_curves=info");
        assert_eq!(default_directive(1), "traffic_curves=debug");
        assert_eq!(default_directive(4), "traffic_curves=trace");
    }
}

//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Levels by verbosity:
//! - 0 (no `-v`): info, engine stage progress and summary counts
//! - 1 (`-v`): debug, adds the join fragments
//! - 2+ (`-vv`): trace
//!
//! `RUST_LOG` overrides the verbosity flag when set.

use std::io;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the `-v` count to a level
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tm_core={level},tm_cli={level},table_merger={level}",
            level = level.to_string().to_lowercase()
        ))
    })
}

/// Install the global subscriber, writing compact lines to stderr.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logging(verbosity: u8) {
    let level = level_from_verbosity(verbosity);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), Level::INFO);
        assert_eq!(level_from_verbosity(1), Level::DEBUG);
        assert_eq!(level_from_verbosity(5), Level::TRACE);
    }
}

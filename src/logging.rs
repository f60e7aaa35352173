//! Logging setup for the console binary.
//!
//! Log lines go to stderr (or a file) so the session transcript on stdout
//! stays clean.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Parse log level from config string
pub fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "off" | "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::WARN,
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `level`.
///
/// Returns the guard that must be kept alive for the duration of the program.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> WorkerGuard {
    let env_filter = EnvFilter::builder()
        .with_default_directive(parse_log_level(level).into())
        .from_env_lossy();

    let file_appender = log_file.and_then(|path| {
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path.file_name()?;
        std::fs::create_dir_all(dir).ok()?;
        Some(tracing_appender::rolling::never(dir, name))
    });

    match file_appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            guard
        }
        None => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(writer)
                .init();
            guard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_warn() {
        assert_eq!(parse_log_level("DEBUG"), tracing::Level::DEBUG);
        assert_eq!(parse_log_level("off"), tracing::Level::ERROR);
        assert_eq!(parse_log_level("chatty"), tracing::Level::WARN);
    }
}

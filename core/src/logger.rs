use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{
    fmt::{format::Writer, time::FormatTime},
    EnvFilter,
};

/// Time of day with millisecond precision, runs never span days.
struct ClockTimer;

impl FormatTime for ClockTimer {
    fn format_time(&self, writer: &mut Writer<'_>) -> std::fmt::Result {
        write!(writer, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Installs the global subscriber on stderr so stdout stays free for SQL
/// output. `level` is only the default: `RUST_LOG=rbulk=debug` still shows
/// every generated statement.
pub fn setup_logger(level: LevelFilter) {
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ClockTimer)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    if installed.is_err() {
        debug!("Logger has already been set up, continuing...");
    }
}

pub fn setup_info_logger() {
    setup_logger(LevelFilter::INFO);
}

/// Warnings and errors only.
pub fn setup_quiet_logger() {
    setup_logger(LevelFilter::WARN);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logger_twice_keeps_first() {
        setup_quiet_logger();
        setup_info_logger();
        tracing::warn!("logger installed");
    }
}

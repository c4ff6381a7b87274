use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

use super::source_map::SourceMap;
use super::CompileError;

/// Environment variable holding the log level (`error` ... `trace`).
pub const LOG_ENV: &str = "SYSY_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow().bold(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("[{} {}] {}", tag, record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Installs the stderr logger. Calling it twice is harmless.
pub fn init() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Prints the error, with a source location when one is known, and exits.
pub fn print_error_and_exit(error: &anyhow::Error, source: Option<&str>, exit_code: i32) -> ! {
    let location = error
        .downcast_ref::<CompileError>()
        .and_then(|e| e.pos)
        .zip(source)
        .map(|(pos, src)| format!(" ({})", SourceMap::new(src).format_location(pos)))
        .unwrap_or_default();
    eprintln!(
        "{} {}{}",
        "Error:".red().bold(),
        format!("{:#}", error).bold(),
        location
    );
    std::process::exit(exit_code)
}

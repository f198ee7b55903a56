//! Logging for one `nvm` invocation: `debug.log` in the per-user data
//! directory, plus the terminal when `--verbose` or `NVM_DEBUG` is set.

use std::fs::{File, OpenOptions};
use std::path::Path;

use nvmw_platform::AppPaths;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

pub const MAX_LOG_SIZE: u64 = 2 * 1024 * 1024;

/// Keep the newer half of an oversized log, cut at a line boundary.
fn trim_oversized(log_path: &Path, max_log_size: u64) {
    if let Ok(metadata) = std::fs::metadata(log_path)
        && metadata.len() > max_log_size
        && let Ok(contents) = std::fs::read(log_path)
    {
        let half = contents.len() / 2;
        let keep_from = contents[half..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(half, |pos| half + pos + 1);
        let _ = std::fs::write(log_path, &contents[keep_from..]);
    }
}

fn open_log(log_path: &Path) -> Option<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .ok()
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("nvmw")
        .build()
}

/// Level for the terminal, when it gets log output at all.
#[must_use]
fn terminal_level(verbose: bool) -> Option<LevelFilter> {
    verbose.then_some(LevelFilter::Debug)
}

#[must_use]
fn file_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the global logger. A log file that cannot be opened is skipped;
/// commands never depend on logging.
pub fn init_logging(paths: &AppPaths, verbose: bool) {
    let _ = paths.ensure_dirs();
    let log_path = paths.log_file();
    trim_oversized(&log_path, MAX_LOG_SIZE);

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if let Some(file) = open_log(&log_path) {
        loggers.push(WriteLogger::new(file_level(verbose), log_config(), file));
    }
    if let Some(level) = terminal_level(verbose) {
        loggers.push(TermLogger::new(
            level,
            log_config(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
    log::debug!("Logging to {}", log_path.display());
}

/// `NVM_DEBUG` turns on verbose logging like `--verbose`.
#[must_use]
pub fn debug_from_env(value: Option<&str>) -> bool {
    value.is_some_and(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "on"))
}

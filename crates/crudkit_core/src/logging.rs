//! Logging bootstrap and log-line hygiene.
//!
//! # Responsibility
//! - Start rolling file logs once per process for host applications.
//! - Start stderr logs once per process for test fixtures.
//! - Keep caller-supplied text (query strings, error messages) single-line
//!   and bounded before it is logged.
//!
//! # Invariants
//! - File logging init is idempotent for the same level and directory and
//!   rejects any other configuration afterwards.
//! - Initialization never panics.
//! - Only one backend is ever installed per process.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "crudkit";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_LOGGED_TEXT_CHARS: usize = 240;
const TEST_LOG_SPEC: &str = "warn";

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

enum Backend {
    File { level: &'static str, log_dir: PathBuf },
    Stderr,
}

struct LoggingState {
    backend: Backend,
    _logger: LoggerHandle,
}

/// Initializes rolling file logs with `level` under the absolute `log_dir`.
///
/// # Errors
/// - `level` is not one of `trace|debug|info|warn|error`.
/// - `log_dir` is empty, relative, or cannot be created.
/// - Logging was already started with another level, directory or backend.
/// - The logger backend fails to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let normalized_level = normalize_level(level)?;
    let normalized_dir = normalize_log_dir(log_dir)?;

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        std::fs::create_dir_all(&normalized_dir).map_err(|err| {
            format!(
                "failed to create log directory `{}`: {err}",
                normalized_dir.display()
            )
        })?;

        let logger = Logger::try_with_str(normalized_level)
            .map_err(|err| format!("invalid log level `{normalized_level}`: {err}"))?
            .log_to_file(
                FileSpec::default()
                    .directory(normalized_dir.as_path())
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        info!(
            "event=logging_init module=logging status=ok backend=file level={} log_dir={} version={}",
            normalized_level,
            normalized_dir.display(),
            env!("CARGO_PKG_VERSION")
        );

        Ok(LoggingState {
            backend: Backend::File {
                level: normalized_level,
                log_dir: normalized_dir.clone(),
            },
            _logger: logger,
        })
    })?;

    match &state.backend {
        Backend::File { level, log_dir } if *log_dir != normalized_dir => Err(format!(
            "logging already initialized at `{}` with level `{level}`; refusing to switch to `{}`",
            log_dir.display(),
            normalized_dir.display()
        )),
        Backend::File { level, .. } if *level != normalized_level => Err(format!(
            "logging already initialized with level `{level}`; refusing to switch to `{normalized_level}`"
        )),
        Backend::File { .. } => Ok(()),
        Backend::Stderr => {
            Err("logging already initialized for tests; refusing to switch to file logs".to_string())
        }
    }
}

/// Starts stderr logging for tests, driven by `RUST_LOG` (default `warn`).
///
/// Does nothing when any logging backend is already active, and swallows
/// backend failures so fixtures never fail because of logging.
pub fn init_test_logging() {
    let _ = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = Logger::try_with_env_or_str(TEST_LOG_SPEC)
            .map_err(|err| err.to_string())?
            .log_to_stderr()
            .start()
            .map_err(|err| err.to_string())?;
        Ok(LoggingState {
            backend: Backend::Stderr,
            _logger: logger,
        })
    });
}

/// Returns `(level, log_dir)` when file logging is active.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    match LOGGING_STATE.get().map(|state| &state.backend) {
        Some(Backend::File { level, log_dir }) => Some((*level, log_dir.clone())),
        Some(Backend::Stderr) | None => None,
    }
}

/// Flattens `value` to one line and caps its length for log output.
pub fn summarize_for_log(value: &str) -> String {
    sanitize_message(value, MAX_LOGGED_TEXT_CHARS)
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!("log_dir must be an absolute path, got `{trimmed}`"));
    }
    Ok(path.to_path_buf())
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

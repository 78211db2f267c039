//! Tracing setup for hosts and the diagnostic binary.
//!
//! `SESSION_GUARD_DEBUG_LOG=1` forces debug output; otherwise `RUST_LOG` is
//! honoured, falling back to `info`. When a directory is given, logs are also
//! written to a daily-rolling file there.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEBUG_ENV_VAR: &str = "SESSION_GUARD_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "session-guard.log";

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn env_filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_ENV_VAR)
        .map(|value| is_truthy(&value))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber. Keep the returned guard alive for the life of
/// the process or buffered file output is lost. Safe to call more than once; later
/// calls leave the first subscriber in place.
pub fn init(directory: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match directory {
        Some(dir) => match fs_err::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_writer(writer).with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(err) => {
                eprintln!("session-guard: file logging disabled: {}", err);
                (None, None)
            }
        },
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    guard
}

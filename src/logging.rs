// src/logging.rs

use crate::config::RuntimeConfig;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Where the diagnostic trail lives: the platform's local data directory
/// for this crate, or `./.data` when no home directory can be resolved.
pub fn data_dir() -> PathBuf {
    ProjectDirs::from("com", "vanguard-rs", env!("CARGO_PKG_NAME"))
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".data"))
}

/// Full path of the diagnostic log file.
pub fn log_path() -> PathBuf {
    data_dir().join(LOG_FILE.as_str())
}

/// Level filter for the diagnostic trail.
///
/// `RUST_LOG` wins, then `VANGUARD_AUDIT_LOGLEVEL`; otherwise the console's
/// debug flag decides between `debug` and `info` for this crate.
pub fn filter_directive(config: &RuntimeConfig) -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.clone()))
        .unwrap_or_else(|_| {
            let level = if config.debug { "debug" } else { "info" };
            format!("{}={level}", env!("CARGO_CRATE_NAME"))
        })
}

/// Initializes file-based tracing in the project data directory.
///
/// This is the structured diagnostic trail; user-facing lines and the
/// `error.log` context dump go through [`crate::output::OutputConsole`].
pub fn initialize_logging(config: &RuntimeConfig) -> color_eyre::Result<PathBuf> {
    std::fs::create_dir_all(data_dir())?;
    let path = log_path();
    let log_file = std::fs::File::create(&path)?;

    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(filter_directive(config)));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(path)
}

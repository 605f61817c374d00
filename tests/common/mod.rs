//! Common test utilities

use std::sync::Arc;
use tempfile::TempDir;
use vanguard_audit::config::RuntimeConfig;
use vanguard_audit::output::{OutputConsole, SharedBuffer, Stream};

/// A console writing into memory, with its error log in a temp dir.
pub struct CapturedConsole {
    pub console: Arc<OutputConsole>,
    pub stdout: SharedBuffer,
    pub stderr: SharedBuffer,
    pub config: RuntimeConfig,
    pub dir: TempDir,
}

pub fn captured_console() -> CapturedConsole {
    captured_console_with(RuntimeConfig::default())
}

pub fn captured_console_with(config: RuntimeConfig) -> CapturedConsole {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = RuntimeConfig {
        error_log: dir.path().join("error.log"),
        ..config
    };
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();
    let console = Arc::new(OutputConsole::with_streams(
        &config,
        Stream::buffer(&stdout, false),
        Stream::buffer(&stderr, false),
    ));
    CapturedConsole {
        console,
        stdout,
        stderr,
        config,
        dir,
    }
}

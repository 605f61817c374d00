// src/output.rs

//! Human-facing console output.
//!
//! One [`OutputConsole`] is created per process and shared by `Arc` with the
//! runner and every module. It owns the verbosity flags, renders marker
//! lines (colored on a terminal, plain otherwise) and keeps the durable
//! error trail in `error.log`.

use crate::config::RuntimeConfig;
use chrono::Local;
use crossterm::tty::IsTty;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

const RULE_WIDTH: usize = 80;

/// The kinds of marker line the console renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Error,
    Bad,
    Status,
    Info,
    Ok,
    Debug,
    Verbose,
}

impl MessageKind {
    pub fn marker(self) -> &'static str {
        match self {
            MessageKind::Error | MessageKind::Bad => "[-]",
            MessageKind::Status => "[*]",
            MessageKind::Info => "[~]",
            MessageKind::Ok => "[+]",
            MessageKind::Debug => "[!]",
            MessageKind::Verbose => "[v]",
        }
    }

    /// ANSI color code used for the marker.
    pub fn color(self) -> u8 {
        match self {
            MessageKind::Error | MessageKind::Bad => 31,
            MessageKind::Status => 34,
            MessageKind::Info => 30,
            MessageKind::Ok => 32,
            MessageKind::Debug => 36,
            MessageKind::Verbose => 37,
        }
    }
}

/// Formats one marker line.
pub fn render_line(marker: &str, color: u8, message: &str, tty: bool) -> String {
    if tty {
        format!("\x1b[1;{color}m {marker}\x1b[1;00m {message}\n")
    } else {
        format!("{marker} {message}\n")
    }
}

// --- Streams ---

/// An in-memory sink, handy for capturing console output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An output destination plus whether it is an interactive terminal.
pub struct Stream {
    writer: Mutex<Box<dyn Write + Send>>,
    tty: bool,
}

impl Stream {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let tty = out.is_tty();
        Self::new(Box::new(out), tty)
    }

    pub fn stderr() -> Self {
        let err = io::stderr();
        let tty = err.is_tty();
        Self::new(Box::new(err), tty)
    }

    pub fn buffer(buffer: &SharedBuffer, tty: bool) -> Self {
        Self::new(Box::new(buffer.clone()), tty)
    }

    pub fn new(writer: Box<dyn Write + Send>, tty: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            tty,
        }
    }

    pub fn is_tty(&self) -> bool {
        self.tty
    }

    /// Writes and flushes; a broken stream is not worth failing a scan over.
    fn write_str(&self, text: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.write_all(text.as_bytes());
        let _ = writer.flush();
    }
}

// --- Error Log ---

/// Append-only error log with a one-time context header.
///
/// The header (timestamp, environment, resolved options) precedes the first
/// entry this writer manages to persist. The flag lives behind the same lock
/// as the write, so two racing first errors cannot both emit it.
pub struct ErrorLog {
    path: PathBuf,
    options: String,
    opened: Mutex<bool>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>, options: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: options.into(),
            opened: Mutex::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the context header has been written.
    pub fn is_opened(&self) -> bool {
        *self.opened.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `[<timestamp>] <message>`, preceded by the header on the
    /// first successful write.
    pub fn append(&self, message: &str) -> io::Result<()> {
        let mut opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entry = String::new();
        if !*opened {
            entry.push_str(&self.header());
        }
        entry.push_str(&render_line(&format!("[{}]", timestamp()), 31, message, false));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())?;
        file.flush()?;

        *opened = true;
        Ok(())
    }

    fn header(&self) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let env: BTreeMap<String, String> = std::env::vars().collect();
        let env = serde_json::to_string_pretty(&env).unwrap_or_else(|_| format!("{env:#?}"));

        format!(
            "\n{} {rule}\nENV:\n{env}\n{rule}\nOPTIONS:\n{}\n{rule}\n",
            timestamp(),
            self.options
        )
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}

// --- Console ---

/// Process-wide output facility.
///
/// Printing never fails and never panics; the only message kind that is
/// guaranteed to surface is [`OutputConsole::print_error`].
pub struct OutputConsole {
    verbose: AtomicBool,
    debug: AtomicBool,
    only_positives: AtomicBool,
    muted: AtomicBool,
    stdout: Stream,
    stderr: Stream,
    error_log: ErrorLog,
}

impl OutputConsole {
    /// A console on the process's stdout/stderr.
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_streams(config, Stream::stdout(), Stream::stderr())
    }

    pub fn with_streams(config: &RuntimeConfig, stdout: Stream, stderr: Stream) -> Self {
        let options =
            serde_json::to_string_pretty(config).unwrap_or_else(|_| format!("{config:#?}"));
        let console = Self {
            verbose: AtomicBool::new(false),
            debug: AtomicBool::new(false),
            only_positives: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            stdout,
            stderr,
            error_log: ErrorLog::new(&config.error_log, options),
        };
        console.set_verbose(config.verbose);
        console.set_debug(config.debug);
        console.set_only_positives(config.only_positives);
        if config.mute {
            console.mute();
        }
        console
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Always printed, to stderr, whatever the flags; also persisted to the
    /// error log.
    pub fn print_error(&self, message: &str) {
        self.emit(&self.stderr, MessageKind::Error, message);
        if let Err(e) = self.error_log.append(message) {
            warn!(
                path = %self.error_log.path().display(),
                error = %e,
                "Could not write to the error log."
            );
        }
    }

    /// Like an error, but on stdout, not persisted and subject to mute.
    pub fn print_bad(&self, message: &str, force_unmute: bool) {
        self.render(&self.stdout, MessageKind::Bad, message, force_unmute);
    }

    pub fn print_status(&self, message: &str, force_unmute: bool) {
        if self.is_only_positives() {
            return;
        }
        self.render(&self.stdout, MessageKind::Status, message, force_unmute);
    }

    pub fn print_info(&self, message: &str, force_unmute: bool) {
        if self.is_only_positives() {
            return;
        }
        self.render(&self.stdout, MessageKind::Info, message, force_unmute);
    }

    /// Positive results, e.g. a confirmed issue. Ignores mute and
    /// only-positives.
    ///
    /// `force_unmute` has no effect here; it is kept only so all the
    /// printers share one signature.
    pub fn print_ok(&self, message: &str, _force_unmute: bool) {
        self.emit(&self.stdout, MessageKind::Ok, message);
    }

    pub fn print_debug(&self, message: &str, force_unmute: bool) {
        if !self.is_debug() {
            return;
        }
        self.render(&self.stderr, MessageKind::Debug, message, force_unmute);
    }

    /// Pretty-prints a value when debugging.
    pub fn print_debug_pp<T: Debug + ?Sized>(&self, value: &T) {
        if !self.is_debug() {
            return;
        }
        self.stdout.write_str(&format!("{value:#?}\n"));
    }

    /// Prints an error and each of its sources when debugging.
    pub fn print_debug_backtrace(&self, error: &(dyn Error + 'static)) {
        if !self.is_debug() {
            return;
        }
        for line in error_chain(error) {
            self.print_debug(&line, false);
        }
    }

    /// Prints and persists an error and each of its sources.
    pub fn print_error_backtrace(&self, error: &(dyn Error + 'static)) {
        for line in error_chain(error) {
            self.print_error(&line);
        }
    }

    pub fn print_verbose(&self, message: &str, force_unmute: bool) {
        if !self.is_verbose() {
            return;
        }
        self.render(&self.stdout, MessageKind::Verbose, message, force_unmute);
    }

    /// A raw line without marker.
    pub fn print_line(&self, message: &str, force_unmute: bool) {
        if self.is_only_positives() {
            return;
        }
        if self.is_muted() && !force_unmute {
            return;
        }
        self.stdout.write_str(&format!("{message}\n"));
    }

    // --- Flags ---

    pub fn set_verbose(&self, on: bool) {
        self.verbose.store(on, Ordering::SeqCst);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::SeqCst)
    }

    pub fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::SeqCst);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }

    pub fn set_only_positives(&self, on: bool) {
        self.only_positives.store(on, Ordering::SeqCst);
    }

    pub fn is_only_positives(&self) -> bool {
        self.only_positives.load(Ordering::SeqCst)
    }

    pub fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
    }

    pub fn unmute(&self) {
        self.muted.store(false, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    // --- Rendering ---

    fn render(&self, stream: &Stream, kind: MessageKind, message: &str, force_unmute: bool) {
        if self.is_muted() && !force_unmute {
            return;
        }
        self.emit(stream, kind, message);
    }

    fn emit(&self, stream: &Stream, kind: MessageKind, message: &str) {
        stream.write_str(&render_line(
            kind.marker(),
            kind.color(),
            message,
            stream.is_tty(),
        ));
    }
}

fn error_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    std::iter::successors(Some(error), |&e| e.source())
        .enumerate()
        .map(|(depth, e)| {
            if depth == 0 {
                e.to_string()
            } else {
                format!("caused by: {e}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Harness {
        console: OutputConsole,
        out: SharedBuffer,
        err: SharedBuffer,
        _dir: TempDir,
        log_path: PathBuf,
    }

    fn harness(tty: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("error.log");
        let config = RuntimeConfig {
            error_log: log_path.clone(),
            ..RuntimeConfig::default()
        };
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let console = OutputConsole::with_streams(
            &config,
            Stream::buffer(&out, tty),
            Stream::buffer(&err, tty),
        );
        Harness {
            console,
            out,
            err,
            _dir: dir,
            log_path,
        }
    }

    fn read_log(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn test_plain_and_colored_rendering() {
        assert_eq!(render_line("[*]", 34, "hello", false), "[*] hello\n");
        assert_eq!(
            render_line("[*]", 34, "hello", true),
            "\x1b[1;34m [*]\x1b[1;00m hello\n"
        );
    }

    #[test]
    fn test_tty_stream_gets_colors() {
        let h = harness(true);
        h.console.print_ok("found", false);
        assert_eq!(h.out.contents(), "\x1b[1;32m [+]\x1b[1;00m found\n");
    }

    #[test]
    fn test_print_error_ignores_every_flag() {
        for bits in 0..16u8 {
            let h = harness(false);
            h.console.set_verbose(bits & 1 != 0);
            h.console.set_debug(bits & 2 != 0);
            h.console.set_only_positives(bits & 4 != 0);
            if bits & 8 != 0 {
                h.console.mute();
            }

            h.console.print_error("boom");

            assert_eq!(h.err.contents(), "[-] boom\n", "flags {bits:04b}");
            assert!(h.out.contents().is_empty());
            assert!(read_log(&h.log_path).contains("] boom\n"), "flags {bits:04b}");
        }
    }

    #[test]
    fn test_header_written_once() {
        let h = harness(false);
        h.console.print_error("first");
        h.console.print_error("second");

        let log = read_log(&h.log_path);
        assert_eq!(log.matches("ENV:").count(), 1);
        assert_eq!(log.matches("OPTIONS:").count(), 1);

        let header_end = log.find("OPTIONS:").unwrap();
        let first = log.find("] first").unwrap();
        let second = log.find("] second").unwrap();
        assert!(header_end < first && first < second);
        assert!(log.starts_with('\n'));
        assert!(log.contains(&"-".repeat(80)));
        assert!(h.console.error_log().is_opened());
    }

    #[test]
    fn test_header_dumps_resolved_options() {
        let h = harness(false);
        h.console.print_error("x");
        let log = read_log(&h.log_path);
        assert!(log.contains("\"user_agent\""));
        assert!(log.contains("\"only_positives\": false"));
    }

    #[test]
    fn test_unwritable_log_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig {
            error_log: dir.path().join("missing").join("error.log"),
            ..RuntimeConfig::default()
        };
        let err = SharedBuffer::new();
        let console = OutputConsole::with_streams(
            &config,
            Stream::buffer(&SharedBuffer::new(), false),
            Stream::buffer(&err, false),
        );

        console.print_error("still shown");

        assert_eq!(err.contents(), "[-] still shown\n");
        assert!(!console.error_log().is_opened());
    }

    #[test]
    fn test_only_positives_silences_neutral_output() {
        let h = harness(false);
        h.console.set_only_positives(true);
        h.console.print_status("s", true);
        h.console.print_info("i", true);
        h.console.print_line("l", true);
        assert!(h.out.contents().is_empty());

        h.console.print_ok("hit", false);
        assert_eq!(h.out.contents(), "[+] hit\n");
    }

    #[test]
    fn test_debug_output_follows_flag() {
        let h = harness(false);
        h.console.print_debug("hidden", false);
        assert!(h.err.contents().is_empty());

        h.console.set_debug(true);
        h.console.print_debug("shown", false);
        assert_eq!(h.err.contents(), "[!] shown\n");

        h.console.set_debug(false);
        h.console.print_debug("hidden again", false);
        assert_eq!(h.err.contents(), "[!] shown\n");
    }

    #[test]
    fn test_verbose_output_follows_flag() {
        let h = harness(false);
        h.console.print_verbose("hidden", false);
        h.console.set_verbose(true);
        h.console.print_verbose("shown", false);
        assert_eq!(h.out.contents(), "[v] shown\n");
    }

    #[test]
    fn test_mute_and_force_unmute() {
        let h = harness(false);
        h.console.mute();
        h.console.print_status("quiet", false);
        h.console.print_info("quiet", false);
        h.console.print_bad("quiet", false);
        h.console.print_line("quiet", false);
        assert!(h.out.contents().is_empty());

        h.console.print_status("loud", true);
        h.console.print_bad("bad", true);
        h.console.print_line("raw", true);
        h.console.print_ok("ok", false);
        assert_eq!(h.out.contents(), "[*] loud\n[-] bad\nraw\n[+] ok\n");

        h.console.unmute();
        assert!(!h.console.is_muted());
        h.console.print_info("info", false);
        assert!(h.out.contents().ends_with("[~] info\n"));
    }

    #[test]
    fn test_error_backtrace_walks_sources() {
        #[derive(Debug)]
        struct Outer(io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "request failed")
            }
        }
        impl Error for Outer {
            fn source(&self) -> Option<&(dyn Error + 'static)> {
                Some(&self.0)
            }
        }

        let h = harness(false);
        let error = Outer(io::Error::other("connection reset"));
        h.console.print_debug_backtrace(&error);
        assert!(h.err.contents().is_empty());

        h.console.print_error_backtrace(&error);
        assert_eq!(
            h.err.contents(),
            "[-] request failed\n[-] caused by: connection reset\n"
        );
    }

    #[test]
    fn test_debug_pp() {
        let h = harness(false);
        h.console.print_debug_pp(&vec![1, 2]);
        assert!(h.out.contents().is_empty());
        h.console.set_debug(true);
        h.console.print_debug_pp(&vec![1, 2]);
        assert_eq!(h.out.contents(), "[\n    1,\n    2,\n]\n");
    }
}

//! Vanguard Audit - module execution and reporting core of a web scanner.
//!
//! Audit modules declare static metadata and run against fetched pages,
//! issuing follow-up requests and logging issues into a shared registry. The
//! output console renders status lines under configurable verbosity and keeps
//! a durable error log.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod output;

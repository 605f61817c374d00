// src/core/mod.rs

/// Data structures shared by modules, the runner and reporting: severities,
/// elements, module metadata and HTTP exchanges.
pub mod models;

/// Issue records and the thread-safe registry they are logged into.
pub mod issues;

/// The HTTP client abstraction modules send requests through.
pub mod http;

/// The audit module contract and the context handed to a running module.
pub mod module;

/// Built-in audit modules.
pub mod modules;

/// Dispatches modules against pages.
pub mod runner;

// src/core/module.rs

//! The contract every audit module implements.

use crate::core::http::HttpClient;
use crate::core::issues::{Issue, IssueData, IssueRegistry};
use crate::core::models::{ModuleInfo, Page};
use crate::error::Result;
use crate::output::OutputConsole;
use async_trait::async_trait;
use std::sync::Arc;

/// A self-describing security check.
///
/// Implementations hold no mutable state, so one instance may audit many
/// pages at once.
#[async_trait]
pub trait Module: Send + Sync {
    /// Metadata of the module type, available without an instance.
    fn info() -> &'static ModuleInfo
    where
        Self: Sized;

    /// Same metadata, reachable through `dyn Module`.
    fn metadata(&self) -> &'static ModuleInfo;

    /// Audits one page.
    ///
    /// Returns `Ok(())` straight away when the page is not a candidate; a
    /// skipped page is not an error.
    async fn run(&self, page: &Page, ctx: &AuditContext) -> Result<()>;
}

/// Everything a running module may touch, bound to that module.
#[derive(Clone)]
pub struct AuditContext {
    pub http: Arc<dyn HttpClient>,
    pub output: Arc<OutputConsole>,
    issues: Arc<IssueRegistry>,
    module: &'static ModuleInfo,
}

impl AuditContext {
    pub fn new(
        module: &'static ModuleInfo,
        http: Arc<dyn HttpClient>,
        issues: Arc<IssueRegistry>,
        output: Arc<OutputConsole>,
    ) -> Self {
        Self {
            http,
            output,
            issues,
            module,
        }
    }

    /// Records a finding annotated with the module's issue template.
    pub fn log_issue(&self, data: IssueData) -> Result<Arc<Issue>> {
        let issue = Issue::new(self.module, data)?;
        Ok(self.issues.log(issue))
    }
}

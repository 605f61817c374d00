// src/core/runner.rs

use crate::config::RuntimeConfig;
use crate::core::http::HttpClient;
use crate::core::issues::IssueRegistry;
use crate::core::models::{Element, Page};
use crate::core::module::{AuditContext, Module};
use crate::error::Result;
use crate::output::OutputConsole;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use url::Url;

/// Counters for one or more audited pages.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_audited: usize,
    pub pages_skipped: usize,
    pub modules_run: usize,
    pub modules_failed: usize,
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.pages_audited += other.pages_audited;
        self.pages_skipped += other.pages_skipped;
        self.modules_run += other.modules_run;
        self.modules_failed += other.modules_failed;
    }
}

/// Dispatches modules against pages.
///
/// Modules auditing the same page run concurrently, each in its own task: an
/// error or panic in one is reported through `print_error` and does not stop
/// the others.
#[derive(Clone)]
pub struct ModuleRunner {
    modules: Vec<Arc<dyn Module>>,
    http: Arc<dyn HttpClient>,
    issues: Arc<IssueRegistry>,
    output: Arc<OutputConsole>,
    elements: BTreeSet<Element>,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    threads: usize,
}

impl ModuleRunner {
    pub fn new(
        config: &RuntimeConfig,
        modules: Vec<Arc<dyn Module>>,
        http: Arc<dyn HttpClient>,
        issues: Arc<IssueRegistry>,
        output: Arc<OutputConsole>,
    ) -> Result<Self> {
        Ok(Self {
            modules,
            http,
            issues,
            output,
            elements: config.enabled_elements(),
            include: config.include_patterns()?,
            exclude: config.exclude_patterns()?,
            threads: config.threads.max(1),
        })
    }

    pub fn issues(&self) -> &Arc<IssueRegistry> {
        &self.issues
    }

    /// Modules whose declared elements are enabled for this run.
    pub fn applicable(&self) -> Vec<Arc<dyn Module>> {
        self.modules
            .iter()
            .filter(|m| m.metadata().applies_to(&self.elements))
            .cloned()
            .collect()
    }

    /// Whether the include/exclude patterns allow auditing `url`.
    pub fn in_scope(&self, url: &Url) -> bool {
        let url = url.as_str();
        if self.exclude.iter().any(|re| re.is_match(url)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(url))
    }

    /// Runs every applicable module against one page and waits for all of
    /// them, including their follow-up requests.
    pub async fn audit(&self, page: Page) -> RunSummary {
        let mut summary = RunSummary::default();

        if !self.in_scope(&page.url) {
            debug!(url = %page.url, "Page out of scope.");
            self.output
                .print_verbose(&format!("Skipping out of scope page: {}", page.url), false);
            summary.pages_skipped = 1;
            return summary;
        }

        let page = Arc::new(page);
        self.output
            .print_verbose(&format!("Auditing: {}", page.url), false);

        let mut set = JoinSet::new();
        for module in self.applicable() {
            let info = module.metadata();
            let ctx = AuditContext::new(
                info,
                Arc::clone(&self.http),
                Arc::clone(&self.issues),
                Arc::clone(&self.output),
            );
            let page = Arc::clone(&page);

            set.spawn(async move {
                debug!(module = %info.shortname, url = %page.url, "Executing module.");
                let result = module.run(&page, &ctx).await;
                (info, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            summary.modules_run += 1;
            match joined {
                Ok((info, Ok(()))) => {
                    debug!(module = %info.shortname, url = %page.url, "Module completed.");
                }
                Ok((info, Err(e))) => {
                    summary.modules_failed += 1;
                    error!(module = %info.shortname, url = %page.url, error = %e, "Module failed.");
                    self.output.print_error(&format!(
                        "Module '{}' failed on {}: {e}",
                        info.shortname, page.url
                    ));
                    self.output.print_debug_backtrace(&e);
                }
                Err(e) => {
                    summary.modules_failed += 1;
                    error!(url = %page.url, error = %e, "Module task panicked.");
                    self.output
                        .print_error(&format!("Module task aborted on {}: {e}", page.url));
                }
            }
        }

        summary.pages_audited = 1;
        summary
    }

    /// Audits a stream of pages, at most `threads` at a time.
    pub async fn audit_all<I>(&self, pages: I) -> RunSummary
    where
        I: IntoIterator<Item = Page>,
    {
        let permits = Arc::new(Semaphore::new(self.threads));
        let mut set = JoinSet::new();

        for page in pages {
            let runner = self.clone();
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                // The semaphore is never closed, so acquiring only waits.
                let _permit = permits.acquire_owned().await.ok();
                runner.audit(page).await
            });
        }

        let mut summary = RunSummary::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(page_summary) => summary += page_summary,
                Err(e) => {
                    error!(error = %e, "Page audit task panicked.");
                    self.output
                        .print_error(&format!("Page audit aborted: {e}"));
                }
            }
        }

        info!(
            pages = summary.pages_audited,
            skipped = summary.pages_skipped,
            failures = summary.modules_failed,
            issues = self.issues.len(),
            "Audit finished."
        );
        summary
    }
}

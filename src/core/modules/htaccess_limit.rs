// src/core/modules/htaccess_limit.rs

use crate::core::issues::IssueData;
use crate::core::models::{Element, IssueTemplate, ModuleInfo, Page, Severity};
use crate::core::module::{AuditContext, Module};
use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

static INFO: Lazy<ModuleInfo> = Lazy::new(|| ModuleInfo {
    shortname: "htaccess_limit".into(),
    name: ".htaccess LIMIT misconfiguration".into(),
    description: "Checks for misconfiguration in LIMIT directives that blocks GET requests \
                  but allows POST."
        .into(),
    version: "0.1.2".into(),
    author: "Vanguard contributors".into(),
    references: BTreeMap::new(),
    targets: [("Generic".to_string(), "all".to_string())].into(),
    elements: BTreeSet::new(),
    issue: IssueTemplate {
        name: "Misconfiguration in LIMIT directive of .htaccess file.".into(),
        description: "The .htaccess file blocks GET requests but allows POST.".into(),
        tags: ["htaccess", "server", "limit"].map(String::from).into(),
        cwe: String::new(),
        severity: Severity::High,
        cvss: String::new(),
        remedy_guidance: String::new(),
        remedy_code: String::new(),
    },
});

/// Detects access restrictions that only cover some HTTP methods.
///
/// A page answering 401 is re-requested with POST; a 200 means the
/// `<Limit>` block protects GET but lets POST through.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtaccessLimit;

#[async_trait]
impl Module for HtaccessLimit {
    fn info() -> &'static ModuleInfo {
        &INFO
    }

    fn metadata(&self) -> &'static ModuleInfo {
        Self::info()
    }

    async fn run(&self, page: &Page, ctx: &AuditContext) -> Result<()> {
        if page.status_code != 401 {
            return Ok(());
        }

        debug!(url = %page.url, "Page requires authentication, retrying with POST.");
        // An unreachable server simply isn't vulnerable; nothing to report.
        let response = match ctx.http.post(&page.url).await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %page.url, error = %e, "POST did not complete.");
                ctx.output
                    .print_debug(&format!("POST to {} failed: {e}", page.url), false);
                return Ok(());
            }
        };

        if response.status_code != 200 {
            debug!(url = %page.url, status = response.status_code, "POST was rejected too.");
            return Ok(());
        }

        info!(url = %response.effective_url, "POST accepted where GET was denied.");
        ctx.log_issue(IssueData::from_response(&response, Element::Server))?;
        ctx.output.print_ok(
            &format!("Request was accepted: {}", response.effective_url),
            false,
        );
        Ok(())
    }
}

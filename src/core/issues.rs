// src/core/issues.rs

//! Issue records and the registry modules log them into.

use crate::core::models::{Element, Headers, HttpMethod, HttpResponse, IssueTemplate, ModuleInfo};
use crate::error::{AuditError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use url::Url;

/// What a module supplies when it reports a finding.
///
/// The template half of the issue comes from the module's metadata, so only
/// the exchange-specific fields live here.
#[derive(Debug, Clone, Default)]
pub struct IssueData {
    pub url: String,
    pub method: Option<HttpMethod>,
    pub element: Option<Element>,
    pub response: String,
    pub request_headers: Headers,
    pub response_headers: Headers,
}

impl IssueData {
    /// Captures everything about a completed exchange.
    pub fn from_response(response: &HttpResponse, element: Element) -> Self {
        Self {
            url: response.effective_url.to_string(),
            method: Some(response.request.method),
            element: Some(element),
            response: response.body.clone(),
            request_headers: response.request.headers.clone(),
            response_headers: response.headers.clone(),
        }
    }
}

/// A recorded finding. Never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    /// Shortname of the module that logged it.
    pub module: String,
    pub url: Url,
    pub method: HttpMethod,
    pub element: Element,
    pub response_body: String,
    pub request_headers: Headers,
    pub response_headers: Headers,
    #[serde(flatten)]
    pub template: IssueTemplate,
    pub logged_at: DateTime<Utc>,
}

impl Issue {
    /// Builds an issue from a module's template and the reported data.
    ///
    /// Rejects data missing the url, method or element instead of storing a
    /// partial record.
    pub fn new(info: &ModuleInfo, data: IssueData) -> Result<Self> {
        if data.url.trim().is_empty() {
            return Err(AuditError::MalformedIssue(format!(
                "{}: missing url",
                info.shortname
            )));
        }
        let url = Url::parse(&data.url).map_err(|e| {
            AuditError::MalformedIssue(format!("{}: invalid url '{}': {e}", info.shortname, data.url))
        })?;
        let method = data.method.ok_or_else(|| {
            AuditError::MalformedIssue(format!("{}: missing method", info.shortname))
        })?;
        let element = data.element.ok_or_else(|| {
            AuditError::MalformedIssue(format!("{}: missing element", info.shortname))
        })?;

        Ok(Self {
            module: info.shortname.clone(),
            url,
            method,
            element,
            response_body: data.response,
            request_headers: data.request_headers,
            response_headers: data.response_headers,
            template: info.issue.clone(),
            logged_at: Utc::now(),
        })
    }

    /// Identity used when collapsing repeated findings.
    fn dedup_key(&self) -> (String, HttpMethod, Element, String) {
        (
            self.url.as_str().to_string(),
            self.method,
            self.element,
            self.template.name.clone(),
        )
    }
}

/// Thread-safe, insertion-ordered store of logged issues.
///
/// Every call to [`IssueRegistry::log`] is kept; [`IssueRegistry::deduplicated`]
/// offers the collapsed view for reporting.
#[derive(Debug, Default)]
pub struct IssueRegistry {
    issues: Mutex<Vec<Arc<Issue>>>,
}

impl IssueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an issue and hands back the shared record.
    pub fn log(&self, issue: Issue) -> Arc<Issue> {
        let issue = Arc::new(issue);
        let mut issues = self.issues.lock().unwrap_or_else(PoisonError::into_inner);
        issues.push(Arc::clone(&issue));
        debug!(
            module = %issue.module,
            url = %issue.url,
            total = issues.len(),
            "Issue logged."
        );
        issue
    }

    /// Snapshot of every logged issue in insertion order.
    pub fn issues(&self) -> Vec<Arc<Issue>> {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Issues with repeats of (url, method, element, issue name) removed,
    /// keeping the first occurrence.
    pub fn deduplicated(&self) -> Vec<Arc<Issue>> {
        let mut seen = HashSet::new();
        self.issues()
            .into_iter()
            .filter(|issue| seen.insert(issue.dedup_key()))
            .collect()
    }

    /// Pretty JSON of every logged issue, for reporting collaborators.
    pub fn to_json(&self) -> Result<String> {
        let issues: Vec<Issue> = self.issues().iter().map(|i| Issue::clone(i)).collect();
        Ok(serde_json::to_string_pretty(&issues)?)
    }
}

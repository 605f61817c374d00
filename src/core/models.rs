// src/core/models.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumString};
use url::Url;

// --- Reusable Types ---

/// Header names mapped to their (comma-joined) values.
///
/// A `BTreeMap` keeps the dump order stable, which matters for issue
/// serialization and for comparing captured exchanges in tests.
pub type Headers = BTreeMap<String, String>;

// --- Core Data Models ---

/// Severity level of an issue, ordered from least to most serious.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display,
    EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// The page surface a module audits.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Element {
    Link,
    Form,
    Cookie,
    Header,
    Body,
    Path,
    Server,
}

/// HTTP request method, rendered upper-case (`GET`, `POST`, ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

// --- Module Metadata ---

/// The issue a module reports, declared once per module type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueTemplate {
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub cwe: String,
    pub severity: Severity,
    pub cvss: String,
    pub remedy_guidance: String,
    pub remedy_code: String,
}

/// Static, side-effect free description of a module.
///
/// Used both for module listing and for annotating every issue the module
/// logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Short identifier used for lookups (e.g. "htaccess_limit").
    pub shortname: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub references: BTreeMap<String, String>,
    /// Platform name mapped to the affected version range.
    pub targets: BTreeMap<String, String>,
    /// Surfaces the module audits. Empty means server-level.
    pub elements: BTreeSet<Element>,
    pub issue: IssueTemplate,
}

impl ModuleInfo {
    /// Whether the module audits at least one of the given surfaces.
    ///
    /// Server-level modules (no declared elements) always apply.
    pub fn applies_to(&self, enabled: &BTreeSet<Element>) -> bool {
        self.elements.is_empty() || !self.elements.is_disjoint(enabled)
    }
}

// --- HTTP Exchange Models ---

/// The request half of an exchange, as it was actually sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
}

/// A completed HTTP exchange handed to a module continuation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub effective_url: Url,
    pub status_code: u16,
    pub body: String,
    /// Response headers.
    pub headers: Headers,
    pub request: RequestInfo,
}

/// A resource supplied by the crawler, consumed read-only by modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub url: Url,
    pub status_code: u16,
    pub body: String,
    pub request_method: HttpMethod,
    pub request_headers: Headers,
    pub response_headers: Headers,
}

impl Page {
    /// A GET page with no body or headers.
    pub fn new(url: Url, status_code: u16) -> Self {
        Self {
            url,
            status_code,
            body: String::new(),
            request_method: HttpMethod::Get,
            request_headers: Headers::new(),
            response_headers: Headers::new(),
        }
    }
}

impl From<HttpResponse> for Page {
    fn from(response: HttpResponse) -> Self {
        Self {
            url: response.effective_url,
            status_code: response.status_code,
            body: response.body,
            request_method: response.request.method,
            request_headers: response.request.headers,
            response_headers: response.headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_severity_ordering_and_display() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::High.to_string(), "HIGH");
        assert_eq!(Severity::from_str("MEDIUM").unwrap(), Severity::Medium);
    }

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!(HttpMethod::from_str("post").unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(reqwest::Method::from(HttpMethod::Post), reqwest::Method::POST);
    }

    #[test]
    fn test_applies_to() {
        let mut info_elements = BTreeSet::new();
        let enabled: BTreeSet<Element> = [Element::Link].into_iter().collect();

        let server_level = sample_info(info_elements.clone());
        assert!(server_level.applies_to(&enabled));
        assert!(server_level.applies_to(&BTreeSet::new()));

        info_elements.insert(Element::Form);
        let forms_only = sample_info(info_elements);
        assert!(!forms_only.applies_to(&enabled));
    }

    #[test]
    fn test_page_from_response() {
        let url = Url::parse("http://example.com/a").unwrap();
        let response = HttpResponse {
            effective_url: url.clone(),
            status_code: 401,
            body: "denied".into(),
            headers: [("www-authenticate".to_string(), "Basic".to_string())].into(),
            request: RequestInfo {
                method: HttpMethod::Get,
                url: url.clone(),
                headers: Headers::new(),
            },
        };
        let page = Page::from(response);
        assert_eq!(page.url, url);
        assert_eq!(page.status_code, 401);
        assert_eq!(page.response_headers["www-authenticate"], "Basic");
    }

    fn sample_info(elements: BTreeSet<Element>) -> ModuleInfo {
        ModuleInfo {
            shortname: "sample".into(),
            name: "Sample".into(),
            description: String::new(),
            version: "0.1".into(),
            author: String::new(),
            references: BTreeMap::new(),
            targets: BTreeMap::new(),
            elements,
            issue: IssueTemplate {
                name: "Sample issue".into(),
                description: String::new(),
                tags: BTreeSet::new(),
                cwe: String::new(),
                severity: Severity::Low,
                cvss: String::new(),
                remedy_guidance: String::new(),
                remedy_code: String::new(),
            },
        }
    }
}

// src/config.rs

//! Resolved runtime configuration.
//!
//! Built from defaults, then an optional JSON file named by
//! `VANGUARD_AUDIT_CONFIG`, then individual `VANGUARD_AUDIT_*` variables.
//! The resolved value is what the error log dumps under `OPTIONS:`.

use crate::core::models::Element;
use crate::error::{AuditError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const ENV_PREFIX: &str = "VANGUARD_AUDIT_";
pub const CONFIG_FILE_ENV: &str = "VANGUARD_AUDIT_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub verbose: bool,
    pub debug: bool,
    pub only_positives: bool,
    pub mute: bool,

    pub user_agent: String,
    pub timeout_secs: u64,
    pub redirect_limit: usize,

    /// Pages audited in parallel.
    pub threads: usize,

    pub audit_links: bool,
    pub audit_forms: bool,
    pub audit_cookies: bool,
    pub audit_headers: bool,

    /// Only pages matching one of these are audited (when non-empty).
    pub include: Vec<String>,
    /// Pages matching any of these are skipped.
    pub exclude: Vec<String>,

    pub error_log: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            debug: false,
            only_positives: false,
            mute: false,
            user_agent: format!("VanguardAudit/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
            redirect_limit: 10,
            threads: 3,
            audit_links: true,
            audit_forms: true,
            audit_cookies: true,
            audit_headers: true,
            include: Vec::new(),
            exclude: Vec::new(),
            error_log: PathBuf::from("error.log"),
        }
    }
}

impl RuntimeConfig {
    /// Resolves the configuration from the process environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Applies `VANGUARD_AUDIT_*` overrides from the given variables.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "VERBOSE" => self.verbose = parse_value(name, &value)?,
                "DEBUG" => self.debug = parse_value(name, &value)?,
                "ONLY_POSITIVES" => self.only_positives = parse_value(name, &value)?,
                "MUTE" => self.mute = parse_value(name, &value)?,
                "USER_AGENT" => self.user_agent = value,
                "TIMEOUT_SECS" => self.timeout_secs = parse_value(name, &value)?,
                "REDIRECT_LIMIT" => self.redirect_limit = parse_value(name, &value)?,
                "THREADS" => self.threads = parse_value(name, &value)?,
                "AUDIT_LINKS" => self.audit_links = parse_value(name, &value)?,
                "AUDIT_FORMS" => self.audit_forms = parse_value(name, &value)?,
                "AUDIT_COOKIES" => self.audit_cookies = parse_value(name, &value)?,
                "AUDIT_HEADERS" => self.audit_headers = parse_value(name, &value)?,
                "INCLUDE" => self.include = split_list(&value),
                "EXCLUDE" => self.exclude = split_list(&value),
                "ERROR_LOG" => self.error_log = PathBuf::from(value),
                // CONFIG names the file itself; LOGLEVEL belongs to the tracing filter.
                "CONFIG" | "LOGLEVEL" => {}
                other => debug!(variable = other, "Ignoring unknown configuration variable."),
            }
        }
        Ok(())
    }

    /// Rejects values the runner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(AuditError::Config("threads must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(AuditError::Config("timeout_secs must be at least 1".into()));
        }
        self.include_patterns()?;
        self.exclude_patterns()?;
        Ok(())
    }

    pub fn include_patterns(&self) -> Result<Vec<Regex>> {
        compile(&self.include)
    }

    pub fn exclude_patterns(&self) -> Result<Vec<Regex>> {
        compile(&self.exclude)
    }

    /// Surfaces modules are allowed to audit.
    pub fn enabled_elements(&self) -> BTreeSet<Element> {
        let mut elements: BTreeSet<Element> =
            [Element::Server, Element::Body, Element::Path].into_iter().collect();
        if self.audit_links {
            elements.insert(Element::Link);
        }
        if self.audit_forms {
            elements.insert(Element::Form);
        }
        if self.audit_cookies {
            elements.insert(Element::Cookie);
        }
        if self.audit_headers {
            elements.insert(Element::Header);
        }
        elements
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AuditError::Config(format!("invalid value '{value}' for {ENV_PREFIX}{name}")))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(AuditError::from))
        .collect()
}

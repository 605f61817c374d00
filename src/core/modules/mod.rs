// src/core/modules/mod.rs

//! Built-in audit modules and their catalogue.

pub mod htaccess_limit;

use crate::core::models::ModuleInfo;
use crate::core::module::Module;
use std::sync::Arc;

use self::htaccess_limit::HtaccessLimit;

/// Every built-in module, ready to hand to the runner.
pub fn available() -> Vec<Arc<dyn Module>> {
    vec![Arc::new(HtaccessLimit)]
}

/// Metadata of every built-in module, for listing.
///
/// Reads the declarations only; no module is run.
pub fn catalog() -> Vec<&'static ModuleInfo> {
    vec![HtaccessLimit::info()]
}

/// Looks a module up by its shortname.
pub fn find(shortname: &str) -> Option<Arc<dyn Module>> {
    available()
        .into_iter()
        .find(|m| m.metadata().shortname == shortname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_available() {
        let names: Vec<&str> = catalog().iter().map(|i| i.shortname.as_str()).collect();
        let available: Vec<String> = available()
            .iter()
            .map(|m| m.metadata().shortname.clone())
            .collect();
        assert_eq!(names, available);
    }

    #[test]
    fn test_catalog_serializes() {
        let json = serde_json::to_value(catalog()).unwrap();
        assert_eq!(json[0]["issue"]["severity"], "HIGH");
        assert_eq!(json[0]["version"], "0.1.2");
    }

    #[test]
    fn test_find() {
        assert!(find("htaccess_limit").is_some());
        assert!(find("nope").is_none());
    }
}

// src/main.rs

use color_eyre::eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::{error, info};
use url::Url;
use vanguard_audit::config::RuntimeConfig;
use vanguard_audit::core::http::{HttpClient, ReqwestClient};
use vanguard_audit::core::issues::IssueRegistry;
use vanguard_audit::core::models::Page;
use vanguard_audit::core::modules;
use vanguard_audit::core::runner::ModuleRunner;
use vanguard_audit::logging::initialize_logging;
use vanguard_audit::output::OutputConsole;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = RuntimeConfig::load().wrap_err("Invalid configuration")?;
    let output = Arc::new(OutputConsole::new(&config));

    match initialize_logging(&config) {
        Ok(path) => output.print_debug(&format!("Diagnostic log: {}", path.display()), false),
        Err(e) => output.print_bad(&format!("Diagnostic logging disabled: {e}"), false),
    }

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::from_config(&config)?);
    let issues = Arc::new(IssueRegistry::new());
    let runner = ModuleRunner::new(
        &config,
        modules::available(),
        Arc::clone(&http),
        Arc::clone(&issues),
        Arc::clone(&output),
    )?;

    for module in runner.applicable() {
        let meta = module.metadata();
        output.print_info(&format!("Loaded module: {} v{}", meta.name, meta.version), false);
    }

    // Each argument is a page handed over by the crawler.
    let mut pages = Vec::new();
    for target in std::env::args().skip(1) {
        let url = match Url::parse(&target) {
            Ok(url) => url,
            Err(e) => {
                output.print_error(&format!("Invalid URL '{target}': {e}"));
                continue;
            }
        };
        output.print_status(&format!("Fetching {url}"), false);
        match http.get(&url).await {
            Ok(response) => pages.push(Page::from(response)),
            Err(e) => {
                error!(url = %url, error = %e, "Could not fetch page.");
                output.print_error(&format!("Could not fetch {url}: {e}"));
            }
        }
    }

    let summary = runner.audit_all(pages).await;
    info!(?summary, "Run complete.");
    output.print_status(
        &format!(
            "Audited {} page(s), {} module failure(s), {} issue(s) logged.",
            summary.pages_audited,
            summary.modules_failed,
            issues.len()
        ),
        false,
    );

    if !issues.is_empty() {
        output.print_line(&issues.to_json()?, false);
    }

    Ok(())
}

use std::sync::Arc;

use {
    anyhow::Result,
    davdrop_config::{DavdropConfig, Severity, ValidationResult, validate},
    davdrop_relay::{ChannelRoutes, DirectoryCatalog},
    davdrop_webdav::RemoteStore,
};

use crate::build_store;

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn count(result: &ValidationResult, severity: Severity) -> usize {
    result
        .diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .count()
}

/// Print every diagnostic to stderr and return the number of errors.
pub fn print_diagnostics(result: &ValidationResult) -> usize {
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        }
    }
    count(result, Severity::Error)
}

pub async fn check(config: &DavdropConfig) -> Result<()> {
    let result = validate(config);
    let errors = print_diagnostics(&result);
    let warnings = count(&result, Severity::Warning);

    if errors > 0 {
        eprintln!("\n{errors} error(s), {warnings} warning(s)");
        std::process::exit(1);
    }

    let store = build_store(config)?;
    eprintln!("Probing {}", store.base_url());
    match store.list_top_level().await {
        Ok(entries) => {
            let directories = entries.iter().filter(|e| e.is_directory).count();
            eprintln!(
                "  {BOLD}{GREEN}ok{RESET} {} entries ({directories} directories) at the root",
                entries.len()
            );
        },
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} {e}");
            std::process::exit(1);
        },
    }

    if warnings == 0 {
        eprintln!("\nNo issues found.");
    } else {
        eprintln!("\n0 error(s), {warnings} warning(s)");
    }
    Ok(())
}

pub async fn dirs(config: &DavdropConfig) -> Result<()> {
    let result = validate(config);
    if print_diagnostics(&result) > 0 {
        anyhow::bail!("configuration is invalid; run `davdrop check` for details");
    }

    let store = build_store(config)?;
    let routes = Arc::new(ChannelRoutes::new(&config.channels));
    let catalog = DirectoryCatalog::new(store, routes);

    let directories = catalog.list_available().await;
    if directories.is_empty() {
        println!("No directories available.");
    }
    for directory in directories {
        println!("{directory}");
    }
    Ok(())
}

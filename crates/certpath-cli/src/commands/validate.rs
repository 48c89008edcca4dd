//! The `certpath validate` command.

use std::path::PathBuf;

use anyhow::Result;

use certpath_core::catalog::{parse_catalog, validate_catalog};

use super::Context;

pub fn execute(ctx: &Context, catalog_path: Option<PathBuf>) -> Result<()> {
    let path = match catalog_path {
        Some(path) => path,
        None => ctx.config()?.catalog,
    };
    let catalog = parse_catalog(&path)?;

    println!(
        "Pathway: {} ({} modules, {} quizzes)",
        catalog.name,
        catalog.modules().len(),
        catalog.quizzes().count()
    );

    let mut total_warnings = 0;
    for (title, reason) in catalog.blocked() {
        println!("  [{title}] BLOCKED: {reason}");
        total_warnings += 1;
    }

    let warnings = validate_catalog(&catalog);
    for w in &warnings {
        let prefix = w
            .module_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }
    total_warnings += warnings.len();

    if total_warnings == 0 {
        println!("Catalog valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

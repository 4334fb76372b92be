//! Handler for the `load` command.

use anyhow::{Context, Result};
use colored::Colorize;
use marktrack::engine::catalog::Catalog;
use marktrack::engine::config::TrackerConfig;
use marktrack::engine::db::{Db, DB_DIR};
use std::fs;
use std::path::Path;

/// Loads a JSON catalog into the database.
///
/// # Errors
/// Returns error if the file cannot be read or breaks any catalog invariant.
pub fn handle(file: &Path) -> Result<()> {
    let mut conn = Db::connect()?;
    let config = TrackerConfig::load(Path::new(DB_DIR))?;
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let catalog = Catalog::from_json(&text)?;
    let summary = catalog.load(&mut conn, &config)?;

    println!(
        "{} Loaded {} areas, {} employees, {} users, {} projects, {} marks",
        "✓".green(),
        summary.areas,
        summary.employees,
        summary.users,
        summary.projects,
        summary.marks
    );
    Ok(())
}

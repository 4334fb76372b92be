//! Handler for the `init` command.

use anyhow::Result;
use colored::Colorize;
use marktrack::engine::db::Db;

/// Initializes the tracker database.
///
/// # Errors
/// Returns error if database initialization fails.
pub fn handle() -> Result<()> {
    let path = Db::init()?;
    println!("{} Initialized {}", "✓".green(), path.display());
    Ok(())
}

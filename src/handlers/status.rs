//! Handler for the `status` command.

use anyhow::Result;
use colored::Colorize;
use marktrack::engine::config::TrackerConfig;
use marktrack::engine::db::{Db, DB_DIR};
use marktrack::engine::repo::SqliteStore;
use marktrack::engine::report::MarkProgress;
use marktrack::engine::resolver::MarkResolver;
use marktrack::engine::store::{HistorySource, SettingsSource};
use std::path::Path;

/// Displays per-area progress of a mark.
///
/// # Errors
/// Returns error if the mark cannot be resolved or a query fails.
pub fn handle(mark_ref: &str, json: bool) -> Result<()> {
    let conn = Db::connect()?;
    let config = TrackerConfig::load(Path::new(DB_DIR))?;
    let mark = MarkResolver::new(&conn).resolve(mark_ref)?.mark;
    let store = SqliteStore::new(conn, config.count_multiplicity);

    let settings = store.project_areas(mark.project_id)?;
    let completed = store.completed_by_area(mark.id)?;
    let report = MarkProgress::build(&mark, &settings, &completed);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} [{}] {}  x{}  ({} kg total)",
        "📊".cyan(),
        report.code.yellow(),
        report.title,
        report.count,
        report.total_weight
    );
    println!(
        "   {} of {} areas finished",
        report.finished_areas(),
        report.areas.len()
    );
    println!();

    for area in &report.areas {
        let icon = if area.is_finished() {
            "✓".green()
        } else if area.completed.is_zero() {
            "○".dimmed()
        } else {
            "◐".yellow()
        };
        let gate = if area.executors_required {
            " (executors required)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "   {} {:<12} done {:>6}  left {:>6}  {}{}",
            icon,
            area.title,
            area.completed,
            area.remaining,
            format!("{} kg", area.completed_weight).dimmed(),
            gate
        );
    }
    Ok(())
}

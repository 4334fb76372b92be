//! Handler for the `history` command.

use anyhow::Result;
use colored::Colorize;
use marktrack::engine::db::Db;
use marktrack::engine::repo::{AreaRepo, CompletionRepo, DirectoryRepo};
use marktrack::engine::resolver::MarkResolver;
use std::collections::HashMap;

/// Displays recorded completions of a mark, newest first.
///
/// # Errors
/// Returns error if the mark cannot be resolved or a query fails.
pub fn handle(mark_ref: &str, limit: usize) -> Result<()> {
    let conn = Db::connect()?;
    let mark = MarkResolver::new(&conn).resolve(mark_ref)?.mark;
    let events = CompletionRepo::new(&conn).history(mark.id, limit)?;

    let areas: HashMap<i64, String> = AreaRepo::new(&conn)
        .get_all()?
        .into_iter()
        .map(|a| (a.id, a.title))
        .collect();
    let directory = DirectoryRepo::new(&conn);
    let employees = directory.employee_names()?;
    let users = directory.user_logins()?;

    println!(
        "{} History of [{}] {} (last {})",
        "📜".cyan(),
        mark.code.yellow(),
        mark.title,
        limit
    );
    println!();

    if events.is_empty() {
        println!("   (No completions recorded yet)");
        return Ok(());
    }

    for event in events {
        let area = areas.get(&event.area_id).map_or("?", String::as_str);
        let creator = users.get(&event.creator_id).map_or("?", String::as_str);
        let executors: Vec<&str> = event
            .executor_ids
            .iter()
            .map(|id| employees.get(id).map_or("?", String::as_str))
            .collect();

        println!(
            "   {}  {:<12} {:>6}  {}  {}",
            event.date.to_string().dimmed(),
            area.bold(),
            event.count,
            format!("by {creator}").dimmed(),
            executors.join(", ")
        );
        if let Some(remark) = &event.remark {
            println!("                 {}", remark.dimmed());
        }
    }
    Ok(())
}

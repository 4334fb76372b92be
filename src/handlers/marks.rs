//! Handler for the `marks` command.

use anyhow::Result;
use colored::Colorize;
use marktrack::engine::db::Db;
use marktrack::engine::repo::{DirectoryRepo, MarkRepo};
use serde::Serialize;

#[derive(Serialize)]
struct MarkView {
    id: i64,
    project: String,
    code: String,
    title: String,
    count: String,
    weight: String,
}

/// Lists all marks.
///
/// # Errors
/// Returns error if database query fails.
pub fn handle(json: bool) -> Result<()> {
    let conn = Db::connect()?;
    let marks = MarkRepo::new(&conn).get_all()?;
    let projects = DirectoryRepo::new(&conn).project_titles()?;

    let views: Vec<MarkView> = marks
        .into_iter()
        .map(|m| MarkView {
            id: m.id,
            project: projects.get(&m.project_id).cloned().unwrap_or_default(),
            code: m.code,
            title: m.title,
            count: m.count.to_string(),
            weight: m.weight.to_string(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    println!("{} Marks:", "📋".cyan());
    if views.is_empty() {
        println!("   (No marks loaded)");
        return Ok(());
    }
    for m in views {
        println!(
            "   {:>4}  [{}] {} {}  x{}  {}",
            m.id.to_string().dimmed(),
            m.code.yellow(),
            m.title,
            format!("({})", m.project).dimmed(),
            m.count,
            format!("{} kg/unit", m.weight).dimmed()
        );
    }
    Ok(())
}

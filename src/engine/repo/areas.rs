//! Area Repository: work areas and their per-project settings.

use crate::engine::types::{AreaSetting, WorkArea};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

const AREA_SELECT: &str = "SELECT id, title, ord, remark FROM areas";

pub struct AreaRepo<'a> {
    conn: &'a Connection,
}

impl<'a> AreaRepo<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Adds a work area.
    ///
    /// # Errors
    /// Returns an error if the title or order is already taken.
    pub fn add(&self, title: &str, order: i64, remark: Option<&str>) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO areas (title, ord, remark) VALUES (?1, ?2, ?3)",
                params![title, order, remark],
            )
            .with_context(|| format!("Failed to add area '{title}'"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Retrieves all areas in flow order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn get_all(&self) -> Result<Vec<WorkArea>> {
        let mut stmt = self.conn.prepare(&format!("{AREA_SELECT} ORDER BY ord"))?;
        let rows = stmt.query_map([], row_to_area)?;
        let mut areas = Vec::new();
        for area in rows {
            areas.push(area?);
        }
        Ok(areas)
    }

    /// Finds an area by its internal ID.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_by_id(&self, id: i64) -> Result<Option<WorkArea>> {
        let sql = format!("{AREA_SELECT} WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], row_to_area)
            .optional()
            .context("Search by ID failed")
    }

    /// Finds an area by title (case-insensitive).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_by_title(&self, title: &str) -> Result<Option<WorkArea>> {
        let lower = title.trim().to_lowercase();
        Ok(self.get_all()?.into_iter().find(|a| a.title.to_lowercase() == lower))
    }

    /// Enables an area for a project.
    ///
    /// # Errors
    /// Returns an error if the project or area does not exist.
    pub fn enable(&self, project_id: i64, area_id: i64, executors_required: bool) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO project_areas (project_id, area_id, executors_required)
                 VALUES (?1, ?2, ?3)",
                params![project_id, area_id, executors_required],
            )
            .context("Failed to enable area for project")?;
        Ok(())
    }

    /// The areas enabled for a project, in flow order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn project_settings(&self, project_id: i64) -> Result<Vec<AreaSetting>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.title, a.ord, a.remark, pa.executors_required
             FROM project_areas pa
             JOIN areas a ON a.id = pa.area_id
             WHERE pa.project_id = ?1
             ORDER BY a.ord",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(AreaSetting {
                area: row_to_area(row)?,
                executors_required: row.get(4)?,
            })
        })?;

        let mut settings = Vec::new();
        for s in rows {
            settings.push(s?);
        }
        Ok(settings)
    }
}

fn row_to_area(row: &Row) -> rusqlite::Result<WorkArea> {
    Ok(WorkArea {
        id: row.get(0)?,
        title: row.get(1)?,
        order: row.get(2)?,
        remark: row.get(3)?,
    })
}

//! Mark Repository: production marks.

use super::decimal_at;
use crate::engine::types::ProductionMark;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub const MARK_SELECT: &str =
    "SELECT id, project_id, code, title, ord, weight, count, remark FROM marks";

/// A mark to be inserted.
#[derive(Debug, Clone)]
pub struct NewMark {
    pub project_id: i64,
    pub code: String,
    pub title: String,
    pub order: i64,
    pub weight: Decimal,
    pub count: Decimal,
    pub remark: Option<String>,
}

pub struct MarkRepo<'a> {
    conn: &'a Connection,
}

impl<'a> MarkRepo<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Adds a mark to a project.
    ///
    /// # Errors
    /// Returns an error if the code is already used in the project.
    pub fn add(&self, mark: &NewMark) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO marks (project_id, code, title, ord, weight, count, remark)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    mark.project_id,
                    mark.code,
                    mark.title,
                    mark.order,
                    mark.weight.to_string(),
                    mark.count.to_string(),
                    mark.remark
                ],
            )
            .with_context(|| format!("Failed to add mark '{}'", mark.code))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Retrieves all marks, grouped by project and ordered within it.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn get_all(&self) -> Result<Vec<ProductionMark>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MARK_SELECT} ORDER BY project_id, ord, code"))?;
        let rows = stmt.query_map([], row_to_mark)?;
        let mut marks = Vec::new();
        for mark in rows {
            marks.push(mark?);
        }
        Ok(marks)
    }

    /// Finds a mark by its internal ID.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_by_id(&self, id: i64) -> Result<Option<ProductionMark>> {
        let sql = format!("{MARK_SELECT} WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], row_to_mark)
            .optional()
            .context("Search by ID failed")
    }

    /// Finds every mark with this code (case-insensitive), across projects.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_by_code(&self, code: &str) -> Result<Vec<ProductionMark>> {
        let lower = code.trim().to_lowercase();
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|m| m.code.to_lowercase() == lower)
            .collect())
    }
}

/// Converts a database row to a `ProductionMark`.
///
/// # Errors
/// Returns a `rusqlite` error if data conversion fails.
pub fn row_to_mark(row: &Row) -> rusqlite::Result<ProductionMark> {
    Ok(ProductionMark {
        id: row.get(0)?,
        project_id: row.get(1)?,
        code: row.get(2)?,
        title: row.get(3)?,
        order: row.get(4)?,
        weight: decimal_at(row, 5)?,
        count: decimal_at(row, 6)?,
        remark: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::db::Db;
    use crate::engine::repo::DirectoryRepo;

    fn new_mark(project_id: i64, code: &str) -> NewMark {
        NewMark {
            project_id,
            code: code.to_string(),
            title: "Column".to_string(),
            order: 2,
            weight: Decimal::new(3405, 2),
            count: Decimal::new(75, 1),
            remark: Some("galvanized".to_string()),
        }
    }

    #[test]
    fn test_add_and_read_back_decimals() {
        let conn = Db::open_in_memory().unwrap();
        let project = DirectoryRepo::new(&conn).add_project("P").unwrap();
        let repo = MarkRepo::new(&conn);
        let id = repo.add(&new_mark(project, "K-1")).unwrap();

        let mark = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(mark.weight, Decimal::new(3405, 2));
        assert_eq!(mark.count, Decimal::new(75, 1));
        assert_eq!(mark.remark.as_deref(), Some("galvanized"));
    }

    #[test]
    fn test_code_unique_within_project_only() {
        let conn = Db::open_in_memory().unwrap();
        let directory = DirectoryRepo::new(&conn);
        let p1 = directory.add_project("P1").unwrap();
        let p2 = directory.add_project("P2").unwrap();
        let repo = MarkRepo::new(&conn);
        repo.add(&new_mark(p1, "K-1")).unwrap();
        assert!(repo.add(&new_mark(p1, "K-1")).is_err());
        repo.add(&new_mark(p2, "K-1")).unwrap();
        assert_eq!(repo.find_by_code("k-1").unwrap().len(), 2);
    }
}

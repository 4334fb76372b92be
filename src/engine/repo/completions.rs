//! Completion Repository: recorded completion events and their executors.

use super::decimal_at;
use crate::engine::types::{CompletionEvent, CompletionRecord};
use anyhow::Result;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct CompletionRepo<'a> {
    conn: &'a Connection,
}

impl<'a> CompletionRepo<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Inserts one completion with its executors.
    ///
    /// # Errors
    /// Returns an error if the insert violates a constraint.
    pub fn insert(&self, mark_id: i64, creator_id: i64, record: &CompletionRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO completions (mark_id, area_id, date, count, creator_id, remark)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                mark_id,
                record.area_id,
                record.date,
                record.count.to_string(),
                creator_id,
                record.remark
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        for employee_id in &record.executor_ids {
            self.conn.execute(
                "INSERT INTO completion_executors (completion_id, employee_id) VALUES (?1, ?2)",
                params![id, employee_id],
            )?;
        }
        Ok(id)
    }

    /// Sums completed quantity per area for a mark.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored count is malformed.
    pub fn completed_by_area(&self, mark_id: i64) -> Result<HashMap<i64, Decimal>> {
        let mut stmt = self
            .conn
            .prepare("SELECT area_id, count FROM completions WHERE mark_id = ?1")?;
        let rows = stmt.query_map(params![mark_id], |row| {
            Ok((row.get::<_, i64>(0)?, decimal_at(row, 1)?))
        })?;

        let mut sums = HashMap::new();
        for row in rows {
            let (area_id, count) = row?;
            *sums.entry(area_id).or_insert(Decimal::ZERO) += count;
        }
        Ok(sums)
    }

    /// Retrieves completion events for a mark, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn history(&self, mark_id: i64, limit: usize) -> Result<Vec<CompletionEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mark_id, area_id, date, count, creator_id, remark, created_at
             FROM completions WHERE mark_id = ?1
             ORDER BY date DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![mark_id, i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            Ok(CompletionEvent {
                id: row.get(0)?,
                mark_id: row.get(1)?,
                area_id: row.get(2)?,
                date: row.get(3)?,
                count: decimal_at(row, 4)?,
                creator_id: row.get(5)?,
                executor_ids: Vec::new(),
                remark: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut events = Vec::new();
        for event in rows {
            let mut event = event?;
            event.executor_ids = self.executors_of(event.id)?;
            events.push(event);
        }
        Ok(events)
    }

    /// Executor ids assigned to one completion.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn executors_of(&self, completion_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT employee_id FROM completion_executors
             WHERE completion_id = ?1 ORDER BY employee_id",
        )?;
        let rows = stmt.query_map(params![completion_id], |row| row.get(0))?;

        let mut ids = Vec::new();
        for id in rows {
            ids.push(id?);
        }
        Ok(ids)
    }
}

//! Repositories: all database operations, split by concern.
//!
//! `SqliteStore` ties them together behind the collaborator traits the
//! fill session consumes.

mod areas;
mod completions;
mod directory;
mod marks;

pub use areas::AreaRepo;
pub use completions::CompletionRepo;
pub use directory::DirectoryRepo;
pub use marks::{MarkRepo, NewMark};

use super::count::is_valid_count;
use super::error::StoreError;
use super::store::{ExecutionStore, HistorySource, SettingsSource};
use super::types::{AreaSetting, CompletionRecord, Operator};
use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::info;

/// Reads a decimal stored as TEXT.
pub(crate) fn decimal_at(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// The `SQLite`-backed settings, history and execution store.
pub struct SqliteStore {
    conn: Connection,
    multiplicity: Decimal,
}

impl SqliteStore {
    #[must_use]
    pub fn new(conn: Connection, multiplicity: Decimal) -> Self {
        Self { conn, multiplicity }
    }

    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Checks a batch against the current database state.
    fn check_batch(
        conn: &Connection,
        mark_id: i64,
        operator: &Operator,
        records: &[CompletionRecord],
        multiplicity: Decimal,
    ) -> Result<Vec<String>> {
        let marks = MarkRepo::new(conn);
        let Some(mark) = marks.find_by_id(mark_id)? else {
            return Ok(vec![format!("Mark {mark_id} does not exist")]);
        };

        let mut errors = Vec::new();
        let directory = DirectoryRepo::new(conn);
        if !directory.user_exists(operator.user_id)? {
            errors.push(format!("User '{}' does not exist", operator.login));
        }

        let areas = AreaRepo::new(conn);
        let enabled: HashMap<i64, String> = areas
            .project_settings(mark.project_id)?
            .into_iter()
            .map(|s| (s.area.id, s.area.title))
            .collect();
        let prior = CompletionRepo::new(conn).completed_by_area(mark_id)?;
        let mut totals: BTreeMap<i64, Decimal> = BTreeMap::new();

        for record in records {
            let Some(title) = enabled.get(&record.area_id) else {
                if areas.find_by_id(record.area_id)?.is_some() {
                    errors.push(format!(
                        "Area {} is not enabled for this project",
                        record.area_id
                    ));
                } else {
                    errors.push(format!("Area {} does not exist", record.area_id));
                }
                continue;
            };

            if !is_valid_count(record.count, multiplicity) {
                errors.push(format!("{title}: {} is not a valid count", record.count));
            }
            for employee_id in &record.executor_ids {
                if !directory.employee_exists(*employee_id)? {
                    errors.push(format!("{title}: executor {employee_id} does not exist"));
                }
            }
            *totals.entry(record.area_id).or_insert(Decimal::ZERO) += record.count;
        }

        for (area_id, added) in totals {
            let done = prior.get(&area_id).copied().unwrap_or(Decimal::ZERO);
            if done + added > mark.count {
                let title = enabled.get(&area_id).map_or("?", String::as_str);
                errors.push(format!(
                    "{title}: {} completed would exceed mark count {}",
                    done + added,
                    mark.count
                ));
            }
        }

        Ok(errors)
    }
}

impl SettingsSource for SqliteStore {
    fn project_areas(&self, project_id: i64) -> Result<Vec<AreaSetting>> {
        AreaRepo::new(&self.conn).project_settings(project_id)
    }
}

impl HistorySource for SqliteStore {
    fn completed_by_area(&self, mark_id: i64) -> Result<HashMap<i64, Decimal>> {
        CompletionRepo::new(&self.conn).completed_by_area(mark_id)
    }
}

impl ExecutionStore for SqliteStore {
    fn fill_execution(
        &mut self,
        mark_id: i64,
        operator: &Operator,
        records: &[CompletionRecord],
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let errors = Self::check_batch(&tx, mark_id, operator, records, self.multiplicity)?;
        if !errors.is_empty() {
            return Err(StoreError::Rejected(errors));
        }

        let repo = CompletionRepo::new(&tx);
        for record in records {
            repo.insert(mark_id, operator.user_id, record)?;
        }
        tx.commit()?;

        info!(mark_id, records = records.len(), "completions committed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::engine::db::Db;

    /// Ids created by [`plant`].
    pub struct Plant {
        pub conn: Connection,
        pub project_id: i64,
        pub area_ids: Vec<i64>,
        pub employee_id: i64,
        pub user_id: i64,
        pub mark_id: i64,
    }

    /// Three areas (КМД, ЛСБ, Сборка), one project using them all, one mark of 10.
    pub fn plant() -> Plant {
        let conn = Db::open_in_memory().unwrap();
        let (project_id, area_ids, employee_id, user_id, mark_id) = {
            let areas = AreaRepo::new(&conn);
            let area_ids: Vec<i64> = [("КМД", 1), ("ЛСБ", 2), ("Сборка", 3)]
                .iter()
                .map(|(title, order)| areas.add(title, *order, None).unwrap())
                .collect();
            let directory = DirectoryRepo::new(&conn);
            let project_id = directory.add_project("Bridge").unwrap();
            for id in &area_ids {
                areas.enable(project_id, *id, true).unwrap();
            }
            let employee_id = directory.add_employee("Ivanov").unwrap();
            let user_id = directory.add_user("master").unwrap();
            let mark_id = MarkRepo::new(&conn)
                .add(&NewMark {
                    project_id,
                    code: "B-1".to_string(),
                    title: "Main beam".to_string(),
                    order: 1,
                    weight: Decimal::new(125, 1),
                    count: Decimal::from(10),
                    remark: None,
                })
                .unwrap();
            (project_id, area_ids, employee_id, user_id, mark_id)
        };
        Plant {
            conn,
            project_id,
            area_ids,
            employee_id,
            user_id,
            mark_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::plant;
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn record(area_id: i64, count: i64, executors: &[i64]) -> CompletionRecord {
        CompletionRecord {
            area_id,
            executor_ids: executors.iter().copied().collect::<BTreeSet<_>>(),
            count: Decimal::from(count),
            date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            remark: None,
        }
    }

    #[test]
    fn test_fill_execution_commits_batch() {
        let p = plant();
        let (mark_id, user_id, employee) = (p.mark_id, p.user_id, p.employee_id);
        let (a1, a2) = (p.area_ids[0], p.area_ids[1]);
        let mut store = SqliteStore::new(p.conn, Decimal::new(5, 1));
        let op = Operator::new(user_id, "master");

        store
            .fill_execution(mark_id, &op, &[record(a1, 10, &[employee]), record(a2, 4, &[])])
            .unwrap();

        let done = store.completed_by_area(mark_id).unwrap();
        assert_eq!(done.get(&a1), Some(&Decimal::from(10)));
        assert_eq!(done.get(&a2), Some(&Decimal::from(4)));
    }

    #[test]
    fn test_bad_executor_rejects_whole_batch() {
        let p = plant();
        let (mark_id, user_id) = (p.mark_id, p.user_id);
        let (a1, a2) = (p.area_ids[0], p.area_ids[1]);
        let mut store = SqliteStore::new(p.conn, Decimal::new(5, 1));
        let op = Operator::new(user_id, "master");

        let err = store
            .fill_execution(mark_id, &op, &[record(a1, 2, &[]), record(a2, 2, &[999])])
            .unwrap_err();
        let StoreError::Rejected(errors) = err else {
            panic!("expected rejection");
        };
        assert_eq!(errors, ["ЛСБ: executor 999 does not exist"]);
        assert!(store.completed_by_area(mark_id).unwrap().is_empty());
    }

    #[test]
    fn test_rejection_lists_every_problem() {
        let p = plant();
        let mark_id = p.mark_id;
        let a1 = p.area_ids[0];
        let mut store = SqliteStore::new(p.conn, Decimal::new(5, 1));
        let op = Operator::new(404, "ghost");

        let err = store
            .fill_execution(mark_id, &op, &[record(a1, 6, &[]), record(a1, 6, &[]), record(77, 1, &[])])
            .unwrap_err();
        let StoreError::Rejected(errors) = err else {
            panic!("expected rejection");
        };
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("ghost"));
        assert!(errors[1].contains("Area 77 does not exist"));
        assert!(errors[2].contains("exceed mark count"));
    }

    #[test]
    fn test_unknown_mark_is_rejected() {
        let p = plant();
        let mut store = SqliteStore::new(p.conn, Decimal::new(5, 1));
        let op = Operator::new(p.user_id, "master");
        let err = store
            .fill_execution(4242, &op, &[record(p.area_ids[0], 1, &[])])
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(ref e) if e[0] == "Mark 4242 does not exist"));
    }

    #[test]
    fn test_disabled_area_is_rejected() {
        let p = plant();
        let extra = AreaRepo::new(&p.conn).add("Покраска", 4, None).unwrap();
        let mut store = SqliteStore::new(p.conn, Decimal::new(5, 1));
        let op = Operator::new(p.user_id, "master");
        let err = store
            .fill_execution(p.mark_id, &op, &[record(extra, 1, &[])])
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(ref e) if e[0].contains("not enabled")));
    }

    #[test]
    fn test_settings_come_back_in_order() {
        let p = plant();
        let store = SqliteStore::new(p.conn, Decimal::new(5, 1));
        let titles: Vec<_> = store
            .project_areas(p.project_id)
            .unwrap()
            .into_iter()
            .map(|s| s.area.title)
            .collect();
        assert_eq!(titles, ["КМД", "ЛСБ", "Сборка"]);
    }
}

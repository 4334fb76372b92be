//! Core types for the mark tracking system.
//!
//! Note: the transient fill state (`ChainEntry`) lives in `chain.rs`.
//! Everything here mirrors a stored row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A station in the production flow. `order` defines the flow sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkArea {
    pub id: i64,
    pub title: String,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl fmt::Display for WorkArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.title, self.order)
    }
}

/// A work area as enabled for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaSetting {
    pub area: WorkArea,
    pub executors_required: bool,
}

/// A batch of a manufactured item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductionMark {
    pub id: i64,
    pub project_id: i64,
    pub code: String,
    pub title: String,
    pub order: i64,
    pub weight: Decimal,
    pub count: Decimal,
    pub remark: Option<String>,
}

/// A recorded completion of some quantity of a mark in one area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionEvent {
    pub id: i64,
    pub mark_id: i64,
    pub area_id: i64,
    pub date: NaiveDate,
    pub count: Decimal,
    pub creator_id: i64,
    pub executor_ids: Vec<i64>,
    pub remark: Option<String>,
    pub created_at: String,
}

/// One area's finalized entry, ready to be persisted as a `CompletionEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    pub area_id: i64,
    pub executor_ids: BTreeSet<i64>,
    pub count: Decimal,
    pub date: NaiveDate,
    pub remark: Option<String>,
}

/// The user recording a fill; stored as the completion's creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub user_id: i64,
    pub login: String,
}

impl Operator {
    #[must_use]
    pub fn new(user_id: i64, login: &str) -> Self {
        Self {
            user_id,
            login: login.to_string(),
        }
    }
}

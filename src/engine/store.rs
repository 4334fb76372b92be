//! Collaborator seams: where the fill workflow reads settings and history,
//! and where it hands finished batches for persistence.

use super::error::StoreError;
use super::types::{AreaSetting, CompletionRecord, Operator};
use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Per-project area configuration.
pub trait SettingsSource {
    /// The areas enabled for the project, ordered by area order.
    ///
    /// # Errors
    /// Returns an error if the settings cannot be read.
    fn project_areas(&self, project_id: i64) -> Result<Vec<AreaSetting>>;
}

/// Completed quantities recorded before a session started.
pub trait HistorySource {
    /// Sum of completed quantity per area id for the mark.
    ///
    /// # Errors
    /// Returns an error if the history cannot be read.
    fn completed_by_area(&self, mark_id: i64) -> Result<HashMap<i64, Decimal>>;
}

/// Persists a fill as one batch.
pub trait ExecutionStore {
    /// Records every completion or none of them.
    ///
    /// # Errors
    /// Returns `StoreError::Rejected` listing every rule the batch breaks,
    /// or `StoreError::Backend` if the store itself fails.
    fn fill_execution(
        &mut self,
        mark_id: i64,
        operator: &Operator,
        records: &[CompletionRecord],
    ) -> Result<(), StoreError>;
}

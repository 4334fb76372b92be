//! Progress Report: how far a mark has moved through its areas.

use super::types::{AreaSetting, ProductionMark};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Progress of one mark in one area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaProgress {
    pub area_id: i64,
    pub title: String,
    pub order: i64,
    pub executors_required: bool,
    pub completed: Decimal,
    pub remaining: Decimal,
    /// `completed * mark.weight`
    pub completed_weight: Decimal,
}

impl AreaProgress {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining <= Decimal::ZERO
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkProgress {
    pub mark_id: i64,
    pub code: String,
    pub title: String,
    pub count: Decimal,
    pub unit_weight: Decimal,
    pub total_weight: Decimal,
    pub areas: Vec<AreaProgress>,
}

impl MarkProgress {
    /// Builds the report from the project's areas and the mark's completed sums.
    #[must_use]
    pub fn build(
        mark: &ProductionMark,
        settings: &[AreaSetting],
        completed: &HashMap<i64, Decimal>,
    ) -> Self {
        let mut areas: Vec<AreaProgress> = settings
            .iter()
            .map(|s| {
                let done = completed.get(&s.area.id).copied().unwrap_or(Decimal::ZERO);
                AreaProgress {
                    area_id: s.area.id,
                    title: s.area.title.clone(),
                    order: s.area.order,
                    executors_required: s.executors_required,
                    completed: done,
                    remaining: mark.count - done,
                    completed_weight: done * mark.weight,
                }
            })
            .collect();
        areas.sort_by_key(|a| a.order);

        Self {
            mark_id: mark.id,
            code: mark.code.clone(),
            title: mark.title.clone(),
            count: mark.count,
            unit_weight: mark.weight,
            total_weight: mark.count * mark.weight,
            areas,
        }
    }

    /// Number of areas where the whole count is done.
    #[must_use]
    pub fn finished_areas(&self) -> usize {
        self.areas.iter().filter(|a| a.is_finished()).count()
    }
}

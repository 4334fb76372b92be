//! Fill Session: one operator filling completions for one mark.
//!
//! The session owns the chain and a cache of completed quantities per area.
//! After a successful submission the cache is updated in place and the chain
//! is rebuilt from it; nothing is re-read from the store.

use super::chain::ExecutionChain;
use super::error::SubmitError;
use super::store::{ExecutionStore, HistorySource, SettingsSource};
use super::submission;
use super::types::{AreaSetting, CompletionRecord, Operator, ProductionMark};
use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

pub struct FillSession {
    mark: ProductionMark,
    operator: Operator,
    settings: Vec<AreaSetting>,
    completed: HashMap<i64, Decimal>,
    multiplicity: Decimal,
    chain: ExecutionChain,
}

impl FillSession {
    /// Opens a session, reading the project's areas and the mark's history once.
    ///
    /// # Errors
    /// Returns an error if either collaborator fails or history is inconsistent.
    pub fn open(
        settings: &dyn SettingsSource,
        history: &dyn HistorySource,
        mark: ProductionMark,
        operator: Operator,
        multiplicity: Decimal,
    ) -> Result<Self> {
        let settings = settings.project_areas(mark.project_id)?;
        let completed = history.completed_by_area(mark.id)?;
        let chain = ExecutionChain::build(&settings, &mark, &completed, multiplicity)?;

        info!(
            mark = %mark.code,
            operator = %operator.login,
            areas = chain.len(),
            "fill session opened"
        );

        Ok(Self {
            mark,
            operator,
            settings,
            completed,
            multiplicity,
            chain,
        })
    }

    #[must_use]
    pub fn mark(&self) -> &ProductionMark {
        &self.mark
    }

    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    #[must_use]
    pub fn chain(&self) -> &ExecutionChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut ExecutionChain {
        &mut self.chain
    }

    /// Completed quantity per area as currently known to this session.
    #[must_use]
    pub fn completed(&self) -> &HashMap<i64, Decimal> {
        &self.completed
    }

    /// Validates the chain and hands the batch to `store`.
    ///
    /// Returns the submitted records; an empty list means there was nothing to submit.
    ///
    /// # Errors
    /// Returns `SubmitError::Incomplete` before touching the store, or the store's
    /// rejection. The session is left unchanged on any error.
    pub fn submit<S>(&mut self, store: &mut S) -> Result<Vec<CompletionRecord>, SubmitError>
    where
        S: ExecutionStore + ?Sized,
    {
        let records = submission::assemble(&self.chain)?;
        if records.is_empty() {
            info!(mark = %self.mark.code, "nothing to submit");
            return Ok(records);
        }

        if let Err(err) = store.fill_execution(self.mark.id, &self.operator, &records) {
            warn!(mark = %self.mark.code, error = %err, "fill rejected");
            return Err(err.into());
        }

        let mut completed = self.completed.clone();
        for record in &records {
            *completed.entry(record.area_id).or_insert(Decimal::ZERO) += record.count;
        }
        let chain = ExecutionChain::build(&self.settings, &self.mark, &completed, self.multiplicity)
            .map_err(|e| SubmitError::Store(e.into()))?;

        self.completed = completed;
        self.chain = chain;
        info!(mark = %self.mark.code, records = records.len(), "fill submitted");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::StoreError;
    use crate::engine::types::WorkArea;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct Plant {
        areas: Vec<AreaSetting>,
        prior: HashMap<i64, Decimal>,
        saved: Vec<CompletionRecord>,
        calls: usize,
        reject: Option<Vec<String>>,
    }

    impl Plant {
        fn new() -> Self {
            let areas = ["КМД", "ЛСБ", "Сборка"]
                .iter()
                .zip(1..)
                .map(|(title, n)| AreaSetting {
                    area: WorkArea {
                        id: n,
                        title: (*title).to_string(),
                        order: n,
                        remark: None,
                    },
                    executors_required: true,
                })
                .collect();
            Self {
                areas,
                prior: HashMap::new(),
                saved: Vec::new(),
                calls: 0,
                reject: None,
            }
        }
    }

    impl SettingsSource for Plant {
        fn project_areas(&self, _project_id: i64) -> Result<Vec<AreaSetting>> {
            Ok(self.areas.clone())
        }
    }

    impl HistorySource for Plant {
        fn completed_by_area(&self, _mark_id: i64) -> Result<HashMap<i64, Decimal>> {
            Ok(self.prior.clone())
        }
    }

    impl ExecutionStore for Plant {
        fn fill_execution(
            &mut self,
            _mark_id: i64,
            _operator: &Operator,
            records: &[CompletionRecord],
        ) -> Result<(), StoreError> {
            self.calls += 1;
            if let Some(errors) = &self.reject {
                return Err(StoreError::Rejected(errors.clone()));
            }
            self.saved.extend_from_slice(records);
            Ok(())
        }
    }

    fn mark() -> ProductionMark {
        ProductionMark {
            id: 1,
            project_id: 1,
            code: "B-1".to_string(),
            title: "Beam".to_string(),
            order: 1,
            weight: dec("3"),
            count: dec("10"),
            remark: None,
        }
    }

    fn open(plant: &Plant) -> FillSession {
        FillSession::open(plant, plant, mark(), Operator::new(1, "master"), dec("0.5")).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    #[test]
    fn test_finishing_head_unlocks_second_area() {
        let mut plant = Plant::new();
        let mut session = open(&plant);
        assert_eq!(session.chain().fillable_states(), [true, false, false]);

        let chain = session.chain_mut();
        chain.set_quantity_text(0, "10").unwrap();
        chain.set_date(0, Some(day())).unwrap();
        chain.set_empty(1, true).unwrap();
        chain.set_empty(2, true).unwrap();

        let records = session.submit(&mut plant).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(session.completed().get(&1), Some(&dec("10")));
        assert!(session.chain().entries()[0].is_finished());
        assert!(session.chain().entries()[1].executors.is_empty());
        assert!(session.chain().entries()[1].is_able_to_fill);
        assert!(!session.chain().entries()[1].is_empty);
    }

    #[test]
    fn test_missing_date_persists_nothing() {
        let mut plant = Plant::new();
        let mut session = open(&plant);
        let chain = session.chain_mut();
        chain.set_quantity_text(0, "4").unwrap();
        chain.set_empty(1, true).unwrap();
        chain.set_empty(2, true).unwrap();

        let err = session.submit(&mut plant).unwrap_err();
        assert!(matches!(err, SubmitError::Incomplete(ref p) if p.len() == 1));
        assert_eq!(plant.calls, 0);
        assert!(plant.saved.is_empty());
    }

    #[test]
    fn test_rejection_leaves_session_unchanged() {
        let mut plant = Plant::new();
        plant.prior.insert(1, dec("2"));
        plant.reject = Some(vec!["Executor 9 does not exist".to_string()]);
        let mut session = open(&plant);
        let chain = session.chain_mut();
        chain.add_executor(0, 9).unwrap();
        chain.set_quantity_text(0, "3").unwrap();
        chain.set_date(0, Some(day())).unwrap();
        chain.set_empty(1, true).unwrap();
        chain.set_empty(2, true).unwrap();
        let before = session.chain().fillable_states();

        let err = session.submit(&mut plant).unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(_)));
        assert_eq!(session.completed().get(&1), Some(&dec("2")));
        assert_eq!(session.chain().entries()[0].quantity, Some(dec("3")));
        assert_eq!(session.chain().fillable_states(), before);
    }

    #[test]
    fn test_all_skipped_is_noop() {
        let mut plant = Plant::new();
        let mut session = open(&plant);
        for i in 0..3 {
            session.chain_mut().set_empty(i, true).unwrap();
        }
        assert!(session.submit(&mut plant).unwrap().is_empty());
        assert_eq!(plant.calls, 0);
    }

    #[test]
    fn test_no_areas_is_noop() {
        let mut plant = Plant::new();
        plant.areas.clear();
        let mut session = open(&plant);
        assert!(session.chain().is_empty());
        assert!(session.submit(&mut plant).unwrap().is_empty());
        assert_eq!(plant.calls, 0);
    }

    #[test]
    fn test_merge_accumulates_partial_fills() {
        let mut plant = Plant::new();
        plant.prior.insert(1, dec("4"));
        let mut session = open(&plant);
        let chain = session.chain_mut();
        chain.set_quantity_text(0, "2.5").unwrap();
        chain.set_date(0, Some(day())).unwrap();
        chain.set_empty(1, true).unwrap();
        chain.set_empty(2, true).unwrap();

        session.submit(&mut plant).unwrap();
        assert_eq!(session.completed().get(&1), Some(&dec("6.5")));
        assert_eq!(session.chain().entries()[0].remaining, dec("3.5"));
        assert_eq!(plant.saved.len(), 1);
    }
}

//! Execution Chain: the ordered, gated sequence of area entries for one fill.
//!
//! Entries live in a flat arena and point at their neighbours by index.
//! Whether an entry may be filled depends on its predecessor, and every
//! mutation that can change that answer re-runs the forward propagation
//! explicitly via [`ExecutionChain::recompute`].

use super::count::QuantityInput;
use super::error::ChainError;
use super::types::{AreaSetting, ProductionMark, WorkArea};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// One work area's pending completion entry within a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub area: WorkArea,
    /// `mark.count - prior completed` for this area, fixed for the session.
    pub remaining: Decimal,
    pub executors_required: bool,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub quantity_text: String,
    pub quantity: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub remark: Option<String>,
    pub executors: BTreeSet<i64>,
    /// Explicitly skipped in this session.
    pub is_empty: bool,
    pub is_able_to_fill: bool,
}

impl ChainEntry {
    fn new(area: WorkArea, remaining: Decimal, executors_required: bool) -> Self {
        Self {
            area,
            remaining,
            executors_required,
            prev: None,
            next: None,
            quantity_text: String::new(),
            quantity: None,
            date: None,
            remark: None,
            executors: BTreeSet::new(),
            is_empty: false,
            is_able_to_fill: false,
        }
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.prev.is_none()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining.is_zero()
    }

    #[must_use]
    pub fn is_not_finished(&self) -> bool {
        !self.is_finished()
    }
}

/// The linked sequence of entries for one mark, in area order.
#[derive(Debug, Clone)]
pub struct ExecutionChain {
    entries: Vec<ChainEntry>,
    multiplicity: Decimal,
}

impl ExecutionChain {
    /// Builds the chain for `mark` over the project's enabled areas.
    ///
    /// `prior` maps area id to the quantity already completed before this session.
    ///
    /// # Errors
    /// Returns `ChainError::OverCompleted` if history exceeds the mark count for any area.
    pub fn build(
        settings: &[AreaSetting],
        mark: &ProductionMark,
        prior: &HashMap<i64, Decimal>,
        multiplicity: Decimal,
    ) -> Result<Self, ChainError> {
        let mut ordered: Vec<&AreaSetting> = settings.iter().collect();
        ordered.sort_by_key(|s| s.area.order);

        let mut entries: Vec<ChainEntry> = Vec::with_capacity(ordered.len());
        for setting in ordered {
            let done = prior.get(&setting.area.id).copied().unwrap_or(Decimal::ZERO);
            if done > mark.count {
                return Err(ChainError::OverCompleted {
                    area: setting.area.title.clone(),
                    prior: done,
                    count: mark.count,
                });
            }

            let mut entry = ChainEntry::new(
                setting.area.clone(),
                mark.count - done,
                setting.executors_required,
            );
            let index = entries.len();
            if let Some(prev) = entries.last_mut() {
                prev.next = Some(index);
                entry.prev = Some(index - 1);
                entry.is_able_to_fill =
                    (prev.is_finished() && prev.is_first()) || !entry.executors_required;
            } else {
                entry.is_able_to_fill = true;
            }
            entries.push(entry);
        }

        Ok(Self {
            entries,
            multiplicity,
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the entry at `index`.
    ///
    /// # Errors
    /// Returns `ChainError::OutOfRange` for an unknown index.
    pub fn entry(&self, index: usize) -> Result<&ChainEntry, ChainError> {
        self.entries.get(index).ok_or(ChainError::OutOfRange(index))
    }

    /// Finds the entry for an area by title (case-insensitive) or by order number.
    #[must_use]
    pub fn find_area(&self, query: &str) -> Option<usize> {
        let query = query.trim();
        let lower = query.to_lowercase();
        self.entries
            .iter()
            .position(|e| e.area.title.to_lowercase() == lower)
            .or_else(|| {
                let order: i64 = query.parse().ok()?;
                self.entries.iter().position(|e| e.area.order == order)
            })
    }

    /// The fillable flag of every entry, in chain order.
    #[must_use]
    pub fn fillable_states(&self) -> Vec<bool> {
        self.entries.iter().map(|e| e.is_able_to_fill).collect()
    }

    /// Decides whether the entry after `index` may be filled.
    ///
    /// # Errors
    /// Returns `ChainError::OutOfRange` for an unknown index.
    pub fn calculate_for_next(&self, index: usize) -> Result<bool, ChainError> {
        self.entry(index)?;
        Ok(self.unlocks_next(index))
    }

    fn unlocks_next(&self, index: usize) -> bool {
        let current = &self.entries[index];

        if current.is_finished() {
            return true;
        }

        if current.is_empty {
            let Some(mut cursor) = current.prev else {
                return true;
            };
            loop {
                let entry = &self.entries[cursor];
                if entry.is_finished() || entry.is_empty {
                    match entry.prev {
                        Some(p) => cursor = p,
                        None => return true,
                    }
                } else {
                    // Same test the stop entry applies to its own successor,
                    // not its bare fillable flag.
                    return entry.is_able_to_fill && !entry.executors.is_empty();
                }
            }
        }

        current.is_able_to_fill && !current.executors.is_empty()
    }

    /// Re-propagates fillable state from `index` to the end of the chain and
    /// returns the new states.
    ///
    /// Every later entry is re-evaluated: an empty entry decides by walking back
    /// past itself, so an unchanged flag does not end the cascade.
    pub fn recompute(&mut self, index: usize) -> Vec<bool> {
        let mut current = index;
        while let Some(next) = self.entries.get(current).and_then(|e| e.next) {
            let able = self.unlocks_next(current);
            if self.entries[next].is_able_to_fill != able {
                self.entries[next].is_able_to_fill = able;
                debug!(
                    area = %self.entries[next].area.title,
                    able,
                    "fillable state changed"
                );
            }
            current = next;
        }
        self.fillable_states()
    }

    /// Marks an area as skipped (or un-skipped) for this session.
    ///
    /// Skipping is allowed on locked entries so they can be left out of a submission.
    ///
    /// # Errors
    /// Returns an error for an unknown index or a finished area.
    pub fn set_empty(&mut self, index: usize, empty: bool) -> Result<Vec<bool>, ChainError> {
        let entry = self.entry_mut(index)?;
        if entry.is_finished() {
            return Err(ChainError::Finished {
                area: entry.area.title.clone(),
            });
        }
        if entry.is_empty == empty {
            return Ok(self.fillable_states());
        }
        entry.is_empty = empty;
        Ok(self.recompute(index))
    }

    /// Feeds typed text into the quantity field.
    ///
    /// # Errors
    /// Returns `ChainError::InvalidQuantity` (after clearing the field) for text that is
    /// not a valid count, or an error if the entry is locked.
    pub fn set_quantity_text(&mut self, index: usize, text: &str) -> Result<(), ChainError> {
        let multiplicity = self.multiplicity;
        let entry = self.editable_mut(index)?;
        match QuantityInput::classify(text, multiplicity) {
            QuantityInput::Empty => {
                entry.quantity_text.clear();
                entry.quantity = None;
            }
            QuantityInput::Partial => {
                entry.quantity_text = text.trim().to_string();
                entry.quantity = None;
            }
            QuantityInput::Value(v) => {
                entry.quantity_text = text.trim().to_string();
                entry.quantity = Some(v);
            }
            QuantityInput::Rejected => {
                entry.quantity_text.clear();
                entry.quantity = None;
                return Err(ChainError::InvalidQuantity {
                    area: entry.area.title.clone(),
                    text: text.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Sets the completion date.
    ///
    /// # Errors
    /// Returns an error if the entry is locked, finished or unknown.
    pub fn set_date(&mut self, index: usize, date: Option<NaiveDate>) -> Result<(), ChainError> {
        self.editable_mut(index)?.date = date;
        Ok(())
    }

    /// Sets the remark; blank text clears it.
    ///
    /// # Errors
    /// Returns an error if the entry is locked, finished or unknown.
    pub fn set_remark(&mut self, index: usize, remark: Option<&str>) -> Result<(), ChainError> {
        self.editable_mut(index)?.remark = remark
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);
        Ok(())
    }

    /// Assigns an executor to the area.
    ///
    /// # Errors
    /// Returns an error if the entry is locked, finished or unknown.
    pub fn add_executor(&mut self, index: usize, employee_id: i64) -> Result<Vec<bool>, ChainError> {
        if !self.editable_mut(index)?.executors.insert(employee_id) {
            return Ok(self.fillable_states());
        }
        Ok(self.recompute(index))
    }

    /// Removes an executor from the area.
    ///
    /// # Errors
    /// Returns an error if the entry is locked, finished or unknown.
    pub fn remove_executor(
        &mut self,
        index: usize,
        employee_id: i64,
    ) -> Result<Vec<bool>, ChainError> {
        if !self.editable_mut(index)?.executors.remove(&employee_id) {
            return Ok(self.fillable_states());
        }
        Ok(self.recompute(index))
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut ChainEntry, ChainError> {
        self.entries
            .get_mut(index)
            .ok_or(ChainError::OutOfRange(index))
    }

    fn editable_mut(&mut self, index: usize) -> Result<&mut ChainEntry, ChainError> {
        let entry = self.entry_mut(index)?;
        if entry.is_finished() {
            return Err(ChainError::Finished {
                area: entry.area.title.clone(),
            });
        }
        if !entry.is_able_to_fill {
            return Err(ChainError::Locked {
                area: entry.area.title.clone(),
            });
        }
        Ok(entry)
    }
}

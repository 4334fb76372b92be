//! Execution Submission: turns an edited chain into completion records.

use super::chain::{ChainEntry, ExecutionChain};
use super::error::{EntryProblem, SubmitError};
use super::types::CompletionRecord;

/// Entries that take part in a submission: not finished and not skipped.
#[must_use]
pub fn pending_entries(chain: &ExecutionChain) -> Vec<&ChainEntry> {
    chain
        .entries()
        .iter()
        .filter(|e| e.is_not_finished() && !e.is_empty)
        .collect()
}

fn check(entry: &ChainEntry) -> Option<EntryProblem> {
    let Some(quantity) = entry.quantity else {
        return Some(EntryProblem::MissingQuantity);
    };
    if entry.date.is_none() {
        return Some(EntryProblem::MissingDate);
    }
    if quantity > entry.remaining {
        return Some(EntryProblem::ExceedsRemaining);
    }
    None
}

/// Validates the pending entries and assembles one record per area, in area order.
///
/// An empty result means there is nothing to submit.
///
/// # Errors
/// Returns `SubmitError::Incomplete` naming every failing area; no records are produced.
pub fn assemble(chain: &ExecutionChain) -> Result<Vec<CompletionRecord>, SubmitError> {
    let pending = pending_entries(chain);

    let problems: Vec<_> = pending
        .iter()
        .filter_map(|e| check(e).map(|p| (e.area.title.clone(), p)))
        .collect();
    if !problems.is_empty() {
        return Err(SubmitError::Incomplete(problems));
    }

    let mut records = Vec::with_capacity(pending.len());
    for entry in pending {
        let (Some(count), Some(date)) = (entry.quantity, entry.date) else {
            continue;
        };
        records.push(CompletionRecord {
            area_id: entry.area.id,
            executor_ids: entry.executors.clone(),
            count,
            date,
            remark: entry.remark.clone(),
        });
    }
    Ok(records)
}

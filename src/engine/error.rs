//! Error types for the fill workflow.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while building or editing an execution chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("No chain entry at position {0}")]
    OutOfRange(usize),

    #[error("Area '{area}' is locked until the previous area is resolved")]
    Locked { area: String },

    #[error("Area '{area}' is already finished")]
    Finished { area: String },

    #[error("'{text}' is not a valid count for area '{area}'")]
    InvalidQuantity { area: String, text: String },

    #[error("Area '{area}' has {prior} completed, more than the mark count {count}")]
    OverCompleted {
        area: String,
        prior: Decimal,
        count: Decimal,
    },
}

/// Why an area failed submission validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryProblem {
    MissingQuantity,
    MissingDate,
    ExceedsRemaining,
}

impl std::fmt::Display for EntryProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingQuantity => write!(f, "no quantity"),
            Self::MissingDate => write!(f, "no date"),
            Self::ExceedsRemaining => write!(f, "more than remaining"),
        }
    }
}

/// Rejection returned by a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The batch broke a business rule; nothing was written.
    #[error("{}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.into())
    }
}

/// Errors raised when submitting a fill.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Local validation failed; the store was never called.
    #[error("Fill in a valid quantity and date for every area that is not skipped ({})", format_problems(.0))]
    Incomplete(Vec<(String, EntryProblem)>),

    /// The store refused the batch.
    #[error("Fill rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error(transparent)]
    Store(anyhow::Error),
}

impl From<StoreError> for SubmitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(errors) => Self::Rejected(errors),
            StoreError::Backend(e) => Self::Store(e),
        }
    }
}

fn format_problems(problems: &[(String, EntryProblem)]) -> String {
    problems
        .iter()
        .map(|(area, p)| format!("{area}: {p}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_lists_every_area() {
        let err = SubmitError::Incomplete(vec![
            ("КМД".to_string(), EntryProblem::MissingDate),
            ("ЛСБ".to_string(), EntryProblem::MissingQuantity),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("КМД: no date"));
        assert!(msg.contains("ЛСБ: no quantity"));
    }

    #[test]
    fn test_store_rejection_maps_to_submit_rejection() {
        let err: SubmitError = StoreError::Rejected(vec!["a".into(), "b".into()]).into();
        assert!(matches!(err, SubmitError::Rejected(ref v) if v.len() == 2));
        assert_eq!(err.to_string(), "Fill rejected: a; b");
    }
}

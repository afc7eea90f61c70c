//! Error types for the fiscal engine
//!
//! Every validation failure is raised eagerly at construction time. The outer
//! [`FiscalError`] carries the category (capital, OPEX, contract, ...) so callers
//! can match on which kind of input was rejected; [`EntityError`] carries the
//! detail shared by all cost and lifting entities.

use thiserror::Error;

/// Validation detail shared by every cost and lifting entity
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error("start year {start_year} is after the end year {end_year}")]
    InvertedYears { start_year: i32, end_year: i32 },

    #[error("unequal length of arrays: {}", format_lengths(.lengths))]
    LengthMismatch { lengths: Vec<(&'static str, usize)> },

    #[error("{field} year {year} is outside the period {start_year}..={end_year}")]
    YearOutOfRange {
        field: &'static str,
        year: i32,
        start_year: i32,
        end_year: i32,
    },

    #[error("salvage value {salvage} is greater than cost {cost} at element {index}")]
    SalvageExceedsCost { index: usize, salvage: f64, cost: f64 },

    #[error("{field} must lie in [0, 1], got {value}")]
    PortionOutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("cannot merge {left} with {right}")]
    IncompatibleMerge { left: &'static str, right: &'static str },

    #[error("division by zero in {context}")]
    DivisionByZero { context: &'static str },

    #[error("{field} is empty")]
    Empty { field: &'static str },
}

fn format_lengths(lengths: &[(&'static str, usize)]) -> String {
    lengths
        .iter()
        .map(|(name, len)| format!("{}: {}", name, len))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Crate-level error, tagged by the category of the offending input
#[derive(Debug, Error)]
pub enum FiscalError {
    #[error("capital cost: {0}")]
    Capital(EntityError),

    #[error("intangible cost: {0}")]
    Intangible(EntityError),

    #[error("OPEX: {0}")]
    Opex(EntityError),

    #[error("ASR cost: {0}")]
    Asr(EntityError),

    #[error("LBT cost: {0}")]
    Lbt(EntityError),

    #[error("cost of sales: {0}")]
    CostOfSales(EntityError),

    #[error("lifting: {0}")]
    Lifting(EntityError),

    #[error("base project: {0}")]
    BaseProject(String),

    #[error("general config: {0}")]
    GeneralConfig(String),

    #[error("contract: {0}")]
    Contract(String),

    #[error("sensitivity: {0}")]
    Sensitivity(String),

    #[error("unrecognized {kind}: {value:?}")]
    Selection { kind: &'static str, value: String },

    #[error("economic limit: {0}")]
    EconLimit(String),

    #[error("length mismatch: {name} has {actual} elements, expected {expected}")]
    Broadcast {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("serialization: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FiscalError {
    fn from(e: serde_json::Error) -> Self {
        FiscalError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for FiscalError {
    fn from(e: csv::Error) -> Self {
        FiscalError::Serialization(e.to_string())
    }
}

pub type FiscalResult<T> = Result<T, FiscalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_lists_every_length() {
        let err = EntityError::LengthMismatch {
            lengths: vec![("cost", 3), ("expense_year", 2), ("cost_allocation", 3)],
        };
        let msg = err.to_string();
        assert!(msg.contains("cost: 3"));
        assert!(msg.contains("expense_year: 2"));
        assert!(msg.contains("cost_allocation: 3"));
    }

    #[test]
    fn test_category_is_matchable() {
        let err = FiscalError::Opex(EntityError::Empty { field: "fixed_cost" });
        assert!(matches!(err, FiscalError::Opex(EntityError::Empty { .. })));
        assert_eq!(err.to_string(), "OPEX: fixed_cost is empty");
    }
}

//! PSC Fiscal - Fiscal engine for Indonesian oil and gas Production Sharing Contracts
//!
//! This library provides:
//! - Lifting and cost entities projected onto a common project-year axis
//! - Depreciation, economic limit and cash flow indicators
//! - Cost Recovery and Gross Split fiscal waterfalls, per fluid and consolidated
//! - Transitions that carry unrecovered cost from one contract into the next
//! - Parallel sensitivity sweeps over a configured contract

pub mod contracts;
pub mod dataset;
pub mod econ;
pub mod error;
pub mod scenario;

// Re-export commonly used types
pub use contracts::{
    BaseProject, CaseFile, Contract, ContractArgs, ContractResult, ContractSummary, CostRecovery,
    CostRecoveryArgs, CostRecoveryParams, GrossSplit, GrossSplitArgs, GrossSplitParams, StreamResult,
    Transition, TransitionArgs, TransitionCase, TransitionResult, YearRow,
};
pub use econ::selection::{FluidType, LimitMethod, SensitivityParameter};
pub use econ::{CostItem, Lifting, Rate};
pub use error::{FiscalError, FiscalResult};
pub use scenario::{SensitivityPoint, SensitivityRunner};

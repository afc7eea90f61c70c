//! PSC contracts: the base project, the two fiscal engines and the
//! transition between them

pub mod config;
pub mod cost_recovery;
pub mod gross_split;
pub mod project;
pub mod psc_tools;
pub mod results;
pub mod split_tables;
pub mod tax;
pub mod transition;

use serde::Serialize;

use crate::econ::costs::CostItem;
use crate::econ::selection::{FluidType, LimitMethod};
use crate::error::{FiscalError, FiscalResult};

pub use config::{CaseFile, ContractArgs, CostRecoveryArgs, GrossSplitArgs, TransitionArgs, TransitionCase};
pub use cost_recovery::{CostRecovery, CostRecoveryParams, CostRecoveryResult};
pub use gross_split::{GrossSplit, GrossSplitParams, GrossSplitResult};
pub use project::{BaseProject, ProjectData};
pub use results::{ContractSummary, StreamResult, YearRow};
pub use transition::{Transition, TransitionResult};

/// Either fiscal regime over a project
#[derive(Debug, Clone, PartialEq)]
pub enum Contract {
    CostRecovery(CostRecovery),
    GrossSplit(GrossSplit),
}

impl Contract {
    pub fn project(&self) -> &BaseProject {
        match self {
            Contract::CostRecovery(c) => c.project(),
            Contract::GrossSplit(c) => c.project(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Contract::CostRecovery(_) => "cost_recovery",
            Contract::GrossSplit(_) => "gross_split",
        }
    }

    /// Run with arguments of the matching kind
    pub fn run(&self, args: &ContractArgs) -> FiscalResult<ContractResult> {
        match (self, args) {
            (Contract::CostRecovery(c), ContractArgs::CostRecovery(a)) => {
                Ok(ContractResult::CostRecovery(Box::new(c.run(a)?)))
            }
            (Contract::GrossSplit(c), ContractArgs::GrossSplit(a)) => Ok(ContractResult::GrossSplit(Box::new(c.run(a)?))),
            _ => Err(FiscalError::Contract(format!(
                "{} contract cannot run with {} arguments",
                self.kind(),
                args.kind()
            ))),
        }
    }

    /// The same terms over another project
    pub fn with_project(&self, project: BaseProject) -> FiscalResult<Self> {
        Ok(match self {
            Contract::CostRecovery(c) => Contract::CostRecovery(c.with_project(project)?),
            Contract::GrossSplit(c) => Contract::GrossSplit(c.with_project(project)?),
        })
    }

    /// The same contract with one more cost item in its project
    pub fn with_cost(&self, item: CostItem) -> FiscalResult<Self> {
        self.with_project(self.project().with_cost(item)?)
    }
}

/// Output of [`Contract::run`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "contract", rename_all = "snake_case")]
pub enum ContractResult {
    CostRecovery(Box<CostRecoveryResult>),
    GrossSplit(Box<GrossSplitResult>),
}

impl ContractResult {
    pub fn project_years(&self) -> &[i32] {
        match self {
            ContractResult::CostRecovery(r) => &r.project_years,
            ContractResult::GrossSplit(r) => &r.project_years,
        }
    }

    pub fn oil(&self) -> &StreamResult {
        match self {
            ContractResult::CostRecovery(r) => &r.oil,
            ContractResult::GrossSplit(r) => &r.oil,
        }
    }

    pub fn gas(&self) -> &StreamResult {
        match self {
            ContractResult::CostRecovery(r) => &r.gas,
            ContractResult::GrossSplit(r) => &r.gas,
        }
    }

    pub fn consolidated(&self) -> &StreamResult {
        match self {
            ContractResult::CostRecovery(r) => &r.consolidated,
            ContractResult::GrossSplit(r) => &r.consolidated,
        }
    }

    pub fn sunk_cost(&self) -> Option<f64> {
        match self {
            ContractResult::CostRecovery(r) => r.sunk_cost,
            ContractResult::GrossSplit(r) => r.sunk_cost,
        }
    }

    /// Cost still unrecovered (or undeducted) after the last year, for `fluid`
    pub fn ending_unrecovered(&self, fluid: FluidType) -> f64 {
        let recovery = match (self, fluid) {
            (ContractResult::CostRecovery(r), FluidType::Gas) => &r.gas_detail.recovery,
            (ContractResult::CostRecovery(r), _) => &r.oil_detail.recovery,
            (ContractResult::GrossSplit(r), FluidType::Gas) => &r.gas_detail.recovery,
            (ContractResult::GrossSplit(r), _) => &r.oil_detail.recovery,
        };
        recovery.ending_unrecovered()
    }

    /// Capital of `fluid` not yet depreciated after the last year
    pub fn undepreciated(&self, fluid: FluidType) -> f64 {
        match (self, fluid) {
            (ContractResult::CostRecovery(r), FluidType::Gas) => r.gas_detail.undepreciated,
            (ContractResult::CostRecovery(r), _) => r.oil_detail.undepreciated,
            (ContractResult::GrossSplit(r), FluidType::Gas) => r.gas_detail.undepreciated,
            (ContractResult::GrossSplit(r), _) => r.oil_detail.undepreciated,
        }
    }

    /// Consolidated per-year rows
    pub fn to_rows(&self) -> Vec<YearRow> {
        results::to_rows(self.project_years(), self.consolidated())
    }

    pub fn summary(&self, discount_rate: f64, limit_method: LimitMethod) -> FiscalResult<ContractSummary> {
        ContractSummary::new(self.project_years(), self.consolidated(), discount_rate, limit_method)
    }
}

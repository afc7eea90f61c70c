//! Run arguments and JSON case files
//!
//! Every struct here rejects unknown keys. Defaults follow the regulatory
//! defaults the engines were calibrated against.

use serde::{Deserialize, Serialize};

use crate::contracts::cost_recovery::{CostRecovery, CostRecoveryParams};
use crate::contracts::gross_split::{GrossSplit, GrossSplitParams};
use crate::contracts::project::{BaseProject, ExpenditureRates, ProjectData};
use crate::contracts::transition::Transition;
use crate::contracts::Contract;
use crate::econ::helper::Rate;
use crate::econ::selection::{
    DeprMethod, FtpTaxRegime, GrossSplitRegime, InflationAppliedTo, OtherRevenue, TaxRegime,
};
use crate::error::FiscalResult;

/// Where each auxiliary stream's revenue is booked
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OtherRevenueTargets {
    pub sulfur: OtherRevenue,
    pub electricity: OtherRevenue,
    pub co2: OtherRevenue,
}

fn default_decline_factor() -> f64 {
    2.0
}

/// Arguments of a Cost Recovery run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostRecoveryArgs {
    pub sulfur_revenue: OtherRevenue,
    pub electricity_revenue: OtherRevenue,
    pub co2_revenue: OtherRevenue,

    /// Split the DMO fee of the holiday-end year by month
    pub is_dmo_end_weighted: bool,

    pub tax_regime: TaxRegime,

    /// Overrides the regime table when present
    pub effective_tax_rate: Option<Rate>,

    pub ftp_tax_regime: FtpTaxRegime,

    /// Spend up to this year is reported as sunk
    pub sunk_cost_reference_year: Option<i32>,

    pub depr_method: DeprMethod,

    #[serde(default = "default_decline_factor")]
    pub decline_factor: f64,

    pub vat_rate: Rate,

    /// Rate of the PDRI add-on tax
    pub pdri_rate: Rate,

    pub inflation_rate: Rate,

    /// Categories the inflation rate escalates; none when absent
    pub inflation_rate_applied_to: Option<InflationAppliedTo>,

    /// Year inflation compounds from; defaults to the start year
    pub year_ref: Option<i32>,

    /// DMO volume is not capped by the contractor entitlement
    pub post_uu_22_year2001: bool,

    /// Book the undepreciated remainder in the last year
    pub sum_undepreciated_cost: bool,

    pub oil_cost_of_sales_applied: bool,
    pub gas_cost_of_sales_applied: bool,
}

impl Default for CostRecoveryArgs {
    fn default() -> Self {
        Self {
            sulfur_revenue: OtherRevenue::AdditionToGasRevenue,
            electricity_revenue: OtherRevenue::AdditionToOilRevenue,
            co2_revenue: OtherRevenue::AdditionToGasRevenue,
            is_dmo_end_weighted: false,
            tax_regime: TaxRegime::NailedDown,
            effective_tax_rate: None,
            ftp_tax_regime: FtpTaxRegime::Pdjp20_2017,
            sunk_cost_reference_year: None,
            depr_method: DeprMethod::PscDecliningBalance,
            decline_factor: default_decline_factor(),
            vat_rate: Rate::default(),
            pdri_rate: Rate::default(),
            inflation_rate: Rate::default(),
            inflation_rate_applied_to: Some(InflationAppliedTo::Capex),
            year_ref: None,
            post_uu_22_year2001: true,
            sum_undepreciated_cost: false,
            oil_cost_of_sales_applied: false,
            gas_cost_of_sales_applied: false,
        }
    }
}

impl CostRecoveryArgs {
    pub fn other_revenue(&self) -> OtherRevenueTargets {
        OtherRevenueTargets {
            sulfur: self.sulfur_revenue,
            electricity: self.electricity_revenue,
            co2: self.co2_revenue,
        }
    }

    pub fn expenditure_rates(&self, project: &BaseProject) -> ExpenditureRates {
        ExpenditureRates {
            year_ref: self.year_ref.unwrap_or(project.start_year()),
            inflation_rate: self.inflation_rate.clone(),
            inflation_applied_to: self.inflation_rate_applied_to,
            vat_rate: self.vat_rate.clone(),
            pdri_rate: self.pdri_rate.clone(),
        }
    }
}

/// Arguments of a Gross Split run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrossSplitArgs {
    pub sulfur_revenue: OtherRevenue,
    pub electricity_revenue: OtherRevenue,
    pub co2_revenue: OtherRevenue,
    pub is_dmo_end_weighted: bool,
    pub tax_regime: TaxRegime,
    pub effective_tax_rate: Option<Rate>,
    pub sunk_cost_reference_year: Option<i32>,
    pub depr_method: DeprMethod,
    #[serde(default = "default_decline_factor")]
    pub decline_factor: f64,
    pub vat_rate: Rate,
    pub pdri_rate: Rate,
    pub inflation_rate: Rate,
    pub inflation_rate_applied_to: Option<InflationAppliedTo>,
    pub year_ref: Option<i32>,
    pub post_uu_22_year2001: bool,
    pub sum_undepreciated_cost: bool,

    /// Expense intangible cost straight-line over five years instead of when incurred
    pub amortization: bool,

    /// Regulation whose split tables apply
    pub regime: GrossSplitRegime,
}

impl Default for GrossSplitArgs {
    fn default() -> Self {
        Self {
            sulfur_revenue: OtherRevenue::AdditionToGasRevenue,
            electricity_revenue: OtherRevenue::AdditionToOilRevenue,
            co2_revenue: OtherRevenue::AdditionToGasRevenue,
            is_dmo_end_weighted: false,
            tax_regime: TaxRegime::NailedDown,
            effective_tax_rate: None,
            sunk_cost_reference_year: None,
            depr_method: DeprMethod::PscDecliningBalance,
            decline_factor: default_decline_factor(),
            vat_rate: Rate::default(),
            pdri_rate: Rate::default(),
            inflation_rate: Rate::default(),
            inflation_rate_applied_to: Some(InflationAppliedTo::Capex),
            year_ref: None,
            post_uu_22_year2001: true,
            sum_undepreciated_cost: false,
            amortization: false,
            regime: GrossSplitRegime::Permen52_2017,
        }
    }
}

impl GrossSplitArgs {
    pub fn other_revenue(&self) -> OtherRevenueTargets {
        OtherRevenueTargets {
            sulfur: self.sulfur_revenue,
            electricity: self.electricity_revenue,
            co2: self.co2_revenue,
        }
    }

    pub fn expenditure_rates(&self, project: &BaseProject) -> ExpenditureRates {
        ExpenditureRates {
            year_ref: self.year_ref.unwrap_or(project.start_year()),
            inflation_rate: self.inflation_rate.clone(),
            inflation_applied_to: self.inflation_rate_applied_to,
            vat_rate: self.vat_rate.clone(),
            pdri_rate: self.pdri_rate.clone(),
        }
    }
}

/// Run arguments for either engine, tagged by `contract`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "contract", rename_all = "snake_case")]
pub enum ContractArgs {
    CostRecovery(CostRecoveryArgs),
    GrossSplit(GrossSplitArgs),
}

impl ContractArgs {
    pub fn kind(&self) -> &'static str {
        match self {
            ContractArgs::CostRecovery(_) => "cost_recovery",
            ContractArgs::GrossSplit(_) => "gross_split",
        }
    }

    pub fn expenditure_rates(&self, project: &BaseProject) -> ExpenditureRates {
        match self {
            ContractArgs::CostRecovery(a) => a.expenditure_rates(project),
            ContractArgs::GrossSplit(a) => a.expenditure_rates(project),
        }
    }

    pub fn sums_undepreciated_cost(&self) -> bool {
        match self {
            ContractArgs::CostRecovery(a) => a.sum_undepreciated_cost,
            ContractArgs::GrossSplit(a) => a.sum_undepreciated_cost,
        }
    }
}

fn default_unrec_portion() -> f64 {
    0.0
}

/// Arguments of a transition run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionArgs {
    pub contract1: ContractArgs,
    pub contract2: ContractArgs,
    /// Share of the first contract's ending balance carried into the second
    #[serde(default = "default_unrec_portion")]
    pub unrec_portion: f64,
}

/// One contract as read from a JSON case file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseFile {
    pub project: ProjectData,
    /// Used when `args` selects Cost Recovery
    #[serde(default)]
    pub cost_recovery: CostRecoveryParams,
    /// Used when `args` selects Gross Split
    #[serde(default)]
    pub gross_split: GrossSplitParams,
    pub args: ContractArgs,
}

impl CaseFile {
    pub fn from_json(text: &str) -> FiscalResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the contract through the validating constructors
    pub fn into_contract(self) -> FiscalResult<(Contract, ContractArgs)> {
        let project = BaseProject::from_data(self.project)?;
        let contract = match &self.args {
            ContractArgs::CostRecovery(_) => Contract::CostRecovery(CostRecovery::new(project, self.cost_recovery)?),
            ContractArgs::GrossSplit(_) => Contract::GrossSplit(GrossSplit::new(project, self.gross_split)?),
        };
        Ok((contract, self.args))
    }
}

/// Two contracts in sequence, as read from a JSON case file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionCase {
    pub contract1: CaseFile,
    pub contract2: CaseFile,
    #[serde(default = "default_unrec_portion")]
    pub unrec_portion: f64,
}

impl TransitionCase {
    pub fn from_json(text: &str) -> FiscalResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_transition(self) -> FiscalResult<(Transition, TransitionArgs)> {
        let (contract1, args1) = self.contract1.into_contract()?;
        let (contract2, args2) = self.contract2.into_contract()?;
        let transition = Transition::new(contract1, contract2)?;
        Ok((
            transition,
            TransitionArgs {
                contract1: args1,
                contract2: args2,
                unrec_portion: self.unrec_portion,
            },
        ))
    }
}

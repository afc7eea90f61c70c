//! Sensitivity runner for batch contract evaluations
//!
//! Holds one configured contract and its run arguments, then re-evaluates the
//! contract with a single input scaled by each multiplier. Every evaluation
//! builds new entities and a new contract; the base contract is never touched.

use rayon::prelude::*;
use serde::Serialize;

use crate::contracts::{Contract, ContractArgs};
use crate::econ::costs::CostItem;
use crate::econ::indicator::{irr, npv};
use crate::econ::revenue::Lifting;
use crate::econ::selection::{FluidType, SensitivityParameter};
use crate::error::{FiscalError, FiscalResult};

/// Discount rate used when none is given
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.1;

/// Contractor indicators for one scaled input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityPoint {
    pub parameter: SensitivityParameter,
    pub multiplier: f64,
    pub contractor_npv: f64,
    pub contractor_irr: Option<f64>,
    pub government_take: f64,
}

/// Re-runs a contract with scaled inputs
///
/// # Example
/// ```ignore
/// let (contract, args) = dataset::sample_cost_recovery()?;
/// let runner = SensitivityRunner::new(contract, args);
///
/// let points = runner.run(SensitivityParameter::OilPrice, &[0.8, 1.0, 1.2])?;
/// ```
#[derive(Debug, Clone)]
pub struct SensitivityRunner {
    contract: Contract,
    args: ContractArgs,
    discount_rate: f64,
}

fn scale_lifting(lifting: &Lifting, parameter: SensitivityParameter, multiplier: f64) -> Lifting {
    match parameter {
        SensitivityParameter::OilPrice if lifting.fluid_type() == FluidType::Oil => lifting.scale_price(multiplier),
        SensitivityParameter::GasPrice if lifting.fluid_type() == FluidType::Gas => lifting.scale_price(multiplier),
        SensitivityParameter::Lifting => lifting.scale_volume(multiplier),
        _ => lifting.clone(),
    }
}

fn scale_cost(item: &CostItem, parameter: SensitivityParameter, multiplier: f64) -> CostItem {
    match (parameter, item) {
        (SensitivityParameter::Opex, CostItem::Opex(_)) => item.scale(multiplier),
        (SensitivityParameter::Capex, CostItem::Capital(_) | CostItem::Intangible(_)) => item.scale(multiplier),
        _ => item.clone(),
    }
}

impl SensitivityRunner {
    pub fn new(contract: Contract, args: ContractArgs) -> Self {
        Self {
            contract,
            args,
            discount_rate: DEFAULT_DISCOUNT_RATE,
        }
    }

    pub fn with_discount_rate(mut self, discount_rate: f64) -> Self {
        self.discount_rate = discount_rate;
        self
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// The base contract with `parameter` scaled by `multiplier`
    pub fn adjusted_contract(&self, parameter: SensitivityParameter, multiplier: f64) -> FiscalResult<Contract> {
        let project = self.contract.project().map_entities(
            |lifting| scale_lifting(lifting, parameter, multiplier),
            |item| scale_cost(item, parameter, multiplier),
        )?;
        self.contract.with_project(project)
    }

    /// Evaluate a single multiplier
    pub fn run_one(&self, parameter: SensitivityParameter, multiplier: f64) -> FiscalResult<SensitivityPoint> {
        check_multipliers(&[multiplier])?;
        self.evaluate(parameter, multiplier)
    }

    /// Evaluate every multiplier for one parameter, in parallel
    pub fn run(&self, parameter: SensitivityParameter, multipliers: &[f64]) -> FiscalResult<Vec<SensitivityPoint>> {
        check_multipliers(multipliers)?;
        log::debug!("sensitivity on {parameter}: {} multipliers", multipliers.len());
        multipliers
            .par_iter()
            .map(|&m| self.evaluate(parameter, m))
            .collect()
    }

    /// Evaluate every multiplier for every parameter
    pub fn run_all(&self, multipliers: &[f64]) -> FiscalResult<Vec<SensitivityPoint>> {
        check_multipliers(multipliers)?;
        let pairs: Vec<(SensitivityParameter, f64)> = SensitivityParameter::ALL
            .iter()
            .flat_map(|&p| multipliers.iter().map(move |&m| (p, m)))
            .collect();
        pairs.par_iter().map(|&(p, m)| self.evaluate(p, m)).collect()
    }

    fn evaluate(&self, parameter: SensitivityParameter, multiplier: f64) -> FiscalResult<SensitivityPoint> {
        let contract = self.adjusted_contract(parameter, multiplier)?;
        let result = contract.run(&self.args)?;
        let consolidated = result.consolidated();
        Ok(SensitivityPoint {
            parameter,
            multiplier,
            contractor_npv: npv(&consolidated.cashflow, self.discount_rate),
            contractor_irr: irr(&consolidated.cashflow),
            government_take: consolidated.government_take.iter().sum(),
        })
    }
}

fn check_multipliers(multipliers: &[f64]) -> FiscalResult<()> {
    if multipliers.is_empty() {
        return Err(FiscalError::Sensitivity("no multipliers given".to_string()));
    }
    if let Some(bad) = multipliers.iter().find(|m| !m.is_finite() || **m <= 0.0) {
        return Err(FiscalError::Sensitivity(format!("multiplier must be positive, got {bad}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{sample_cost_recovery, sample_gross_split};
    use approx::assert_relative_eq;

    fn runner() -> SensitivityRunner {
        let (contract, args) = sample_cost_recovery().unwrap();
        SensitivityRunner::new(contract, args)
    }

    #[test]
    fn test_unit_multiplier_reproduces_base_run() {
        let runner = runner();
        let base = runner.contract().run(&runner.args).unwrap();
        let point = runner.run_one(SensitivityParameter::Capex, 1.0).unwrap();
        assert_relative_eq!(
            point.contractor_npv,
            npv(&base.consolidated().cashflow, DEFAULT_DISCOUNT_RATE),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_higher_oil_price_raises_npv() {
        let points = runner().run(SensitivityParameter::OilPrice, &[0.8, 1.0, 1.2]).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points[0].contractor_npv < points[1].contractor_npv);
        assert!(points[1].contractor_npv < points[2].contractor_npv);
    }

    #[test]
    fn test_higher_opex_lowers_npv() {
        let points = runner().run(SensitivityParameter::Opex, &[0.5, 1.5]).unwrap();
        assert!(points[0].contractor_npv > points[1].contractor_npv);
    }

    #[test]
    fn test_base_contract_untouched() {
        let runner = runner();
        let before = runner.contract().clone();
        runner.run(SensitivityParameter::Lifting, &[2.0]).unwrap();
        assert_eq!(runner.contract(), &before);
    }

    #[test]
    fn test_gas_price_leaves_oil_revenue() {
        let runner = runner();
        let adjusted = runner.adjusted_contract(SensitivityParameter::GasPrice, 2.0).unwrap();
        let base = runner.contract().project();
        assert_eq!(adjusted.project().revenue(FluidType::Oil), base.revenue(FluidType::Oil));
        let gas: f64 = adjusted.project().revenue(FluidType::Gas).iter().sum();
        let base_gas: f64 = base.revenue(FluidType::Gas).iter().sum();
        assert_relative_eq!(gas, 2.0 * base_gas, max_relative = 1e-12);
    }

    #[test]
    fn test_run_all_covers_every_parameter() {
        let (contract, args) = sample_gross_split().unwrap();
        let points = SensitivityRunner::new(contract, args).run_all(&[0.9, 1.1]).unwrap();
        assert_eq!(points.len(), SensitivityParameter::ALL.len() * 2);
    }

    #[test]
    fn test_bad_multipliers_rejected() {
        let runner = runner();
        for bad in [vec![], vec![1.0, 0.0], vec![-0.5], vec![f64::NAN]] {
            let err = runner.run(SensitivityParameter::OilPrice, &bad).unwrap_err();
            assert!(matches!(err, FiscalError::Sensitivity(_)));
        }
    }
}

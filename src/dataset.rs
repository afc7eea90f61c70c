//! Built-in sample field used by the CLI, the sensitivity sweep and tests
//!
//! One oil and gas development over 2019-2035: exploration spend from 2019,
//! oil onstream in 2022 and gas in 2023. Amounts are in thousand USD,
//! oil volumes in MBBL and gas volumes in BSCF.

use chrono::NaiveDate;

use crate::contracts::config::{ContractArgs, CostRecoveryArgs, GrossSplitArgs, TransitionArgs};
use crate::contracts::cost_recovery::{CostRecovery, CostRecoveryParams};
use crate::contracts::gross_split::{GrossSplit, GrossSplitParams};
use crate::contracts::project::{BaseProject, ProjectCosts};
use crate::contracts::transition::Transition;
use crate::contracts::Contract;
use crate::econ::costs::{Asr, CapitalCost, Intangible, Opex};
use crate::econ::helper::Rate;
use crate::econ::revenue::Lifting;
use crate::econ::selection::{FluidType, FtpTaxRegime};
use crate::error::{FiscalError, FiscalResult};

pub const SAMPLE_START_YEAR: i32 = 2019;
pub const SAMPLE_END_YEAR: i32 = 2035;

/// Last year of the first contract in the sample transition
pub const SAMPLE_TRANSITION_YEAR: i32 = 2027;

const OIL_FIRST_YEAR: i32 = 2022;
const GAS_FIRST_YEAR: i32 = 2023;

type Schedule = Vec<(i32, f64)>;

fn oil_lifting() -> Schedule {
    (OIL_FIRST_YEAR..=SAMPLE_END_YEAR)
        .map(|y| (y, 1_500.0 * 0.88_f64.powi(y - OIL_FIRST_YEAR)))
        .collect()
}

fn gas_lifting() -> Schedule {
    (GAS_FIRST_YEAR..=SAMPLE_END_YEAR)
        .map(|y| (y, 9_000.0 * 0.92_f64.powi(y - GAS_FIRST_YEAR)))
        .collect()
}

fn oil_capital() -> Schedule {
    vec![(2020, 12_000.0), (2021, 28_000.0), (2026, 6_000.0), (2030, 4_000.0)]
}

fn gas_capital() -> Schedule {
    vec![(2021, 9_000.0), (2022, 14_000.0), (2029, 3_000.0)]
}

fn oil_intangible() -> Schedule {
    vec![(2019, 3_500.0), (2020, 7_500.0), (2028, 2_000.0)]
}

fn gas_intangible() -> Schedule {
    vec![(2020, 2_500.0), (2021, 4_000.0)]
}

fn oil_opex() -> Schedule {
    (OIL_FIRST_YEAR..=SAMPLE_END_YEAR).map(|y| (y, 3_200.0)).collect()
}

fn gas_opex() -> Schedule {
    (GAS_FIRST_YEAR..=SAMPLE_END_YEAR).map(|y| (y, 1_800.0)).collect()
}

fn oil_asr() -> Schedule {
    (OIL_FIRST_YEAR..=SAMPLE_END_YEAR).map(|y| (y, 150.0)).collect()
}

/// Entries of `schedule` falling in `start..=end`, split into years and values
fn window(schedule: &Schedule, start: i32, end: i32) -> (Vec<i32>, Vec<f64>) {
    schedule.iter().filter(|(y, _)| (start..=end).contains(y)).copied().unzip()
}

fn year_start(year: i32) -> FiscalResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| FiscalError::BaseProject(format!("invalid year {year}")))
}

fn year_end(year: i32) -> FiscalResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| FiscalError::BaseProject(format!("invalid year {year}")))
}

fn lifting(schedule: &Schedule, price: f64, fluid: FluidType, start: i32, end: i32) -> FiscalResult<Option<Lifting>> {
    let (years, rates) = window(schedule, start, end);
    if years.is_empty() {
        return Ok(None);
    }
    let prices = vec![price; years.len()];
    Lifting::new(start, end, years, rates, prices, fluid).map(Some)
}

/// Sample project restricted to `start..=end`
pub fn sample_project(start: i32, end: i32) -> FiscalResult<BaseProject> {
    let mut lifting_entities = Vec::new();
    lifting_entities.extend(lifting(&oil_lifting(), 65.0, FluidType::Oil, start, end)?);
    lifting_entities.extend(lifting(&gas_lifting(), 6.5, FluidType::Gas, start, end)?);

    let mut costs = ProjectCosts::default();
    for (schedule, fluid) in [(oil_capital(), FluidType::Oil), (gas_capital(), FluidType::Gas)] {
        let (years, cost) = window(&schedule, start, end);
        if !years.is_empty() {
            let alloc = vec![fluid; years.len()];
            costs.capital.push(CapitalCost::new(start, end, years, cost, alloc)?);
        }
    }
    for (schedule, fluid) in [(oil_intangible(), FluidType::Oil), (gas_intangible(), FluidType::Gas)] {
        let (years, cost) = window(&schedule, start, end);
        if !years.is_empty() {
            let alloc = vec![fluid; years.len()];
            costs.intangible.push(Intangible::new(start, end, years, cost, alloc)?);
        }
    }
    for (schedule, fluid) in [(oil_opex(), FluidType::Oil), (gas_opex(), FluidType::Gas)] {
        let (years, cost) = window(&schedule, start, end);
        if !years.is_empty() {
            let alloc = vec![fluid; years.len()];
            costs.opex.push(Opex::new(start, end, years, cost, alloc)?);
        }
    }
    let (years, cost) = window(&oil_asr(), start, end);
    if !years.is_empty() {
        let alloc = vec![FluidType::Oil; years.len()];
        costs.asr.push(Asr::new(start, end, years, cost, alloc)?);
    }

    BaseProject::new(year_start(start)?, year_end(end)?, None, None, lifting_entities, costs)
}

/// Contract terms of the sample Cost Recovery PSC
pub fn sample_cost_recovery_params() -> CostRecoveryParams {
    CostRecoveryParams {
        oil_ftp_portion: 0.2,
        gas_ftp_portion: 0.2,
        oil_ctr_pretax_share: 0.3472222,
        gas_ctr_pretax_share: 0.520833,
        ..CostRecoveryParams::default()
    }
}

pub fn sample_cost_recovery_args() -> CostRecoveryArgs {
    CostRecoveryArgs {
        effective_tax_rate: Some(Rate::Scalar(0.424)),
        ftp_tax_regime: FtpTaxRegime::PrePdjp20_2017,
        sunk_cost_reference_year: Some(2021),
        ..CostRecoveryArgs::default()
    }
}

/// The sample field under Cost Recovery for its whole life
pub fn sample_cost_recovery() -> FiscalResult<(Contract, ContractArgs)> {
    let project = sample_project(SAMPLE_START_YEAR, SAMPLE_END_YEAR)?;
    let contract = CostRecovery::new(project, sample_cost_recovery_params())?;
    Ok((
        Contract::CostRecovery(contract),
        ContractArgs::CostRecovery(sample_cost_recovery_args()),
    ))
}

/// The sample field under Gross Split for its whole life
pub fn sample_gross_split() -> FiscalResult<(Contract, ContractArgs)> {
    let project = sample_project(SAMPLE_START_YEAR, SAMPLE_END_YEAR)?;
    let contract = GrossSplit::new(project, GrossSplitParams::default())?;
    let args = GrossSplitArgs {
        sunk_cost_reference_year: Some(2021),
        ..GrossSplitArgs::default()
    };
    Ok((Contract::GrossSplit(contract), ContractArgs::GrossSplit(args)))
}

/// Cost Recovery through [`SAMPLE_TRANSITION_YEAR`], Gross Split afterwards
pub fn sample_transition() -> FiscalResult<(Transition, TransitionArgs)> {
    let first = sample_project(SAMPLE_START_YEAR, SAMPLE_TRANSITION_YEAR)?;
    let second = sample_project(SAMPLE_TRANSITION_YEAR + 1, SAMPLE_END_YEAR)?;
    let transition = Transition::new(
        Contract::CostRecovery(CostRecovery::new(first, sample_cost_recovery_params())?),
        Contract::GrossSplit(GrossSplit::new(second, GrossSplitParams::default())?),
    )?;
    let args = TransitionArgs {
        contract1: ContractArgs::CostRecovery(sample_cost_recovery_args()),
        contract2: ContractArgs::GrossSplit(GrossSplitArgs::default()),
        unrec_portion: 1.0,
    };
    Ok((transition, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn total(v: &[f64]) -> f64 {
        v.iter().sum()
    }

    #[test]
    fn test_sample_project_shape() {
        let project = sample_project(SAMPLE_START_YEAR, SAMPLE_END_YEAR).unwrap();
        assert_eq!(project.project_duration(), 17);
        assert_eq!(project.onstream_date(FluidType::Oil), NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(project.onstream_date(FluidType::Gas), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(project.producing_fluids(), 2);
    }

    #[test]
    fn test_windowed_project_drops_out_of_range_entries() {
        let project = sample_project(2028, SAMPLE_END_YEAR).unwrap();
        assert_eq!(project.start_year(), 2028);
        // 2029 gas capital and 2030 oil capital remain
        assert_eq!(project.costs().capital.len(), 2);
        assert!(project.revenue(FluidType::Oil).iter().all(|&r| r > 0.0));
    }

    #[test]
    fn test_cost_recovery_sample_partitions_revenue() {
        let (contract, args) = sample_cost_recovery().unwrap();
        let result = contract.run(&args).unwrap();
        let c = result.consolidated();
        for i in 0..c.len() {
            assert_relative_eq!(c.contractor_take[i] + c.government_take[i], c.revenue[i], epsilon = 1e-6);
        }
        assert!(total(&result.oil().government_take) > 0.0);
        assert!(total(&result.gas().government_take) > 0.0);
    }

    #[test]
    fn test_cost_recovery_sample_sunk_cost() {
        let (contract, args) = sample_cost_recovery().unwrap();
        let result = contract.run(&args).unwrap();
        // capital and intangible spent 2019..=2021
        let spent = 12_000.0 + 28_000.0 + 9_000.0 + 3_500.0 + 7_500.0 + 2_500.0 + 4_000.0;
        assert_relative_eq!(result.sunk_cost().unwrap(), spent, max_relative = 1e-9);
    }

    #[test]
    fn test_cost_recovery_sample_is_deterministic() {
        let (contract, args) = sample_cost_recovery().unwrap();
        let a = contract.run(&args).unwrap();
        let b = contract.run(&args).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_gross_split_sample_partitions_revenue() {
        let (contract, args) = sample_gross_split().unwrap();
        let result = contract.run(&args).unwrap();
        let c = result.consolidated();
        assert_relative_eq!(
            total(&c.contractor_take) + total(&c.government_take),
            total(&c.revenue),
            max_relative = 1e-9
        );
        assert!(c.tax.iter().all(|&t| t >= 0.0));
    }

    #[test]
    fn test_sample_transition_carries_balance() {
        let (transition, args) = sample_transition().unwrap();
        let result = transition.run(&args).unwrap();
        assert_eq!(result.project_years.first(), Some(&SAMPLE_START_YEAR));
        assert_eq!(result.project_years.last(), Some(&SAMPLE_END_YEAR));
        assert_eq!(result.consolidated.len(), 17);
    }
}

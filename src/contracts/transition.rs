//! Linking two consecutive contracts on one block
//!
//! The first contract runs on its own. Whatever cost it leaves unrecovered,
//! plus capital it has not yet depreciated, is scaled by the carry-over
//! portion and booked as an opening cost of the second contract, in the form
//! that contract can deduct. That opening cost never leaves the
//! contractor's pocket a second time, so it is added back to the second
//! contract's cash flow before the two timelines are joined.

use serde::Serialize;

use crate::contracts::config::TransitionArgs;
use crate::contracts::results::{to_rows, ContractSummary, StreamResult, YearRow};
use crate::contracts::{Contract, ContractResult};
use crate::econ::costs::{CapitalCost, CapitalCostData, CostItem, CostOfSales, ElementTax};
use crate::econ::helper::sub_arrays;
use crate::econ::selection::{FluidType, LimitMethod};
use crate::error::{FiscalError, FiscalResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    contract1: Contract,
    contract2: Contract,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionResult {
    /// Years of both contracts, contract 1 first
    pub project_years: Vec<i32>,
    pub contract1: ContractResult,
    /// Contract 2 as run with the carried-over cost, before the add-back
    pub contract2: ContractResult,
    pub oil: StreamResult,
    pub gas: StreamResult,
    pub consolidated: StreamResult,
    pub injected_oil: f64,
    pub injected_gas: f64,
}

impl TransitionResult {
    pub fn to_rows(&self) -> Vec<YearRow> {
        to_rows(&self.project_years, &self.consolidated)
    }

    pub fn summary(&self, discount_rate: f64, limit_method: LimitMethod) -> FiscalResult<ContractSummary> {
        ContractSummary::new(&self.project_years, &self.consolidated, discount_rate, limit_method)
    }
}

/// Move `amount` out of the spend columns and back into cash flow
fn add_back(stream: &mut StreamResult, amount: &[f64], as_capital: bool) {
    let column = if as_capital {
        &mut stream.capital
    } else {
        &mut stream.non_capital
    };
    *column = sub_arrays(column, amount);
    for (cf, a) in stream.cashflow.iter_mut().zip(amount) {
        *cf += a;
    }
}

impl Transition {
    /// Contract 1 may end no later than the year contract 2 starts
    pub fn new(contract1: Contract, contract2: Contract) -> FiscalResult<Self> {
        let end1 = contract1.project().end_year();
        let start2 = contract2.project().start_year();
        if end1 > start2 {
            return Err(FiscalError::GeneralConfig(format!(
                "first contract ends in {end1}, after the second contract starts in {start2}"
            )));
        }
        Ok(Self { contract1, contract2 })
    }

    pub fn contract1(&self) -> &Contract {
        &self.contract1
    }

    pub fn contract2(&self) -> &Contract {
        &self.contract2
    }

    /// Opening cost item carrying `amount` of `fluid` into contract 2
    fn carry_item(&self, fluid: FluidType, amount: f64) -> FiscalResult<CostItem> {
        let project = self.contract2.project();
        let (start, end) = (project.start_year(), project.end_year());
        Ok(match self.contract2 {
            Contract::CostRecovery(_) => CostItem::Capital(CapitalCost::from_data(CapitalCostData {
                start_year: start,
                end_year: end,
                expense_year: vec![start],
                cost: vec![amount],
                cost_allocation: vec![fluid],
                description: Some(vec!["carried over from previous contract".to_string()]),
                tax: ElementTax::default(),
                pis_year: None,
                salvage_value: None,
                useful_life: Some(vec![1.0]),
                depreciation_factor: None,
                is_ic_applied: None,
            })?),
            Contract::GrossSplit(_) => {
                CostItem::CostOfSales(CostOfSales::new(start, end, vec![start], vec![amount], vec![fluid])?)
            }
        })
    }

    pub fn run(&self, args: &TransitionArgs) -> FiscalResult<TransitionResult> {
        if !(0.0..=1.0).contains(&args.unrec_portion) {
            return Err(FiscalError::GeneralConfig(format!(
                "unrec_portion must lie in [0, 1], got {}",
                args.unrec_portion
            )));
        }
        let p1 = self.contract1.project();
        let p2 = self.contract2.project();
        log::debug!(
            "transition: {} {}..{} into {} {}..{}",
            self.contract1.kind(),
            p1.start_year(),
            p1.end_year(),
            self.contract2.kind(),
            p2.start_year(),
            p2.end_year()
        );

        let result1 = self.contract1.run(&args.contract1)?;

        let mut injected = [0.0; 2];
        let mut contract2 = self.contract2.clone();
        for (slot, fluid) in injected.iter_mut().zip([FluidType::Oil, FluidType::Gas]) {
            let balance = result1.ending_unrecovered(fluid) + result1.undepreciated(fluid);
            let amount = balance * args.unrec_portion;
            if amount != 0.0 {
                contract2 = contract2.with_cost(self.carry_item(fluid, amount)?)?;
            }
            *slot = amount;
        }

        let result2 = contract2.run(&args.contract2)?;

        // Injected spend as contract 2 books it, after its own cost rules
        let rates = args.contract2.expenditure_rates(p2);
        let mut streams2 = [result2.oil().clone(), result2.gas().clone()];
        let mut consolidated2 = result2.consolidated().clone();
        let as_capital = matches!(self.contract2, Contract::CostRecovery(_));
        for (stream, fluid) in streams2.iter_mut().zip([FluidType::Oil, FluidType::Gas]) {
            let with = contract2.project().cost_arrays(fluid, &rates)?.total();
            let without = p2.cost_arrays(fluid, &rates)?.total();
            let carried = sub_arrays(&with, &without);
            add_back(stream, &carried, as_capital);
            add_back(&mut consolidated2, &carried, as_capital);
        }

        // Both contracts on one axis; a year they share holds the sum of the two
        let start1 = p1.start_year();
        let offset2 = (p2.start_year() - start1) as usize;
        let end = p1.end_year().max(p2.end_year());
        let n = (end - start1 + 1) as usize;
        let join = |first: &StreamResult, second: &StreamResult| first.placed(0, n).sum(&second.placed(offset2, n));

        let project_years: Vec<i32> = (start1..=end).collect();

        let [oil2, gas2] = streams2;
        let oil = join(result1.oil(), &oil2);
        let gas = join(result1.gas(), &gas2);
        let consolidated = join(result1.consolidated(), &consolidated2);

        log::debug!(
            "transition done: {} years, carried oil {:.2}, gas {:.2}",
            project_years.len(),
            injected[0],
            injected[1]
        );

        Ok(TransitionResult {
            project_years,
            contract1: result1,
            contract2: result2,
            oil,
            gas,
            consolidated,
            injected_oil: injected[0],
            injected_gas: injected[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::config::{ContractArgs, CostRecoveryArgs, GrossSplitArgs};
    use crate::contracts::cost_recovery::{CostRecovery, CostRecoveryParams};
    use crate::contracts::gross_split::{GrossSplit, GrossSplitParams};
    use crate::contracts::project::{BaseProject, ProjectCosts};
    use crate::econ::costs::Opex;
    use crate::econ::revenue::Lifting;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn project(start: i32, end: i32, capital: f64) -> BaseProject {
        producing_project(start, start + 1, end, capital)
    }

    fn producing_project(start: i32, first_lifting: i32, end: i32, capital: f64) -> BaseProject {
        let years: Vec<i32> = (first_lifting..=end).collect();
        let n = years.len();
        let oil = Lifting::new(start, end, years.clone(), vec![10.0; n], vec![50.0; n], FluidType::Oil).unwrap();
        let costs = ProjectCosts {
            capital: vec![CapitalCost::new(start, end, vec![start], vec![capital], vec![FluidType::Oil]).unwrap()],
            opex: vec![Opex::new(start, end, years, vec![100.0; n], vec![FluidType::Oil; n]).unwrap()],
            ..Default::default()
        };
        BaseProject::new(
            NaiveDate::from_ymd_opt(start, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(end, 12, 31).unwrap(),
            None,
            None,
            vec![oil],
            costs,
        )
        .unwrap()
    }

    fn cost_recovery(start: i32, end: i32, capital: f64) -> Contract {
        Contract::CostRecovery(CostRecovery::new(project(start, end, capital), CostRecoveryParams::default()).unwrap())
    }

    fn gross_split(start: i32, end: i32, capital: f64) -> Contract {
        Contract::GrossSplit(GrossSplit::new(project(start, end, capital), GrossSplitParams::default()).unwrap())
    }

    fn args(first: ContractArgs, second: ContractArgs) -> TransitionArgs {
        TransitionArgs {
            contract1: first,
            contract2: second,
            unrec_portion: 1.0,
        }
    }

    fn cr_args() -> ContractArgs {
        ContractArgs::CostRecovery(CostRecoveryArgs::default())
    }

    fn gs_args() -> ContractArgs {
        ContractArgs::GrossSplit(GrossSplitArgs::default())
    }

    #[test]
    fn test_overlapping_contracts_rejected() {
        let err = Transition::new(cost_recovery(2020, 2026, 100.0), gross_split(2025, 2030, 0.0)).unwrap_err();
        assert!(matches!(err, FiscalError::GeneralConfig(_)));
    }

    #[test]
    fn test_timeline_continuity() {
        let t = Transition::new(cost_recovery(2020, 2024, 1000.0), cost_recovery(2025, 2030, 0.0)).unwrap();
        let result = t.run(&args(cr_args(), cr_args())).unwrap();
        assert_eq!(result.project_years, (2020..=2030).collect::<Vec<_>>());
        assert_eq!(result.consolidated.len(), 5 + 6);
        assert_eq!(&result.consolidated.cashflow[..5], &result.contract1.consolidated().cashflow[..]);
    }

    #[test]
    fn test_unrecovered_cost_carried_into_gross_split() {
        // Revenue of 500 a year cannot recover 5000 of capital in four years
        let t = Transition::new(cost_recovery(2020, 2024, 5000.0), gross_split(2025, 2030, 0.0)).unwrap();
        let result = t.run(&args(cr_args(), gs_args())).unwrap();
        let carried = result.contract1.ending_unrecovered(FluidType::Oil) + result.contract1.undepreciated(FluidType::Oil);
        assert!(carried > 0.0);
        assert_relative_eq!(result.injected_oil, carried, epsilon = 1e-9);
        assert_eq!(result.injected_gas, 0.0);

        // Deducted in contract 2 but not paid again
        let first = 5;
        assert_relative_eq!(result.consolidated.non_capital[first], 0.0, epsilon = 1e-9);
        let booked = result.contract2.consolidated();
        assert_relative_eq!(booked.non_capital[0], carried, epsilon = 1e-9);
        assert_relative_eq!(result.consolidated.cashflow[first], booked.cashflow[0] + carried, epsilon = 1e-9);
    }

    #[test]
    fn test_carried_cost_lowers_contract2_tax() {
        let linked = Transition::new(cost_recovery(2020, 2024, 5000.0), cost_recovery(2025, 2030, 0.0)).unwrap();
        let with_carry = linked.run(&args(cr_args(), cr_args())).unwrap();
        let no_carry = linked
            .run(&TransitionArgs {
                unrec_portion: 0.0,
                ..args(cr_args(), cr_args())
            })
            .unwrap();
        assert_eq!(no_carry.injected_oil, 0.0);
        let tax = |r: &TransitionResult| r.consolidated.tax[5..].iter().sum::<f64>();
        assert!(tax(&with_carry) < tax(&no_carry));
    }

    #[test]
    fn test_gap_years_are_zero_filled() {
        let t = Transition::new(gross_split(2020, 2023, 0.0), gross_split(2026, 2030, 0.0)).unwrap();
        let result = t.run(&args(gs_args(), gs_args())).unwrap();
        assert_eq!(result.project_years.len(), 4 + 2 + 5);
        assert_eq!(result.project_years[4], 2024);
        assert_eq!(result.consolidated.revenue[4], 0.0);
        assert_eq!(result.consolidated.cashflow[5], 0.0);
    }

    #[test]
    fn test_shared_year_adds_both_contracts() {
        // Contract 2 signs mid-2025 and lifts from its first year
        let base = producing_project(2025, 2025, 2030, 0.0);
        let second = BaseProject::new(
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
            None,
            None,
            base.lifting().to_vec(),
            base.costs().clone(),
        )
        .unwrap();
        let second = Contract::GrossSplit(GrossSplit::new(second, GrossSplitParams::default()).unwrap());
        let t = Transition::new(gross_split(2020, 2025, 0.0), second).unwrap();
        let result = t.run(&args(gs_args(), gs_args())).unwrap();
        assert_eq!(result.project_years, (2020..=2030).collect::<Vec<_>>());
        assert_eq!(result.consolidated.len(), 11);

        let shared = 5;
        let c1 = result.contract1.consolidated();
        let c2 = result.contract2.consolidated();
        assert!(c2.revenue[0] > 0.0);
        assert_relative_eq!(result.consolidated.revenue[shared], c1.revenue[shared] + c2.revenue[0], epsilon = 1e-9);
        assert_relative_eq!(result.consolidated.tax[shared], c1.tax[shared] + c2.tax[0], epsilon = 1e-9);
        let total = |v: &[f64]| v.iter().sum::<f64>();
        assert_relative_eq!(
            total(&result.consolidated.revenue),
            total(&c1.revenue) + total(&c2.revenue),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_portion_out_of_range_rejected() {
        let t = Transition::new(gross_split(2020, 2024, 0.0), gross_split(2025, 2030, 0.0)).unwrap();
        let err = t
            .run(&TransitionArgs {
                unrec_portion: 1.5,
                ..args(gs_args(), gs_args())
            })
            .unwrap_err();
        assert!(matches!(err, FiscalError::GeneralConfig(_)));
    }
}

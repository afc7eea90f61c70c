//! Capital (depreciable) cost

use serde::{Deserialize, Serialize};

use super::{check_lengths, CostElements, CostEntity, ElementTax, FiscalRates};
use crate::econ::depreciation;
use crate::econ::helper::{cumsum, dense_projection, sub_arrays};
use crate::econ::selection::{DeprMethod, FluidType};
use crate::error::{EntityError, FiscalError, FiscalResult};

/// Serializable input for [`CapitalCost`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapitalCostData {
    pub start_year: i32,
    pub end_year: i32,
    pub expense_year: Vec<i32>,
    pub cost: Vec<f64>,
    pub cost_allocation: Vec<FluidType>,
    #[serde(default)]
    pub description: Option<Vec<String>>,
    #[serde(default)]
    pub tax: ElementTax,
    /// Placed-in-service year; defaults to the expense year
    #[serde(default)]
    pub pis_year: Option<Vec<i32>>,
    #[serde(default)]
    pub salvage_value: Option<Vec<f64>>,
    /// Years; defaults to 5
    #[serde(default)]
    pub useful_life: Option<Vec<f64>>,
    /// PSC declining-balance rate; defaults to 0.5
    #[serde(default)]
    pub depreciation_factor: Option<Vec<f64>>,
    #[serde(default)]
    pub is_ic_applied: Option<Vec<bool>>,
}

/// Depreciable cost elements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalCost {
    elements: CostElements,
    pis_year: Vec<i32>,
    salvage_value: Vec<f64>,
    useful_life: Vec<f64>,
    depreciation_factor: Vec<f64>,
    is_ic_applied: Vec<bool>,
}

impl CapitalCost {
    /// Elements with default depreciation parameters
    pub fn new(
        start_year: i32,
        end_year: i32,
        expense_year: Vec<i32>,
        cost: Vec<f64>,
        cost_allocation: Vec<FluidType>,
    ) -> FiscalResult<Self> {
        Self::from_data(CapitalCostData {
            start_year,
            end_year,
            expense_year,
            cost,
            cost_allocation,
            description: None,
            tax: ElementTax::default(),
            pis_year: None,
            salvage_value: None,
            useful_life: None,
            depreciation_factor: None,
            is_ic_applied: None,
        })
    }

    pub fn from_data(data: CapitalCostData) -> FiscalResult<Self> {
        let elements = CostElements::new(
            data.start_year,
            data.end_year,
            data.expense_year,
            data.cost,
            data.cost_allocation,
            data.description,
            &data.tax,
        )
        .map_err(Self::wrap)?;
        let n = elements.len();

        let pis_year = data.pis_year.unwrap_or_else(|| elements.expense_year().to_vec());
        let salvage_value = data.salvage_value.unwrap_or_else(|| vec![0.0; n]);
        let useful_life = data.useful_life.unwrap_or_else(|| vec![5.0; n]);
        let depreciation_factor = data.depreciation_factor.unwrap_or_else(|| vec![0.5; n]);
        let is_ic_applied = data.is_ic_applied.unwrap_or_else(|| vec![false; n]);

        check_lengths(&[
            ("cost", n),
            ("pis_year", pis_year.len()),
            ("salvage_value", salvage_value.len()),
            ("useful_life", useful_life.len()),
            ("depreciation_factor", depreciation_factor.len()),
            ("is_ic_applied", is_ic_applied.len()),
        ])
        .map_err(Self::wrap)?;

        for i in 0..n {
            let cost = elements.cost()[i];
            if salvage_value[i] > cost {
                return Err(Self::wrap(EntityError::SalvageExceedsCost {
                    index: i,
                    salvage: salvage_value[i],
                    cost,
                }));
            }
            if useful_life[i] <= 0.0 {
                return Err(Self::wrap(EntityError::NonPositive {
                    field: "useful_life",
                    value: useful_life[i],
                }));
            }
            if !(0.0..=1.0).contains(&depreciation_factor[i]) {
                return Err(Self::wrap(EntityError::PortionOutOfRange {
                    field: "depreciation_factor",
                    value: depreciation_factor[i],
                }));
            }
            if pis_year[i] < elements.start_year() {
                return Err(Self::wrap(EntityError::YearOutOfRange {
                    field: "pis_year",
                    year: pis_year[i],
                    start_year: elements.start_year(),
                    end_year: elements.end_year(),
                }));
            }
        }

        Ok(Self {
            elements,
            pis_year,
            salvage_value,
            useful_life,
            depreciation_factor,
            is_ic_applied,
        })
    }

    pub fn pis_year(&self) -> &[i32] {
        &self.pis_year
    }

    pub fn useful_life(&self) -> &[f64] {
        &self.useful_life
    }

    /// Raw cost of the elements eligible for investment credit, by expense year
    pub fn ic_eligible_cost(&self) -> Vec<f64> {
        let amounts: Vec<f64> = self
            .elements
            .cost()
            .iter()
            .zip(&self.is_ic_applied)
            .map(|(c, &applied)| if applied { *c } else { 0.0 })
            .collect();
        self.project_elements(&amounts)
    }

    /// Yearly depreciation charge summed over elements, plus the amount still
    /// undepreciated at the end of the entity's period.
    ///
    /// Each element's basis is its post-tax cost. Charges falling after the
    /// end year are not shown but stay in the undepreciated amount.
    pub fn total_depreciation_rate(
        &self,
        method: DeprMethod,
        decline_factor: f64,
        rates: &FiscalRates,
    ) -> FiscalResult<(Vec<f64>, f64)> {
        let basis = self.elements.element_cost_post_tax(rates)?;
        let start = self.elements.start_year();
        let duration = self.elements.project_duration();
        let mut total = vec![0.0; duration];

        for i in 0..basis.len() {
            let charges = depreciation::schedule(
                method,
                basis[i],
                self.salvage_value[i],
                self.useful_life[i],
                self.depreciation_factor[i],
                decline_factor,
            )
            .map_err(Self::wrap)?;
            let offset = (self.pis_year[i] - start) as usize;
            for (k, charge) in charges.iter().enumerate() {
                if let Some(slot) = total.get_mut(offset + k) {
                    *slot += charge;
                }
            }
        }

        let shown: f64 = total.iter().sum();
        let undepreciated = basis.iter().sum::<f64>() - self.salvage_value.iter().sum::<f64>() - shown;
        Ok((total, undepreciated))
    }

    /// Cumulative post-tax spend less cumulative depreciation
    pub fn total_depreciation_book_value(
        &self,
        method: DeprMethod,
        decline_factor: f64,
        rates: &FiscalRates,
    ) -> FiscalResult<Vec<f64>> {
        let spend = self.expenditures_post_tax(rates)?;
        let (depr, _) = self.total_depreciation_rate(method, decline_factor, rates)?;
        Ok(sub_arrays(&cumsum(&spend), &cumsum(&depr)))
    }
}

impl CostEntity for CapitalCost {
    const CATEGORY: &'static str = "Capital";

    fn elements(&self) -> &CostElements {
        &self.elements
    }

    fn wrap(err: EntityError) -> FiscalError {
        FiscalError::Capital(err)
    }

    fn combine(&self, other: &Self) -> FiscalResult<Self> {
        fn cat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            a.iter().chain(b).cloned().collect()
        }
        Ok(Self {
            elements: self.elements.merged(&other.elements),
            pis_year: cat(&self.pis_year, &other.pis_year),
            salvage_value: cat(&self.salvage_value, &other.salvage_value),
            useful_life: cat(&self.useful_life, &other.useful_life),
            depreciation_factor: cat(&self.depreciation_factor, &other.depreciation_factor),
            is_ic_applied: cat(&self.is_ic_applied, &other.is_ic_applied),
        })
    }

    fn select(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(v: &[T], idx: &[usize]) -> Vec<T> {
            idx.iter().map(|&i| v[i].clone()).collect()
        }
        Self {
            elements: self.elements.selected(indices),
            pis_year: pick(&self.pis_year, indices),
            salvage_value: pick(&self.salvage_value, indices),
            useful_life: pick(&self.useful_life, indices),
            depreciation_factor: pick(&self.depreciation_factor, indices),
            is_ic_applied: pick(&self.is_ic_applied, indices),
        }
    }

    fn map_cost(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            elements: self.elements.with_cost(self.elements.cost().iter().map(|&c| f(c)).collect()),
            salvage_value: self.salvage_value.iter().map(|&s| f(s)).collect(),
            ..self.clone()
        }
    }

    fn widen(&self, start_year: i32, end_year: i32) -> Self {
        Self {
            elements: self.elements.with_years(start_year, end_year),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single(cost: f64, useful_life: f64, factor: f64, end_year: i32) -> CapitalCost {
        CapitalCost::from_data(CapitalCostData {
            start_year: 2020,
            end_year,
            expense_year: vec![2020],
            cost: vec![cost],
            cost_allocation: vec![FluidType::Oil],
            description: None,
            tax: ElementTax::default(),
            pis_year: Some(vec![2021]),
            salvage_value: None,
            useful_life: Some(vec![useful_life]),
            depreciation_factor: Some(vec![factor]),
            is_ic_applied: Some(vec![true]),
        })
        .unwrap()
    }

    #[test]
    fn test_salvage_above_cost_rejected() {
        let err = CapitalCost::from_data(CapitalCostData {
            salvage_value: Some(vec![200.0]),
            ..single(100.0, 5.0, 0.5, 2030).to_data()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            FiscalError::Capital(EntityError::SalvageExceedsCost { index: 0, .. })
        ));
    }

    #[test]
    fn test_depreciation_factor_outside_unit_interval_rejected() {
        let err = CapitalCost::from_data(CapitalCostData {
            depreciation_factor: Some(vec![1.2]),
            ..single(100.0, 5.0, 0.5, 2030).to_data()
        })
        .unwrap_err();
        assert!(matches!(err, FiscalError::Capital(EntityError::PortionOutOfRange { .. })));
    }

    #[test]
    fn test_straight_line_starts_at_pis_year() {
        let cap = single(100.0, 4.0, 0.5, 2030);
        let rates = FiscalRates::none(2020, 11);
        let (depr, undepr) = cap
            .total_depreciation_rate(DeprMethod::StraightLine, 1.0, &rates)
            .unwrap();
        assert_eq!(depr.len(), 11);
        assert_relative_eq!(depr[0], 0.0);
        for year in 1..=4 {
            assert_relative_eq!(depr[year], 25.0, epsilon = 1e-9);
        }
        assert_relative_eq!(depr[5], 0.0);
        assert_relative_eq!(undepr, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_truncated_schedule_leaves_undepreciated() {
        let cap = single(100.0, 5.0, 0.5, 2023);
        let rates = FiscalRates::none(2020, 4);
        let (depr, undepr) = cap
            .total_depreciation_rate(DeprMethod::StraightLine, 1.0, &rates)
            .unwrap();
        assert_relative_eq!(depr.iter().sum::<f64>(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(undepr, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_book_value_ends_at_zero_when_fully_depreciated() {
        let cap = single(100.0, 3.0, 0.5, 2030);
        let rates = FiscalRates::none(2020, 11);
        let book = cap
            .total_depreciation_book_value(DeprMethod::PscDecliningBalance, 1.0, &rates)
            .unwrap();
        assert_relative_eq!(book[0], 100.0);
        assert_relative_eq!(book[10], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ic_eligible_cost() {
        let cap = single(80.0, 5.0, 0.5, 2022);
        assert_eq!(cap.ic_eligible_cost(), vec![80.0, 0.0, 0.0]);
    }

    impl CapitalCost {
        fn to_data(&self) -> CapitalCostData {
            CapitalCostData {
                start_year: self.elements.start_year(),
                end_year: self.elements.end_year(),
                expense_year: self.elements.expense_year().to_vec(),
                cost: self.elements.cost().to_vec(),
                cost_allocation: self.elements.cost_allocation().to_vec(),
                description: None,
                tax: ElementTax::default(),
                pis_year: Some(self.pis_year.clone()),
                salvage_value: Some(self.salvage_value.clone()),
                useful_life: Some(self.useful_life.clone()),
                depreciation_factor: Some(self.depreciation_factor.clone()),
                is_ic_applied: Some(self.is_ic_applied.clone()),
            }
        }
    }
}

//! Land and building tax (LBT / PBB)
//!
//! When no cost is given, each element's cost is derived from the surface
//! tax base (utilized area times NJOP) and the subsurface base (gross revenue).

use serde::{Deserialize, Serialize};

use super::{check_final_year, check_lengths, distribute_to_final_year, CostElements, CostEntity, ElementTax};
use crate::econ::selection::FluidType;
use crate::error::{EntityError, FiscalError, FiscalResult};

/// Statutory tariff times assessment ratio
const LBT_FACTOR: f64 = 0.005 * 0.4;
/// Subsurface multiplier on gross revenue
const SUBSURFACE_MULTIPLIER: f64 = 10.04;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LbtData {
    pub start_year: i32,
    pub end_year: i32,
    pub expense_year: Vec<i32>,
    #[serde(default)]
    pub cost: Option<Vec<f64>>,
    pub cost_allocation: Vec<FluidType>,
    #[serde(default)]
    pub description: Option<Vec<String>>,
    #[serde(default)]
    pub tax: ElementTax,
    #[serde(default)]
    pub final_year: Option<Vec<i32>>,
    #[serde(default)]
    pub utilized_land_area: Option<Vec<f64>>,
    #[serde(default)]
    pub utilized_building_area: Option<Vec<f64>>,
    #[serde(default)]
    pub njop_land: Option<Vec<f64>>,
    #[serde(default)]
    pub njop_building: Option<Vec<f64>>,
    #[serde(default)]
    pub gross_revenue: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lbt {
    elements: CostElements,
    final_year: Vec<i32>,
}

impl Lbt {
    pub fn new(
        start_year: i32,
        end_year: i32,
        expense_year: Vec<i32>,
        cost: Vec<f64>,
        cost_allocation: Vec<FluidType>,
    ) -> FiscalResult<Self> {
        Self::from_data(LbtData {
            start_year,
            end_year,
            expense_year,
            cost: Some(cost),
            cost_allocation,
            description: None,
            tax: ElementTax::default(),
            final_year: None,
            utilized_land_area: None,
            utilized_building_area: None,
            njop_land: None,
            njop_building: None,
            gross_revenue: None,
        })
    }

    pub fn from_data(data: LbtData) -> FiscalResult<Self> {
        let n = data.expense_year.len();
        let zeros = || vec![0.0; n];
        let land = data.utilized_land_area.unwrap_or_else(zeros);
        let building = data.utilized_building_area.unwrap_or_else(zeros);
        let njop_land = data.njop_land.unwrap_or_else(zeros);
        let njop_building = data.njop_building.unwrap_or_else(zeros);
        let gross_revenue = data.gross_revenue.unwrap_or_else(zeros);

        check_lengths(&[
            ("expense_year", n),
            ("utilized_land_area", land.len()),
            ("utilized_building_area", building.len()),
            ("njop_land", njop_land.len()),
            ("njop_building", njop_building.len()),
            ("gross_revenue", gross_revenue.len()),
        ])
        .map_err(Self::wrap)?;

        let cost = data.cost.unwrap_or_else(|| {
            (0..n)
                .map(|i| {
                    let surface = land[i] * njop_land[i] + building[i] * njop_building[i];
                    LBT_FACTOR * surface + LBT_FACTOR * SUBSURFACE_MULTIPLIER * gross_revenue[i]
                })
                .collect()
        });

        let elements = CostElements::new(
            data.start_year,
            data.end_year,
            data.expense_year,
            cost,
            data.cost_allocation,
            data.description,
            &data.tax,
        )
        .map_err(Self::wrap)?;
        let final_year = data.final_year.unwrap_or_else(|| elements.expense_year().to_vec());
        check_lengths(&[("cost", elements.len()), ("final_year", final_year.len())]).map_err(Self::wrap)?;
        check_final_year(&elements, &final_year).map_err(Self::wrap)?;

        Ok(Self { elements, final_year })
    }
}

impl CostEntity for Lbt {
    const CATEGORY: &'static str = "LBT";

    fn elements(&self) -> &CostElements {
        &self.elements
    }

    fn wrap(err: EntityError) -> FiscalError {
        FiscalError::Lbt(err)
    }

    fn combine(&self, other: &Self) -> FiscalResult<Self> {
        Ok(Self {
            elements: self.elements.merged(&other.elements),
            final_year: self.final_year.iter().chain(&other.final_year).copied().collect(),
        })
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            elements: self.elements.selected(indices),
            final_year: indices.iter().map(|&i| self.final_year[i]).collect(),
        }
    }

    fn map_cost(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            elements: self.elements.with_cost(self.elements.cost().iter().map(|&c| f(c)).collect()),
            final_year: self.final_year.clone(),
        }
    }

    fn widen(&self, start_year: i32, end_year: i32) -> Self {
        Self {
            elements: self.elements.with_years(start_year, end_year),
            final_year: self.final_year.clone(),
        }
    }

    fn project_elements(&self, amounts: &[f64]) -> Vec<f64> {
        distribute_to_final_year(
            self.elements.start_year(),
            self.elements.project_duration(),
            self.elements.expense_year(),
            &self.final_year,
            amounts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cost_derived_from_tax_base() {
        let lbt = Lbt::from_data(LbtData {
            start_year: 2020,
            end_year: 2021,
            expense_year: vec![2021],
            cost: None,
            cost_allocation: vec![FluidType::Oil],
            description: None,
            tax: ElementTax::default(),
            final_year: None,
            utilized_land_area: Some(vec![1000.0]),
            utilized_building_area: Some(vec![200.0]),
            njop_land: Some(vec![5.0]),
            njop_building: Some(vec![10.0]),
            gross_revenue: Some(vec![100.0]),
        })
        .unwrap();
        let expected = 0.002 * (5000.0 + 2000.0) + 0.002 * 10.04 * 100.0;
        assert_relative_eq!(lbt.expenditures()[1], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_explicit_cost_spread_to_final_year() {
        let lbt = Lbt::from_data(LbtData {
            start_year: 2020,
            end_year: 2022,
            expense_year: vec![2020],
            cost: Some(vec![30.0]),
            cost_allocation: vec![FluidType::Gas],
            description: None,
            tax: ElementTax::default(),
            final_year: Some(vec![2022]),
            utilized_land_area: None,
            utilized_building_area: None,
            njop_land: None,
            njop_building: None,
            gross_revenue: None,
        })
        .unwrap();
        assert_eq!(lbt.expenditures(), vec![10.0, 10.0, 10.0]);
    }
}

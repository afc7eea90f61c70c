//! Operating expenditure
//!
//! Each element's cost is `fixed_cost + prod_rate * cost_per_volume`.

use serde::{Deserialize, Serialize};

use super::{check_lengths, CostElements, CostEntity, ElementTax};
use crate::econ::selection::FluidType;
use crate::error::{EntityError, FiscalError, FiscalResult};

/// Serializable input for [`Opex`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpexData {
    pub start_year: i32,
    pub end_year: i32,
    pub expense_year: Vec<i32>,
    pub fixed_cost: Vec<f64>,
    pub cost_allocation: Vec<FluidType>,
    #[serde(default)]
    pub description: Option<Vec<String>>,
    #[serde(default)]
    pub tax: ElementTax,
    #[serde(default)]
    pub prod_rate: Option<Vec<f64>>,
    #[serde(default)]
    pub cost_per_volume: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opex {
    elements: CostElements,
    fixed_cost: Vec<f64>,
    prod_rate: Vec<f64>,
    cost_per_volume: Vec<f64>,
}

impl Opex {
    /// Fixed-cost-only elements
    pub fn new(
        start_year: i32,
        end_year: i32,
        expense_year: Vec<i32>,
        fixed_cost: Vec<f64>,
        cost_allocation: Vec<FluidType>,
    ) -> FiscalResult<Self> {
        Self::from_data(OpexData {
            start_year,
            end_year,
            expense_year,
            fixed_cost,
            cost_allocation,
            description: None,
            tax: ElementTax::default(),
            prod_rate: None,
            cost_per_volume: None,
        })
    }

    pub fn from_data(data: OpexData) -> FiscalResult<Self> {
        let n = data.fixed_cost.len();
        let prod_rate = data.prod_rate.unwrap_or_else(|| vec![0.0; n]);
        let cost_per_volume = data.cost_per_volume.unwrap_or_else(|| vec![0.0; n]);
        check_lengths(&[
            ("fixed_cost", n),
            ("prod_rate", prod_rate.len()),
            ("cost_per_volume", cost_per_volume.len()),
        ])
        .map_err(Self::wrap)?;

        let cost = Self::total(&data.fixed_cost, &prod_rate, &cost_per_volume);
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

        Ok(Self {
            elements,
            fixed_cost: data.fixed_cost,
            prod_rate,
            cost_per_volume,
        })
    }

    fn total(fixed: &[f64], prod_rate: &[f64], cpv: &[f64]) -> Vec<f64> {
        fixed
            .iter()
            .zip(prod_rate)
            .zip(cpv)
            .map(|((f, p), c)| f + p * c)
            .collect()
    }

    pub fn fixed_cost(&self) -> &[f64] {
        &self.fixed_cost
    }

    /// Variable part of each element's cost
    pub fn variable_cost(&self) -> Vec<f64> {
        self.prod_rate
            .iter()
            .zip(&self.cost_per_volume)
            .map(|(p, c)| p * c)
            .collect()
    }
}

impl CostEntity for Opex {
    const CATEGORY: &'static str = "OPEX";

    fn elements(&self) -> &CostElements {
        &self.elements
    }

    fn wrap(err: EntityError) -> FiscalError {
        FiscalError::Opex(err)
    }

    fn combine(&self, other: &Self) -> FiscalResult<Self> {
        fn cat(a: &[f64], b: &[f64]) -> Vec<f64> {
            a.iter().chain(b).copied().collect()
        }
        Ok(Self {
            elements: self.elements.merged(&other.elements),
            fixed_cost: cat(&self.fixed_cost, &other.fixed_cost),
            prod_rate: cat(&self.prod_rate, &other.prod_rate),
            cost_per_volume: cat(&self.cost_per_volume, &other.cost_per_volume),
        })
    }

    fn select(&self, indices: &[usize]) -> Self {
        let pick = |v: &[f64]| indices.iter().map(|&i| v[i]).collect::<Vec<_>>();
        Self {
            elements: self.elements.selected(indices),
            fixed_cost: pick(&self.fixed_cost),
            prod_rate: pick(&self.prod_rate),
            cost_per_volume: pick(&self.cost_per_volume),
        }
    }

    fn map_cost(&self, f: impl Fn(f64) -> f64) -> Self {
        let fixed_cost: Vec<f64> = self.fixed_cost.iter().map(|&c| f(c)).collect();
        let cost_per_volume: Vec<f64> = self.cost_per_volume.iter().map(|&c| f(c)).collect();
        let cost = Self::total(&fixed_cost, &self.prod_rate, &cost_per_volume);
        Self {
            elements: self.elements.with_cost(cost),
            fixed_cost,
            prod_rate: self.prod_rate.clone(),
            cost_per_volume,
        }
    }

    fn widen(&self, start_year: i32, end_year: i32) -> Self {
        Self {
            elements: self.elements.with_years(start_year, end_year),
            ..self.clone()
        }
    }
}

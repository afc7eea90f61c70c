//! Abandonment and site restoration (ASR) cost
//!
//! Each element is escalated by its future rate from its expense year to its
//! final year, then spread evenly over that span.

use serde::{Deserialize, Serialize};

use super::{check_final_year, check_lengths, distribute_to_final_year, CostElements, CostEntity, ElementTax};
use crate::econ::selection::FluidType;
use crate::error::{EntityError, FiscalError, FiscalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AsrData {
    pub start_year: i32,
    pub end_year: i32,
    pub expense_year: Vec<i32>,
    pub cost: Vec<f64>,
    pub cost_allocation: Vec<FluidType>,
    #[serde(default)]
    pub description: Option<Vec<String>>,
    #[serde(default)]
    pub tax: ElementTax,
    /// Last year of the spread; defaults to the expense year
    #[serde(default)]
    pub final_year: Option<Vec<i32>>,
    #[serde(default)]
    pub future_rate: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asr {
    elements: CostElements,
    final_year: Vec<i32>,
    future_rate: Vec<f64>,
}

impl Asr {
    pub fn new(
        start_year: i32,
        end_year: i32,
        expense_year: Vec<i32>,
        cost: Vec<f64>,
        cost_allocation: Vec<FluidType>,
    ) -> FiscalResult<Self> {
        Self::from_data(AsrData {
            start_year,
            end_year,
            expense_year,
            cost,
            cost_allocation,
            description: None,
            tax: ElementTax::default(),
            final_year: None,
            future_rate: None,
        })
    }

    pub fn from_data(data: AsrData) -> FiscalResult<Self> {
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
        let final_year = data.final_year.unwrap_or_else(|| elements.expense_year().to_vec());
        let future_rate = data.future_rate.unwrap_or_else(|| vec![0.0; n]);

        check_lengths(&[
            ("cost", n),
            ("final_year", final_year.len()),
            ("future_rate", future_rate.len()),
        ])
        .map_err(Self::wrap)?;
        check_final_year(&elements, &final_year).map_err(Self::wrap)?;
        if let Some(bad) = future_rate.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(Self::wrap(EntityError::PortionOutOfRange {
                field: "future_rate",
                value: *bad,
            }));
        }

        Ok(Self {
            elements,
            final_year,
            future_rate,
        })
    }

    pub fn final_year(&self) -> &[i32] {
        &self.final_year
    }

    /// Per-element cost escalated to its final year
    pub fn future_cost(&self) -> Vec<f64> {
        self.elements
            .cost()
            .iter()
            .zip(self.elements.expense_year())
            .zip(&self.final_year)
            .zip(&self.future_rate)
            .map(|(((c, &y), &fy), r)| c * (1.0 + r).powi(fy - y))
            .collect()
    }
}

impl CostEntity for Asr {
    const CATEGORY: &'static str = "ASR";

    fn elements(&self) -> &CostElements {
        &self.elements
    }

    fn wrap(err: EntityError) -> FiscalError {
        FiscalError::Asr(err)
    }

    fn combine(&self, other: &Self) -> FiscalResult<Self> {
        Ok(Self {
            elements: self.elements.merged(&other.elements),
            final_year: self.final_year.iter().chain(&other.final_year).copied().collect(),
            future_rate: self.future_rate.iter().chain(&other.future_rate).copied().collect(),
        })
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            elements: self.elements.selected(indices),
            final_year: indices.iter().map(|&i| self.final_year[i]).collect(),
            future_rate: indices.iter().map(|&i| self.future_rate[i]).collect(),
        }
    }

    fn map_cost(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            elements: self.elements.with_cost(self.elements.cost().iter().map(|&c| f(c)).collect()),
            ..self.clone()
        }
    }

    fn widen(&self, start_year: i32, end_year: i32) -> Self {
        Self {
            elements: self.elements.with_years(start_year, end_year),
            ..self.clone()
        }
    }

    /// Escalate by the future rate, then spread to the final year
    fn project_elements(&self, amounts: &[f64]) -> Vec<f64> {
        let growth: Vec<f64> = self
            .future_cost()
            .iter()
            .zip(self.elements.cost())
            .map(|(fc, c)| if *c == 0.0 { 1.0 } else { fc / c })
            .collect();
        let escalated: Vec<f64> = amounts.iter().zip(&growth).map(|(a, g)| a * g).collect();
        distribute_to_final_year(
            self.elements.start_year(),
            self.elements.project_duration(),
            self.elements.expense_year(),
            &self.final_year,
            &escalated,
        )
    }
}

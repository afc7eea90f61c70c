//! Intangible cost and cost of sales
//!
//! Both are plain element tables with no extra per-element parameters.

use serde::{Deserialize, Serialize};

use super::{CostElements, CostEntity, ElementTax};
use crate::econ::selection::FluidType;
use crate::error::{EntityError, FiscalError, FiscalResult};

macro_rules! plain_cost {
    ($(#[$meta:meta])* $name:ident, $data:ident, $category:literal, $variant:ident) => {
        /// Serializable input
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $data {
            pub start_year: i32,
            pub end_year: i32,
            pub expense_year: Vec<i32>,
            pub cost: Vec<f64>,
            pub cost_allocation: Vec<FluidType>,
            #[serde(default)]
            pub description: Option<Vec<String>>,
            #[serde(default)]
            pub tax: ElementTax,
        }

        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct $name {
            elements: CostElements,
        }

        impl $name {
            pub fn new(
                start_year: i32,
                end_year: i32,
                expense_year: Vec<i32>,
                cost: Vec<f64>,
                cost_allocation: Vec<FluidType>,
            ) -> FiscalResult<Self> {
                Self::from_data($data {
                    start_year,
                    end_year,
                    expense_year,
                    cost,
                    cost_allocation,
                    description: None,
                    tax: ElementTax::default(),
                })
            }

            pub fn from_data(data: $data) -> FiscalResult<Self> {
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
                Ok(Self { elements })
            }
        }

        impl CostEntity for $name {
            const CATEGORY: &'static str = $category;

            fn elements(&self) -> &CostElements {
                &self.elements
            }

            fn wrap(err: EntityError) -> FiscalError {
                FiscalError::$variant(err)
            }

            fn combine(&self, other: &Self) -> FiscalResult<Self> {
                Ok(Self {
                    elements: self.elements.merged(&other.elements),
                })
            }

            fn select(&self, indices: &[usize]) -> Self {
                Self {
                    elements: self.elements.selected(indices),
                }
            }

            fn map_cost(&self, f: impl Fn(f64) -> f64) -> Self {
                Self {
                    elements: self.elements.with_cost(self.elements.cost().iter().map(|&c| f(c)).collect()),
                }
            }

            fn widen(&self, start_year: i32, end_year: i32) -> Self {
                Self {
                    elements: self.elements.with_years(start_year, end_year),
                }
            }
        }
    };
}

plain_cost!(
    /// Non-depreciable development cost, expensed in the year incurred
    Intangible,
    IntangibleData,
    "Intangible",
    Intangible
);

plain_cost!(
    /// Cost of product sold, deductible when the contract enables it
    CostOfSales,
    CostOfSalesData,
    "Cost of Sales",
    CostOfSales
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_of_sales_deserializes_with_defaults() {
        let json = r#"{
            "start_year": 2023, "end_year": 2025,
            "expense_year": [2024], "cost": [12.5], "cost_allocation": ["Gas"]
        }"#;
        let data: CostOfSalesData = serde_json::from_str(json).unwrap();
        let cos = CostOfSales::from_data(data).unwrap();
        assert_eq!(cos.expenditures(), vec![0.0, 12.5, 0.0]);
        assert_eq!(cos.elements().description(), &[" ".to_string()]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{
            "start_year": 2023, "end_year": 2025,
            "expense_year": [2024], "cost": [12.5], "cost_allocation": ["Gas"],
            "costt": 1
        }"#;
        assert!(serde_json::from_str::<IntangibleData>(json).is_err());
    }
}

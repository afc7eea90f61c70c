//! Fiscal primitive transforms
//!
//! Pure functions shared by every cost entity: scalar-or-array rate
//! broadcasting, inflation escalation, VAT/PDRI add-on taxes and the
//! discount-only LBT/PDRD factors, dense projection of sparse year-keyed
//! values, and grouping of elements that share a tax treatment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::econ::selection::FluidType;
use crate::error::{FiscalError, FiscalResult};

/// A rate, portion or discount given either once or per element/year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rate {
    Scalar(f64),
    PerYear(Vec<f64>),
}

impl Default for Rate {
    fn default() -> Self {
        Rate::Scalar(0.0)
    }
}

impl From<f64> for Rate {
    fn from(value: f64) -> Self {
        Rate::Scalar(value)
    }
}

impl From<Vec<f64>> for Rate {
    fn from(values: Vec<f64>) -> Self {
        Rate::PerYear(values)
    }
}

impl Rate {
    /// True when every value is exactly zero
    pub fn is_zero(&self) -> bool {
        match self {
            Rate::Scalar(v) => *v == 0.0,
            Rate::PerYear(vs) => vs.iter().all(|v| *v == 0.0),
        }
    }

    /// Multiply every value by `factor`
    pub fn scaled(&self, factor: f64) -> Rate {
        match self {
            Rate::Scalar(v) => Rate::Scalar(v * factor),
            Rate::PerYear(vs) => Rate::PerYear(vs.iter().map(|v| v * factor).collect()),
        }
    }

    /// Resolve a project-year-indexed rate for elements incurred in `years`.
    ///
    /// A scalar applies to every element. An array must cover the whole axis
    /// (`duration` values starting at `start_year`); each element picks the
    /// value of its own year.
    pub fn at_years(
        &self,
        name: &'static str,
        start_year: i32,
        duration: usize,
        years: &[i32],
    ) -> FiscalResult<Vec<f64>> {
        match self {
            Rate::Scalar(v) => Ok(vec![*v; years.len()]),
            Rate::PerYear(vs) => {
                if vs.len() != duration {
                    return Err(FiscalError::Broadcast {
                        name,
                        expected: duration,
                        actual: vs.len(),
                    });
                }
                years
                    .iter()
                    .map(|&y| {
                        let idx = y - start_year;
                        if idx < 0 || idx as usize >= duration {
                            Err(FiscalError::Broadcast {
                                name,
                                expected: duration,
                                actual: (idx.max(0) as usize) + 1,
                            })
                        } else {
                            Ok(vs[idx as usize])
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Broadcast a scalar to `len` values, or check that an array already has `len` values
pub fn check_input(name: &'static str, value: &Rate, len: usize) -> FiscalResult<Vec<f64>> {
    match value {
        Rate::Scalar(v) => Ok(vec![*v; len]),
        Rate::PerYear(vs) if vs.len() == len => Ok(vs.clone()),
        Rate::PerYear(vs) => Err(FiscalError::Broadcast {
            name,
            expected: len,
            actual: vs.len(),
        }),
    }
}

/// Parameters of [`apply_cost_modification`], each broadcast against the cost array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostModification {
    pub inflation_rate: Rate,
    pub vat_portion: Rate,
    pub vat_rate: Rate,
    pub vat_discount: Rate,
    pub pdri_portion: Rate,
    pub pdri_rate: Rate,
    pub pdri_discount: Rate,
    pub lbt_discount: Rate,
    pub pdrd_discount: Rate,
}

/// Escalate each cost by `(1 + inflation_rate)^(expense_year - start_year)`
pub fn apply_inflation(
    start_year: i32,
    cost: &[f64],
    expense_year: &[i32],
    inflation_rate: &Rate,
) -> FiscalResult<Vec<f64>> {
    if expense_year.len() != cost.len() {
        return Err(FiscalError::Broadcast {
            name: "expense_year",
            expected: cost.len(),
            actual: expense_year.len(),
        });
    }
    let rate = check_input("inflation_rate", inflation_rate, cost.len())?;
    Ok(cost
        .iter()
        .zip(expense_year)
        .zip(&rate)
        .map(|((c, &y), r)| c * (1.0 + r).powi(y - start_year))
        .collect())
}

/// Apply inflation and indirect taxes to a cost array.
///
/// The order is fixed: inflate, then the VAT/PDRI add-on, then the LBT
/// discount factor, then the PDRD discount factor. Changing it changes the
/// taxable base.
pub fn apply_cost_modification(
    start_year: i32,
    cost: &[f64],
    expense_year: &[i32],
    params: &CostModification,
) -> FiscalResult<Vec<f64>> {
    let n = cost.len();
    let inflated = apply_inflation(start_year, cost, expense_year, &params.inflation_rate)?;

    let vat_portion = check_input("vat_portion", &params.vat_portion, n)?;
    let vat_rate = check_input("vat_rate", &params.vat_rate, n)?;
    let vat_discount = check_input("vat_discount", &params.vat_discount, n)?;
    let pdri_portion = check_input("pdri_portion", &params.pdri_portion, n)?;
    let pdri_rate = check_input("pdri_rate", &params.pdri_rate, n)?;
    let pdri_discount = check_input("pdri_discount", &params.pdri_discount, n)?;
    let lbt_discount = check_input("lbt_discount", &params.lbt_discount, n)?;
    let pdrd_discount = check_input("pdrd_discount", &params.pdrd_discount, n)?;

    Ok((0..n)
        .map(|i| {
            let mut c = inflated[i];
            c *= 1.0
                + vat_portion[i] * vat_rate[i] * (1.0 - vat_discount[i])
                + pdri_portion[i] * pdri_rate[i] * (1.0 - pdri_discount[i]);
            c *= 1.0 - lbt_discount[i];
            c *= 1.0 - pdrd_discount[i];
            c
        })
        .collect())
}

/// Sum sparse year-keyed values onto a dense axis of `duration` years from `start_year`.
///
/// Several values in the same year accumulate. Years outside the axis are
/// dropped; constructors reject them before they get here.
pub fn dense_projection(start_year: i32, duration: usize, years: &[i32], values: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; duration];
    for (&y, &v) in years.iter().zip(values) {
        let idx = y - start_year;
        if idx >= 0 && (idx as usize) < duration {
            out[idx as usize] += v;
        }
    }
    out
}

/// Re-express an array from its own axis onto another axis, zero-padding
/// years the source does not cover and dropping years the target does not.
pub fn reproject(values: &[f64], from_start: i32, to_start: i32, to_duration: usize) -> Vec<f64> {
    let mut out = vec![0.0; to_duration];
    for (i, &v) in values.iter().enumerate() {
        let idx = from_start + i as i32 - to_start;
        if idx >= 0 && (idx as usize) < to_duration {
            out[idx as usize] = v;
        }
    }
    out
}

/// Element-wise sum of equal-length arrays
pub fn add_arrays(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Element-wise difference of equal-length arrays
pub fn sub_arrays(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Running sum
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Group id per element: elements with the same VAT portion, PDRI portion and
/// fluid allocation share an id. Ids are assigned in first-seen order.
pub fn get_identifier(vat_portion: &[f64], pdri_portion: &[f64], allocation: &[FluidType]) -> Vec<usize> {
    let mut seen: HashMap<(u64, u64, FluidType), usize> = HashMap::new();
    vat_portion
        .iter()
        .zip(pdri_portion)
        .zip(allocation)
        .map(|((v, p), f)| {
            let next = seen.len();
            *seen.entry((v.to_bits(), p.to_bits(), *f)).or_insert(next)
        })
        .collect()
}

/// Element indices per group, in group-id order
pub fn get_instances(identifier: &[usize]) -> Vec<Vec<usize>> {
    let groups = identifier.iter().copied().max().map_or(0, |m| m + 1);
    let mut out = vec![Vec::new(); groups];
    for (i, &id) in identifier.iter().enumerate() {
        out[id].push(i);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_rates_leave_cost_unchanged() {
        let cost = vec![100.0, 250.0, 75.5];
        let years = vec![2023, 2025, 2027];
        let out = apply_cost_modification(2023, &cost, &years, &CostModification::default()).unwrap();
        assert_eq!(out, cost);
    }

    #[test]
    fn test_modification_order() {
        let params = CostModification {
            inflation_rate: 0.1.into(),
            vat_portion: 1.0.into(),
            vat_rate: 0.11.into(),
            vat_discount: 0.5.into(),
            pdri_portion: 0.5.into(),
            pdri_rate: 0.2.into(),
            lbt_discount: 0.1.into(),
            pdrd_discount: 0.2.into(),
            ..Default::default()
        };
        let out = apply_cost_modification(2020, &[100.0], &[2022], &params).unwrap();
        let expected = 100.0 * 1.1_f64.powi(2) * (1.0 + 0.11 * 0.5 + 0.5 * 0.2) * 0.9 * 0.8;
        assert_relative_eq!(out[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_check_input_rejects_wrong_length() {
        let err = check_input("vat_rate", &Rate::PerYear(vec![0.1, 0.1]), 3).unwrap_err();
        assert!(matches!(err, FiscalError::Broadcast { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_inflation_per_element_array() {
        let out = apply_inflation(2020, &[10.0, 10.0], &[2021, 2022], &Rate::PerYear(vec![0.1, 0.2])).unwrap();
        assert_relative_eq!(out[0], 11.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 14.4, epsilon = 1e-12);
    }

    #[test]
    fn test_dense_projection_accumulates_same_year() {
        let out = dense_projection(2023, 4, &[2024, 2024, 2026], &[1.0, 2.0, 5.0]);
        assert_eq!(out, vec![0.0, 3.0, 0.0, 5.0]);
    }

    #[test]
    fn test_reproject_pads_front_and_back() {
        let out = reproject(&[1.0, 2.0], 2024, 2022, 5);
        assert_eq!(out, vec![0.0, 0.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_rate_at_years() {
        let rate = Rate::PerYear(vec![0.1, 0.2, 0.3]);
        assert_eq!(rate.at_years("r", 2020, 3, &[2022, 2020]).unwrap(), vec![0.3, 0.1]);
        assert!(rate.at_years("r", 2020, 4, &[2020]).is_err());
        assert_eq!(Rate::Scalar(0.5).at_years("r", 2020, 3, &[2021, 2021]).unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_identifier_groups_by_tax_signature_and_fluid() {
        let vat = [0.0, 1.0, 0.0, 1.0];
        let pdri = [0.0, 0.0, 0.0, 0.0];
        let fluid = [FluidType::Oil, FluidType::Oil, FluidType::Gas, FluidType::Oil];
        let ids = get_identifier(&vat, &pdri, &fluid);
        assert_eq!(ids, vec![0, 1, 2, 1]);
        assert_eq!(get_instances(&ids), vec![vec![0], vec![1, 3], vec![2]]);
    }
}

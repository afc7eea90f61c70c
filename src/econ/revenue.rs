//! Lifting schedules
//!
//! A [`Lifting`] is one production and price schedule for one fluid. Its
//! sparse `prod_year` entries are projected onto the dense year axis of the
//! entity; the contract re-expresses that axis onto the project's.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::econ::costs::check_lengths;
use crate::econ::helper::dense_projection;
use crate::econ::selection::FluidType;
use crate::error::{EntityError, FiscalError, FiscalResult};

/// Serializable input for [`Lifting`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiftingData {
    pub start_year: i32,
    pub end_year: i32,
    pub prod_year: Vec<i32>,
    pub lifting_rate: Vec<f64>,
    pub price: Vec<f64>,
    pub fluid_type: FluidType,
    /// Gross heating value; defaults to 1
    #[serde(default)]
    pub ghv: Option<Vec<f64>>,
    /// Physical production; defaults to the lifting rate
    #[serde(default)]
    pub prod_rate: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lifting {
    start_year: i32,
    end_year: i32,
    prod_year: Vec<i32>,
    lifting_rate: Vec<f64>,
    price: Vec<f64>,
    fluid_type: FluidType,
    ghv: Vec<f64>,
    prod_rate: Vec<f64>,
}

fn wrap(err: EntityError) -> FiscalError {
    FiscalError::Lifting(err)
}

impl Lifting {
    pub fn new(
        start_year: i32,
        end_year: i32,
        prod_year: Vec<i32>,
        lifting_rate: Vec<f64>,
        price: Vec<f64>,
        fluid_type: FluidType,
    ) -> FiscalResult<Self> {
        Self::from_data(LiftingData {
            start_year,
            end_year,
            prod_year,
            lifting_rate,
            price,
            fluid_type,
            ghv: None,
            prod_rate: None,
        })
    }

    pub fn from_data(data: LiftingData) -> FiscalResult<Self> {
        if data.end_year <= data.start_year {
            return Err(wrap(EntityError::InvertedYears {
                start_year: data.start_year,
                end_year: data.end_year,
            }));
        }

        let n = data.lifting_rate.len();
        let ghv = data.ghv.unwrap_or_else(|| vec![1.0; n]);
        let prod_rate = data.prod_rate.unwrap_or_else(|| data.lifting_rate.clone());
        check_lengths(&[
            ("lifting_rate", n),
            ("price", data.price.len()),
            ("prod_year", data.prod_year.len()),
            ("ghv", ghv.len()),
            ("prod_rate", prod_rate.len()),
        ])
        .map_err(wrap)?;

        let duration = (data.end_year - data.start_year + 1) as usize;
        if prod_rate.len() > duration {
            return Err(wrap(EntityError::LengthMismatch {
                lengths: vec![("project_duration", duration), ("prod_rate", prod_rate.len())],
            }));
        }
        if let Some(&year) = data
            .prod_year
            .iter()
            .find(|&&y| y < data.start_year || y > data.end_year)
        {
            return Err(wrap(EntityError::YearOutOfRange {
                field: "prod_year",
                year,
                start_year: data.start_year,
                end_year: data.end_year,
            }));
        }

        Ok(Self {
            start_year: data.start_year,
            end_year: data.end_year,
            prod_year: data.prod_year,
            lifting_rate: data.lifting_rate,
            price: data.price,
            fluid_type: data.fluid_type,
            ghv,
            prod_rate,
        })
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    pub fn fluid_type(&self) -> FluidType {
        self.fluid_type
    }

    pub fn project_duration(&self) -> usize {
        (self.end_year - self.start_year + 1) as usize
    }

    fn dense(&self, values: &[f64]) -> Vec<f64> {
        dense_projection(self.start_year, self.project_duration(), &self.prod_year, values)
    }

    /// `lifting_rate * price * ghv` on the dense year axis
    pub fn revenue(&self) -> Vec<f64> {
        let values: Vec<f64> = (0..self.lifting_rate.len())
            .map(|i| self.lifting_rate[i] * self.price[i] * self.ghv[i])
            .collect();
        self.dense(&values)
    }

    pub fn lifting_rate_arr(&self) -> Vec<f64> {
        self.dense(&self.lifting_rate)
    }

    pub fn prod_rate_arr(&self) -> Vec<f64> {
        self.dense(&self.prod_rate)
    }

    /// `lifting_rate * ghv`, the energy-equivalent volume
    pub fn lifting_ghv_arr(&self) -> Vec<f64> {
        let values: Vec<f64> = self.lifting_rate.iter().zip(&self.ghv).map(|(l, g)| l * g).collect();
        self.dense(&values)
    }

    /// Lifting-weighted price per year; a year with no lifting keeps the last price given for it
    pub fn price_arr(&self) -> Vec<f64> {
        let weighted: Vec<f64> = self.lifting_rate.iter().zip(&self.price).map(|(l, p)| l * p).collect();
        let numer = self.dense(&weighted);
        let denom = self.lifting_rate_arr();
        let mut out = self.last_per_year(&self.price);
        for i in 0..out.len() {
            if denom[i] != 0.0 {
                out[i] = numer[i] / denom[i];
            }
        }
        out
    }

    /// GHV per year, last entry wins
    pub fn ghv_arr(&self) -> Vec<f64> {
        self.last_per_year(&self.ghv)
    }

    fn last_per_year(&self, values: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.project_duration()];
        for (&y, &v) in self.prod_year.iter().zip(values) {
            out[(y - self.start_year) as usize] = v;
        }
        out
    }

    /// Merge two schedules of the same fluid onto the union of their year ranges
    pub fn combine(&self, other: &Lifting) -> FiscalResult<Lifting> {
        if self.fluid_type != other.fluid_type {
            return Err(wrap(EntityError::IncompatibleMerge {
                left: self.fluid_type.as_str(),
                right: other.fluid_type.as_str(),
            }));
        }
        fn cat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            a.iter().chain(b).cloned().collect()
        }
        Ok(Lifting {
            start_year: self.start_year.min(other.start_year),
            end_year: self.end_year.max(other.end_year),
            prod_year: cat(&self.prod_year, &other.prod_year),
            lifting_rate: cat(&self.lifting_rate, &other.lifting_rate),
            price: cat(&self.price, &other.price),
            fluid_type: self.fluid_type,
            ghv: cat(&self.ghv, &other.ghv),
            prod_rate: cat(&self.prod_rate, &other.prod_rate),
        })
    }

    /// Merge with the other schedule's volumes negated
    pub fn subtract(&self, other: &Lifting) -> FiscalResult<Lifting> {
        let negated = Lifting {
            lifting_rate: other.lifting_rate.iter().map(|v| -v).collect(),
            prod_rate: other.prod_rate.iter().map(|v| -v).collect(),
            ..other.clone()
        };
        self.combine(&negated)
    }

    /// Multiply volumes by `factor`
    pub fn scale_volume(&self, factor: f64) -> Lifting {
        Lifting {
            lifting_rate: self.lifting_rate.iter().map(|v| v * factor).collect(),
            prod_rate: self.prod_rate.iter().map(|v| v * factor).collect(),
            ..self.clone()
        }
    }

    /// Multiply prices by `factor`
    pub fn scale_price(&self, factor: f64) -> Lifting {
        Lifting {
            price: self.price.iter().map(|v| v * factor).collect(),
            ..self.clone()
        }
    }

    /// Order two schedules by total revenue
    pub fn compare_revenue(&self, other: &Lifting) -> Option<Ordering> {
        let a: f64 = self.revenue().iter().sum();
        let b: f64 = other.revenue().iter().sum();
        a.partial_cmp(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_revenue_dense_projection() {
        let lifting = Lifting::new(2023, 2026, vec![2024], vec![10.0], vec![5.0], FluidType::Oil).unwrap();
        assert_eq!(lifting.revenue(), vec![0.0, 50.0, 0.0, 0.0]);
    }

    #[test]
    fn test_revenue_applies_ghv() {
        let lifting = Lifting::from_data(LiftingData {
            start_year: 2020,
            end_year: 2022,
            prod_year: vec![2020, 2022],
            lifting_rate: vec![2.0, 4.0],
            price: vec![6.0, 6.0],
            fluid_type: FluidType::Gas,
            ghv: Some(vec![1.1, 1.0]),
            prod_rate: None,
        })
        .unwrap();
        let rev = lifting.revenue();
        assert_relative_eq!(rev[0], 13.2, epsilon = 1e-12);
        assert_relative_eq!(rev[1], 0.0);
        assert_relative_eq!(rev[2], 24.0);
        assert_eq!(lifting.prod_rate_arr(), vec![2.0, 0.0, 4.0]);
    }

    #[test]
    fn test_end_year_must_follow_start_year() {
        let err = Lifting::new(2025, 2025, vec![], vec![], vec![], FluidType::Oil).unwrap_err();
        assert!(matches!(err, FiscalError::Lifting(EntityError::InvertedYears { .. })));
    }

    #[test]
    fn test_price_length_checked() {
        let err = Lifting::new(2020, 2025, vec![2020], vec![1.0], vec![1.0, 2.0], FluidType::Oil).unwrap_err();
        assert!(matches!(err, FiscalError::Lifting(EntityError::LengthMismatch { .. })));
    }

    #[test]
    fn test_combine_and_subtract() {
        let a = Lifting::new(2020, 2022, vec![2020, 2021], vec![10.0, 10.0], vec![50.0, 60.0], FluidType::Oil).unwrap();
        let b = Lifting::new(2021, 2024, vec![2021, 2024], vec![10.0, 5.0], vec![70.0, 60.0], FluidType::Oil).unwrap();
        let sum = a.combine(&b).unwrap();
        assert_eq!(sum.revenue(), vec![500.0, 1300.0, 0.0, 0.0, 300.0]);
        assert_relative_eq!(sum.price_arr()[1], 65.0);
        assert_eq!(sum.compare_revenue(&a), Some(Ordering::Greater));

        let back = sum.subtract(&b).unwrap();
        assert_eq!(back.revenue(), vec![500.0, 600.0, 0.0, 0.0, 0.0]);

        let gas = Lifting::new(2020, 2022, vec![2020], vec![1.0], vec![1.0], FluidType::Gas).unwrap();
        assert!(matches!(
            a.combine(&gas).unwrap_err(),
            FiscalError::Lifting(EntityError::IncompatibleMerge { .. })
        ));
    }
}

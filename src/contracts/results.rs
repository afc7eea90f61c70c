//! Contract output structures

use serde::{Deserialize, Serialize};

use crate::econ::indicator::{irr, npv, pot};
use crate::econ::limit::econ_limit;
use crate::econ::selection::LimitMethod;
use crate::error::{FiscalError, FiscalResult};

/// Yearly arrays every engine reports, for one fluid or consolidated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamResult {
    pub revenue: Vec<f64>,
    pub capital: Vec<f64>,
    /// Intangible, OPEX, ASR, LBT and any cost of sales
    pub non_capital: Vec<f64>,
    pub depreciation: Vec<f64>,
    /// Cost recovered (Cost Recovery) or cost deducted (Gross Split), after transfer
    pub recovery: Vec<f64>,
    /// Equity to be split (Cost Recovery) or net operating profit (Gross Split), after transfer
    pub equity_to_be_split: Vec<f64>,
    pub contractor_share: Vec<f64>,
    pub government_share: Vec<f64>,
    pub ddmo: Vec<f64>,
    pub taxable_income: Vec<f64>,
    pub tax: Vec<f64>,
    pub contractor_net_share: Vec<f64>,
    pub contractor_take: Vec<f64>,
    pub government_take: Vec<f64>,
    pub cashflow: Vec<f64>,
}

impl StreamResult {
    /// Every column zero over `n` years
    pub fn zeros(n: usize) -> Self {
        let z = vec![0.0; n];
        Self {
            revenue: z.clone(),
            capital: z.clone(),
            non_capital: z.clone(),
            depreciation: z.clone(),
            recovery: z.clone(),
            equity_to_be_split: z.clone(),
            contractor_share: z.clone(),
            government_share: z.clone(),
            ddmo: z.clone(),
            taxable_income: z.clone(),
            tax: z.clone(),
            contractor_net_share: z.clone(),
            contractor_take: z.clone(),
            government_take: z.clone(),
            cashflow: z,
        }
    }

    pub fn len(&self) -> usize {
        self.revenue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revenue.is_empty()
    }

    fn columns_mut(&mut self) -> [&mut Vec<f64>; 15] {
        [
            &mut self.revenue,
            &mut self.capital,
            &mut self.non_capital,
            &mut self.depreciation,
            &mut self.recovery,
            &mut self.equity_to_be_split,
            &mut self.contractor_share,
            &mut self.government_share,
            &mut self.ddmo,
            &mut self.taxable_income,
            &mut self.tax,
            &mut self.contractor_net_share,
            &mut self.contractor_take,
            &mut self.government_take,
            &mut self.cashflow,
        ]
    }

    fn columns(&self) -> [&Vec<f64>; 15] {
        [
            &self.revenue,
            &self.capital,
            &self.non_capital,
            &self.depreciation,
            &self.recovery,
            &self.equity_to_be_split,
            &self.contractor_share,
            &self.government_share,
            &self.ddmo,
            &self.taxable_income,
            &self.tax,
            &self.contractor_net_share,
            &self.contractor_take,
            &self.government_take,
            &self.cashflow,
        ]
    }

    /// This timeline placed at index `offset` of an `n`-year axis, zero elsewhere
    pub fn placed(&self, offset: usize, n: usize) -> StreamResult {
        let mut out = StreamResult::zeros(n);
        for (col, src) in out.columns_mut().into_iter().zip(self.columns()) {
            for (slot, v) in col.iter_mut().skip(offset).zip(src) {
                *slot = *v;
            }
        }
        out
    }

    /// Element-wise sum of two streams of the same length
    pub fn sum(&self, other: &StreamResult) -> StreamResult {
        let mut out = self.clone();
        for (col, add) in out.columns_mut().into_iter().zip(other.columns()) {
            for (a, b) in col.iter_mut().zip(add.iter()) {
                *a += b;
            }
        }
        out
    }
}

/// A single row of contract output for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    pub year: i32,
    pub revenue: f64,
    pub capital: f64,
    pub non_capital: f64,
    pub depreciation: f64,
    pub recovery: f64,
    pub equity_to_be_split: f64,
    pub contractor_share: f64,
    pub government_share: f64,
    pub ddmo: f64,
    pub taxable_income: f64,
    pub tax: f64,
    pub contractor_net_share: f64,
    pub contractor_take: f64,
    pub government_take: f64,
    pub cashflow: f64,
}

/// Per-year rows of one stream
pub fn to_rows(project_years: &[i32], stream: &StreamResult) -> Vec<YearRow> {
    project_years
        .iter()
        .enumerate()
        .map(|(i, &year)| YearRow {
            year,
            revenue: stream.revenue[i],
            capital: stream.capital[i],
            non_capital: stream.non_capital[i],
            depreciation: stream.depreciation[i],
            recovery: stream.recovery[i],
            equity_to_be_split: stream.equity_to_be_split[i],
            contractor_share: stream.contractor_share[i],
            government_share: stream.government_share[i],
            ddmo: stream.ddmo[i],
            taxable_income: stream.taxable_income[i],
            tax: stream.tax[i],
            contractor_net_share: stream.contractor_net_share[i],
            contractor_take: stream.contractor_take[i],
            government_take: stream.government_take[i],
            cashflow: stream.cashflow[i],
        })
        .collect()
}

/// Scalar indicators of a contract run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub start_year: i32,
    pub end_year: i32,
    pub total_revenue: f64,
    pub total_capital: f64,
    pub total_non_capital: f64,
    pub contractor_take: f64,
    pub government_take: f64,
    /// Contractor cash flow NPV, first year undiscounted
    pub contractor_npv: f64,
    pub contractor_irr: Option<f64>,
    /// Years until cumulative contractor cash flow turns positive
    pub contractor_pot: Option<f64>,
    /// Last year worth producing under the chosen limit method
    pub econ_limit_year: i32,
}

impl ContractSummary {
    /// Reduce the consolidated stream to scalar indicators
    pub fn new(
        project_years: &[i32],
        consolidated: &StreamResult,
        discount_rate: f64,
        limit_method: LimitMethod,
    ) -> FiscalResult<Self> {
        let (Some(&start_year), Some(&end_year)) = (project_years.first(), project_years.last()) else {
            return Err(FiscalError::Contract("cannot summarize an empty result".to_string()));
        };
        let limit = econ_limit(&consolidated.cashflow, limit_method)?;
        let total = |v: &[f64]| v.iter().sum::<f64>();

        Ok(Self {
            start_year,
            end_year,
            total_revenue: total(&consolidated.revenue),
            total_capital: total(&consolidated.capital),
            total_non_capital: total(&consolidated.non_capital),
            contractor_take: total(&consolidated.contractor_take),
            government_take: total(&consolidated.government_take),
            contractor_npv: npv(&consolidated.cashflow, discount_rate),
            contractor_irr: irr(&consolidated.cashflow),
            contractor_pot: pot(&consolidated.cashflow),
            econ_limit_year: project_years[limit],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stream(cashflow: Vec<f64>) -> StreamResult {
        let n = cashflow.len();
        StreamResult {
            revenue: vec![10.0; n],
            government_take: vec![4.0; n],
            contractor_take: vec![6.0; n],
            cashflow,
            ..StreamResult::zeros(n)
        }
    }

    #[test]
    fn test_placed_streams_add_in_shared_year() {
        let a = stream(vec![1.0, 2.0]);
        let b = stream(vec![3.0, 4.0, 5.0]);
        let joined = a.placed(0, 4).sum(&b.placed(1, 4));
        assert_eq!(joined.cashflow, vec![1.0, 5.0, 4.0, 5.0]);
        assert_eq!(joined.revenue, vec![10.0, 20.0, 10.0, 10.0]);
        assert_eq!(joined.tax.len(), 4);
    }

    #[test]
    fn test_rows_follow_years() {
        let s = stream(vec![-5.0, 7.0]);
        let rows = to_rows(&[2030, 2031], &s);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].year, 2031);
        assert_relative_eq!(rows[1].cashflow, 7.0);
    }

    #[test]
    fn test_summary() {
        let s = stream(vec![-100.0, 60.0, 60.0, -5.0]);
        let summary = ContractSummary::new(&[2020, 2021, 2022, 2023], &s, 0.0, LimitMethod::MaxCumCashflow).unwrap();
        assert_relative_eq!(summary.contractor_npv, 15.0);
        assert_relative_eq!(summary.government_take, 16.0);
        assert_eq!(summary.econ_limit_year, 2022);
        assert_relative_eq!(summary.contractor_pot.unwrap(), 1.0 + 40.0 / 60.0, epsilon = 1e-12);
        assert!(summary.contractor_irr.is_some());
    }

    #[test]
    fn test_sum_streams() {
        let total = stream(vec![1.0, 2.0]).sum(&stream(vec![3.0, 4.0]));
        assert_eq!(total.cashflow, vec![4.0, 6.0]);
        assert_eq!(total.revenue, vec![20.0, 20.0]);
    }
}

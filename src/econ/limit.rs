//! Economic limit: where to truncate a project's cash flow

use crate::econ::helper::cumsum;
use crate::econ::indicator::npv;
use crate::econ::selection::LimitMethod;
use crate::error::{FiscalError, FiscalResult};

/// Discount rate used by [`LimitMethod::MaxNpv`]
const LIMIT_DISC_RATE: f64 = 0.1;

/// Index of the last year to keep under `method`
pub fn econ_limit(cashflow: &[f64], method: LimitMethod) -> FiscalResult<usize> {
    if cashflow.is_empty() {
        return Err(FiscalError::EconLimit("the cashflow is empty".to_string()));
    }
    Ok(match method {
        LimitMethod::MaxCumCashflow => argmax(&cumsum(cashflow)),
        LimitMethod::MaxNpv => max_npv(cashflow),
        LimitMethod::NegativeCashflow => negative_cashflow(cashflow),
    })
}

/// First index of the maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn max_npv(cashflow: &[f64]) -> usize {
    let prefix: Vec<f64> = (1..=cashflow.len())
        .map(|end| npv(&cashflow[..end], LIMIT_DISC_RATE))
        .collect();
    argmax(&prefix)
}

fn negative_cashflow(cashflow: &[f64]) -> usize {
    if cashflow[0] < 0.0 {
        return 0;
    }
    match cashflow.iter().position(|&cf| cf < 0.0) {
        None => cashflow.len() - 1,
        Some(first_negative) => first_negative - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cashflow_fails() {
        for method in LimitMethod::ALL {
            assert!(matches!(econ_limit(&[], *method), Err(FiscalError::EconLimit(_))));
        }
    }

    #[test]
    fn test_negative_cashflow_edges() {
        assert_eq!(econ_limit(&[-5.0, -3.0], LimitMethod::NegativeCashflow).unwrap(), 0);
        assert_eq!(econ_limit(&[5.0, -3.0, 5.0], LimitMethod::NegativeCashflow).unwrap(), 0);
        assert_eq!(econ_limit(&[5.0, 3.0, 1.0], LimitMethod::NegativeCashflow).unwrap(), 2);
        assert_eq!(econ_limit(&[5.0, 3.0, -1.0, 2.0], LimitMethod::NegativeCashflow).unwrap(), 1);
    }

    #[test]
    fn test_max_cum_cashflow() {
        assert_eq!(econ_limit(&[100.0], LimitMethod::MaxCumCashflow).unwrap(), 0);
        assert_eq!(
            econ_limit(&[-50.0, 30.0, 40.0, -10.0, 5.0], LimitMethod::MaxCumCashflow).unwrap(),
            2
        );
    }

    #[test]
    fn test_max_npv() {
        assert_eq!(econ_limit(&[-100.0, 80.0, 80.0, -30.0], LimitMethod::MaxNpv).unwrap(), 2);
    }
}

//! Depreciation schedules for a single asset
//!
//! Each function returns the charge per year from the placed-in-service year,
//! over `ceil(useful_life)` years. The last year always takes whatever is left
//! of `cost - salvage_value`, so a schedule sums exactly to the depreciable base.

use crate::econ::selection::DeprMethod;
use crate::error::EntityError;

fn life_years(useful_life: f64) -> usize {
    (useful_life.ceil() as usize).max(1)
}

/// Equal charges of `(cost - salvage) / useful_life`
pub fn straight_line(cost: f64, salvage_value: f64, useful_life: f64) -> Vec<f64> {
    let n = life_years(useful_life);
    let base = cost - salvage_value;
    let charge = base / useful_life;
    let mut out = vec![charge; n];
    out[n - 1] = base - charge * (n - 1) as f64;
    out
}

/// Fixed-rate declining balance at `decline_factor / useful_life`, floored at salvage
pub fn declining_balance(cost: f64, salvage_value: f64, useful_life: f64, decline_factor: f64) -> Vec<f64> {
    let n = life_years(useful_life);
    let rate = (decline_factor / useful_life).min(1.0);
    let base = cost - salvage_value;
    let mut taken = 0.0;
    let mut out = Vec::with_capacity(n);

    for year in 0..n {
        let left = base - taken;
        let charge = if year == n - 1 {
            left
        } else {
            (rate * (cost - taken)).min(left)
        };
        taken += charge;
        out.push(charge);
    }
    out
}

/// Declining balance at `depreciation_factor`, switching to straight line on the
/// remaining base once that charge is larger.
pub fn psc_declining_balance(
    cost: f64,
    salvage_value: f64,
    useful_life: f64,
    depreciation_factor: f64,
) -> Result<Vec<f64>, EntityError> {
    if !(0.0..=1.0).contains(&depreciation_factor) {
        return Err(EntityError::PortionOutOfRange {
            field: "depreciation_factor",
            value: depreciation_factor,
        });
    }

    let n = life_years(useful_life);
    let base = cost - salvage_value;
    let mut taken = 0.0;
    let mut out = Vec::with_capacity(n);

    for year in 0..n {
        let left = base - taken;
        let declining = (depreciation_factor * (cost - taken)).min(left);
        let straight = left / (n - year) as f64;
        let charge = declining.max(straight);
        taken += charge;
        out.push(charge);
    }
    Ok(out)
}

/// Schedule for one asset by method.
///
/// `decline_factor` drives [`DeprMethod::DecliningBalance`];
/// `depreciation_factor` drives [`DeprMethod::PscDecliningBalance`].
pub fn schedule(
    method: DeprMethod,
    cost: f64,
    salvage_value: f64,
    useful_life: f64,
    depreciation_factor: f64,
    decline_factor: f64,
) -> Result<Vec<f64>, EntityError> {
    if useful_life <= 0.0 {
        return Err(EntityError::NonPositive {
            field: "useful_life",
            value: useful_life,
        });
    }
    Ok(match method {
        DeprMethod::StraightLine => straight_line(cost, salvage_value, useful_life),
        DeprMethod::DecliningBalance => declining_balance(cost, salvage_value, useful_life, decline_factor),
        DeprMethod::DoubleDecliningBalance => declining_balance(cost, salvage_value, useful_life, 2.0),
        DeprMethod::PscDecliningBalance => {
            psc_declining_balance(cost, salvage_value, useful_life, depreciation_factor)?
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_line_with_salvage() {
        let out = straight_line(110.0, 10.0, 4.0);
        assert_eq!(out.len(), 4);
        for c in &out {
            assert_relative_eq!(*c, 25.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fractional_life_puts_remainder_in_last_year() {
        let out = straight_line(100.0, 0.0, 2.5);
        assert_eq!(out.len(), 3);
        assert_relative_eq!(out[0], 40.0);
        assert_relative_eq!(out[2], 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_declining_balance_never_below_salvage() {
        let out = declining_balance(1000.0, 100.0, 5.0, 2.0);
        assert_relative_eq!(out[0], 400.0, epsilon = 1e-9);
        assert_relative_eq!(out[1], 240.0, epsilon = 1e-9);
        assert_relative_eq!(out.iter().sum::<f64>(), 900.0, epsilon = 1e-9);
        assert!(out.iter().all(|c| *c >= 0.0));
    }

    #[test]
    fn test_psc_db_switches_to_straight_line() {
        let out = psc_declining_balance(100.0, 0.0, 5.0, 0.25).unwrap();
        // 25, 18.75, then SL on 56.25 over 3 years
        assert_relative_eq!(out[0], 25.0, epsilon = 1e-9);
        assert_relative_eq!(out[1], 18.75, epsilon = 1e-9);
        assert_relative_eq!(out[2], 18.75, epsilon = 1e-9);
        assert_relative_eq!(out[4], 18.75, epsilon = 1e-9);
        assert_relative_eq!(out.iter().sum::<f64>(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_psc_db_half_rate_sums_to_base() {
        let out = psc_declining_balance(100.0, 0.0, 5.0, 0.5).unwrap();
        assert_relative_eq!(out[0], 50.0, epsilon = 1e-9);
        assert_relative_eq!(out[1], 25.0, epsilon = 1e-9);
        assert_relative_eq!(out.iter().sum::<f64>(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_schedule_dispatch_and_validation() {
        let ddb = schedule(DeprMethod::DoubleDecliningBalance, 100.0, 0.0, 4.0, 0.5, 1.0).unwrap();
        assert_relative_eq!(ddb[0], 50.0, epsilon = 1e-9);
        assert!(schedule(DeprMethod::PscDecliningBalance, 100.0, 0.0, 4.0, 1.5, 1.0).is_err());
        assert!(matches!(
            schedule(DeprMethod::StraightLine, 100.0, 0.0, 0.0, 0.5, 1.0),
            Err(EntityError::NonPositive { .. })
        ));
    }
}

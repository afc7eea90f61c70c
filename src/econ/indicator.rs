//! Profitability indicators on yearly cash flows
//!
//! Index 0 is the first project year and is not discounted.

/// Net present value, discounting year `t` by `(1 + disc_rate)^t`
pub fn npv(cashflow: &[f64], disc_rate: f64) -> f64 {
    cashflow
        .iter()
        .enumerate()
        .map(|(t, &cf)| cf / (1.0 + disc_rate).powi(t as i32))
        .sum()
}

/// Internal rate of return using Newton-Raphson, falling back to bisection.
///
/// Returns `None` when the cash flow has no sign change or no root is
/// bracketed in (-99%, 1000%).
pub fn irr(cashflow: &[f64]) -> Option<f64> {
    if cashflow.is_empty() {
        return None;
    }

    if cashflow.iter().all(|&cf| cf.abs() < 1e-10) {
        return Some(0.0);
    }

    // At least one sign change is required for a root
    let has_positive = cashflow.iter().any(|&cf| cf > 1e-10);
    let has_negative = cashflow.iter().any(|&cf| cf < -1e-10);
    if !has_positive || !has_negative {
        return None;
    }

    let mut rate = 0.1;
    let tolerance = 1e-10;
    let max_iterations = 1000;

    for _ in 0..max_iterations {
        let (value, slope) = npv_and_derivative(cashflow, rate);

        if slope.abs() < 1e-20 {
            return irr_bisection(cashflow);
        }

        let next = (rate - value / slope).clamp(-0.99, 10.0);

        if (next - rate).abs() < tolerance {
            return Some(next);
        }

        rate = next;
    }

    irr_bisection(cashflow)
}

fn npv_and_derivative(cashflow: &[f64], rate: f64) -> (f64, f64) {
    let mut value = 0.0;
    let mut slope = 0.0;

    for (t, &cf) in cashflow.iter().enumerate() {
        value += cf / (1.0 + rate).powi(t as i32);
        if t > 0 {
            slope -= (t as f64) * cf / (1.0 + rate).powi(t as i32 + 1);
        }
    }

    (value, slope)
}

fn irr_bisection(cashflow: &[f64]) -> Option<f64> {
    let mut low = -0.99_f64;
    let mut high = 10.0_f64;
    let tolerance = 1e-10;

    if npv(cashflow, low) * npv(cashflow, high) > 0.0 {
        return None;
    }

    for _ in 0..1000 {
        let mid = (low + high) / 2.0;
        let at_mid = npv(cashflow, mid);

        if at_mid.abs() < tolerance || (high - low) / 2.0 < tolerance {
            return Some(mid);
        }

        if at_mid * npv(cashflow, low) < 0.0 {
            high = mid;
        } else {
            low = mid;
        }
    }

    None
}

/// Payout time in years, interpolated inside the year cumulative cash flow turns positive.
///
/// `None` if it never does.
pub fn pot(cashflow: &[f64]) -> Option<f64> {
    let mut cum = 0.0;
    for (t, &cf) in cashflow.iter().enumerate() {
        let prev = cum;
        cum += cf;
        if cum > 0.0 {
            if t == 0 {
                return Some(0.0);
            }
            return Some((t - 1) as f64 + (-prev) / (cum - prev));
        }
    }
    None
}

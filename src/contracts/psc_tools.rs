//! Year-by-year building blocks shared by the contract engines
//!
//! Everything here works on dense arrays over the project axis. The
//! recovery loop is the only stateful piece: each year's claim depends on
//! the previous year's unrecovered balance after the oil/gas transfer, so
//! both fluids are walked together.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::econ::helper::{check_input, cumsum, Rate};
use crate::error::{FiscalError, FiscalResult};

/// ETS magnitudes below this are treated as zero
const ETS_EPSILON: f64 = 1e-12;

/// Reject, or warn about, a contract portion outside [0, 1]
pub fn check_portion(strict: bool, field: &str, value: f64) -> FiscalResult<()> {
    if (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    if strict {
        return Err(FiscalError::Contract(format!("{field} must lie in [0, 1], got {value}")));
    }
    log::warn!("{field} = {value} lies outside [0, 1]");
    Ok(())
}

/// Broadcast a run argument over the project years
pub fn broadcast_years(name: &'static str, rate: &Rate, n_years: usize) -> FiscalResult<Vec<f64>> {
    check_input(name, rate, n_years)
}

/// First tranche petroleum split between contractor and government
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FtpSplit {
    pub total: Vec<f64>,
    pub contractor: Vec<f64>,
    pub government: Vec<f64>,
}

/// FTP as a portion of revenue; when shared, the contractor keeps its pretax share of it
pub fn first_tranche(
    revenue: &[f64],
    is_available: bool,
    is_shared: bool,
    portion: f64,
    ctr_pretax_share: &[f64],
) -> FtpSplit {
    let total: Vec<f64> = revenue
        .iter()
        .map(|r| if is_available { portion * r } else { 0.0 })
        .collect();
    let contractor: Vec<f64> = total
        .iter()
        .zip(ctr_pretax_share)
        .map(|(f, s)| if is_shared { f * s } else { 0.0 })
        .collect();
    let government = total.iter().zip(&contractor).map(|(t, c)| t - c).collect();
    FtpSplit {
        total,
        contractor,
        government,
    }
}

/// One fluid's inputs to [`joint_recovery`]
#[derive(Debug, Clone, Copy)]
pub struct RecoveryInput<'a> {
    /// What costs are recovered from: revenue less FTP, or the contractor
    /// share under Gross Split
    pub available: &'a [f64],
    /// This year's deductible cost: depreciation plus non-capital cost
    pub deductible: &'a [f64],
    pub investment_credit: &'a [f64],
    pub cap_rate: &'a [f64],
}

/// One fluid's result of [`joint_recovery`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoveryOutcome {
    pub ic_paid: Vec<f64>,
    pub ic_unpaid: Vec<f64>,
    pub cost_to_be_recovered: Vec<f64>,
    pub cost_recovery: Vec<f64>,
    pub unrecovered_before_transfer: Vec<f64>,
    pub ets_before_transfer: Vec<f64>,
    /// Surplus received from the other fluid
    pub transfer_in: Vec<f64>,
    /// Surplus given to the other fluid
    pub transfer_out: Vec<f64>,
    pub cost_recovery_after_transfer: Vec<f64>,
    pub ets_after_transfer: Vec<f64>,
    pub unrecovered_after_transfer: Vec<f64>,
    /// Unrecovered balance brought into each year
    pub carry_forward: Vec<f64>,
}

impl RecoveryOutcome {
    fn zeroed(n: usize) -> Self {
        let z = vec![0.0; n];
        Self {
            ic_paid: z.clone(),
            ic_unpaid: z.clone(),
            cost_to_be_recovered: z.clone(),
            cost_recovery: z.clone(),
            unrecovered_before_transfer: z.clone(),
            ets_before_transfer: z.clone(),
            transfer_in: z.clone(),
            transfer_out: z.clone(),
            cost_recovery_after_transfer: z.clone(),
            ets_after_transfer: z.clone(),
            unrecovered_after_transfer: z.clone(),
            carry_forward: z,
        }
    }

    /// Unpaid investment credit at the end of the last year
    pub fn ic_forfeited(&self) -> f64 {
        self.ic_unpaid.last().copied().unwrap_or(0.0)
    }

    /// Unrecovered balance after the last year's transfer
    pub fn ending_unrecovered(&self) -> f64 {
        self.unrecovered_after_transfer.last().copied().unwrap_or(0.0)
    }
}

/// Walk oil and gas recovery together, year by year.
///
/// Per fluid and year: investment credit is paid first out of what is
/// available, then cost is recovered up to the cap. A fluid left with
/// unrecovered cost takes surplus ETS from the other fluid when that
/// fluid has fully recovered. The balance after transfer carries into
/// the next year's claim.
pub fn joint_recovery(oil: RecoveryInput<'_>, gas: RecoveryInput<'_>) -> (RecoveryOutcome, RecoveryOutcome) {
    let n = oil.available.len();
    let mut out = [RecoveryOutcome::zeroed(n), RecoveryOutcome::zeroed(n)];
    let inputs = [oil, gas];
    let mut carry = [0.0_f64; 2];
    let mut ic_carry = [0.0_f64; 2];

    for i in 0..n {
        for f in 0..2 {
            let input = &inputs[f];
            let o = &mut out[f];
            let avail = input.available[i].max(0.0);

            let ic_due = input.investment_credit[i] + ic_carry[f];
            let ic_paid = avail.min(ic_due);
            ic_carry[f] = ic_due - ic_paid;

            let claim = input.deductible[i] + carry[f];
            let ctbr = claim.min(input.cap_rate[i] * avail);
            let cr = ctbr.min(avail - ic_paid).max(0.0);
            let mut ets = avail - ic_paid - cr;
            if ets.abs() < ETS_EPSILON {
                ets = 0.0;
            }

            o.carry_forward[i] = carry[f];
            o.ic_paid[i] = ic_paid;
            o.ic_unpaid[i] = ic_carry[f];
            o.cost_to_be_recovered[i] = ctbr;
            o.cost_recovery[i] = cr;
            o.unrecovered_before_transfer[i] = claim - cr;
            o.ets_before_transfer[i] = ets;
        }

        let (oil_unrec, gas_unrec) = (out[0].unrecovered_before_transfer[i], out[1].unrecovered_before_transfer[i]);
        let (oil_ets, gas_ets) = (out[0].ets_before_transfer[i], out[1].ets_before_transfer[i]);
        let to_oil = if oil_unrec > 0.0 && gas_unrec == 0.0 {
            gas_ets.min(oil_unrec).max(0.0)
        } else {
            0.0
        };
        let to_gas = if gas_unrec > 0.0 && oil_unrec == 0.0 {
            oil_ets.min(gas_unrec).max(0.0)
        } else {
            0.0
        };

        for (f, (received, given)) in [(to_oil, to_gas), (to_gas, to_oil)].into_iter().enumerate() {
            let o = &mut out[f];
            o.transfer_in[i] = received;
            o.transfer_out[i] = given;
            o.cost_recovery_after_transfer[i] = o.cost_recovery[i] + received;
            o.ets_after_transfer[i] = o.ets_before_transfer[i] - given;
            o.unrecovered_after_transfer[i] = o.unrecovered_before_transfer[i] - received;
            carry[f] = o.unrecovered_after_transfer[i];
        }
    }

    let [oil_out, gas_out] = out;
    (oil_out, gas_out)
}

/// DMO contract terms for one fluid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DmoTerms {
    pub volume_portion: f64,
    pub fee_portion: f64,
    /// Months after onstream before the discounted fee applies
    pub holiday_duration: u32,
}

/// Year-by-year inputs to [`domestic_market_obligation`]
#[derive(Debug, Clone, Copy)]
pub struct DmoInput<'a> {
    pub project_years: &'a [i32],
    pub onstream: NaiveDate,
    pub lifting: &'a [f64],
    pub price: &'a [f64],
    /// Contractor pretax share (Cost Recovery) or contractor split (Gross Split)
    pub ctr_share: &'a [f64],
    /// Balance that keeps the fee at full price while positive
    pub unrecovered: &'a [f64],
    pub ctr_ets: &'a [f64],
    pub ctr_ftp: &'a [f64],
    pub post_uu_22_year2001: bool,
    pub is_end_weighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DmoOutcome {
    pub volume: Vec<f64>,
    pub fee: Vec<f64>,
    /// Value given up by the contractor: volume at market price less the fee
    pub ddmo: Vec<f64>,
}

/// Domestic market obligation volume, fee and its cost to the contractor
pub fn domestic_market_obligation(terms: &DmoTerms, input: &DmoInput<'_>) -> FiscalResult<DmoOutcome> {
    let holiday_end = input
        .onstream
        .checked_add_months(Months::new(terms.holiday_duration))
        .ok_or_else(|| FiscalError::Contract(format!("DMO holiday of {} months overflows the calendar", terms.holiday_duration)))?;
    let holiday_end_year = holiday_end.year();
    // Share of the holiday-end year still inside the holiday
    let holiday_fraction = f64::from(holiday_end.month0()) / 12.0;

    let n = input.project_years.len();
    let mut out = DmoOutcome {
        volume: vec![0.0; n],
        fee: vec![0.0; n],
        ddmo: vec![0.0; n],
    };

    for i in 0..n {
        let year = input.project_years[i];
        let price = input.price[i];
        let mut volume = terms.volume_portion * input.lifting[i] * input.ctr_share[i];
        if !input.post_uu_22_year2001 {
            volume = if input.ctr_ets[i] > 0.0 && price != 0.0 {
                volume.min((input.ctr_ets[i] + input.ctr_ftp[i]) / price)
            } else {
                0.0
            };
        }

        let in_holiday = year < holiday_end_year;
        let recovered = input.unrecovered[i] == 0.0;
        let full_value = volume * price;
        let discounted = terms.fee_portion * full_value;
        let fee = if input.is_end_weighted && year == holiday_end_year && recovered {
            holiday_fraction * full_value + (1.0 - holiday_fraction) * discounted
        } else if recovered && !in_holiday {
            discounted
        } else {
            full_value
        };

        out.volume[i] = volume;
        out.fee[i] = fee;
        out.ddmo[i] = full_value - fee;
    }
    Ok(out)
}

/// One row of a sliding-scale or R/C split table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitBracket {
    pub bottom: f64,
    pub top: f64,
    pub oil_ctr_pretax: f64,
    pub gas_ctr_pretax: f64,
}

/// Oil and gas contractor pretax share per year from a bracket table.
///
/// A bracket matches `bottom < indicator <= top`; the lowest bracket also
/// matches an indicator equal to its bottom.
pub fn pretax_by_bracket(indicator: &[f64], brackets: &[SplitBracket]) -> FiscalResult<(Vec<f64>, Vec<f64>)> {
    let lowest = brackets
        .iter()
        .map(|b| b.bottom)
        .fold(f64::INFINITY, f64::min);
    let mut oil = Vec::with_capacity(indicator.len());
    let mut gas = Vec::with_capacity(indicator.len());
    for &ind in indicator {
        let bracket = brackets
            .iter()
            .find(|b| (b.bottom < ind || (b.bottom == lowest && ind == lowest)) && ind <= b.top)
            .ok_or_else(|| {
                log::warn!("split indicator {ind} falls outside every bracket");
                FiscalError::Contract(format!("split indicator {ind} falls outside every bracket"))
            })?;
        oil.push(bracket.oil_ctr_pretax);
        gas.push(bracket.gas_ctr_pretax);
    }
    Ok((oil, gas))
}

/// Cumulative revenue over cumulative cost; zero while nothing has been spent
pub fn rc_indicator(revenue: &[f64], cost: &[f64]) -> Vec<f64> {
    cumsum(revenue)
        .iter()
        .zip(cumsum(cost))
        .map(|(r, c)| if c == 0.0 { 0.0 } else { r / c })
        .collect()
}

/// Volume-weighted average price per year over several schedules; zero where there is no volume
pub fn weighted_average_price(volumes: &[Vec<f64>], prices: &[Vec<f64>], n_years: usize) -> Vec<f64> {
    let mut weighted = vec![0.0; n_years];
    let mut total = vec![0.0; n_years];
    for (volume, price) in volumes.iter().zip(prices) {
        for i in 0..n_years {
            weighted[i] += volume[i] * price[i];
            total[i] += volume[i];
        }
    }
    weighted
        .iter()
        .zip(&total)
        .map(|(w, t)| if *t == 0.0 { 0.0 } else { w / t })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn input<'a>(available: &'a [f64], deductible: &'a [f64], zeros: &'a [f64], cap: &'a [f64]) -> RecoveryInput<'a> {
        RecoveryInput {
            available,
            deductible,
            investment_credit: zeros,
            cap_rate: cap,
        }
    }

    #[test]
    fn test_ftp_shared_and_unshared() {
        let rev = [100.0, 200.0];
        let shared = first_tranche(&rev, true, true, 0.2, &[0.25, 0.25]);
        assert_eq!(shared.total, vec![20.0, 40.0]);
        assert_eq!(shared.contractor, vec![5.0, 10.0]);
        assert_eq!(shared.government, vec![15.0, 30.0]);

        let unshared = first_tranche(&rev, true, false, 0.2, &[0.25, 0.25]);
        assert_eq!(unshared.government, vec![20.0, 40.0]);
        let off = first_tranche(&rev, false, true, 0.2, &[0.25, 0.25]);
        assert_eq!(off.total, vec![0.0, 0.0]);
    }

    #[test]
    fn test_recovery_partitions_available_revenue() {
        let avail = [0.0, 50.0, 80.0, 120.0];
        let ded = [90.0, 10.0, 10.0, 10.0];
        let z = [0.0; 4];
        let cap = [1.0; 4];
        let (oil, _) = joint_recovery(input(&avail, &ded, &z, &cap), input(&z, &z, &z, &cap));
        for i in 0..4 {
            assert_relative_eq!(oil.cost_recovery[i] + oil.ets_before_transfer[i], avail[i], epsilon = 1e-9);
        }
        assert_eq!(oil.carry_forward, vec![0.0, 90.0, 50.0, 0.0]);
        assert_eq!(oil.cost_recovery, vec![0.0, 50.0, 60.0, 10.0]);
    }

    #[test]
    fn test_cap_rate_limits_recovery() {
        let avail = [100.0, 100.0];
        let ded = [150.0, 0.0];
        let z = [0.0; 2];
        let cap = [0.8; 2];
        let (oil, _) = joint_recovery(input(&avail, &ded, &z, &cap), input(&z, &z, &z, &cap));
        assert_eq!(oil.cost_recovery, vec![80.0, 70.0]);
        assert_eq!(oil.ets_before_transfer, vec![20.0, 30.0]);
        assert_eq!(oil.unrecovered_after_transfer, vec![70.0, 0.0]);
    }

    #[test]
    fn test_investment_credit_paid_first_and_carried() {
        let avail = [10.0, 100.0];
        let ded = [0.0, 20.0];
        let ic = [30.0, 0.0];
        let z = [0.0; 2];
        let cap = [1.0; 2];
        let oil_in = RecoveryInput {
            available: &avail,
            deductible: &ded,
            investment_credit: &ic,
            cap_rate: &cap,
        };
        let (oil, _) = joint_recovery(oil_in, input(&z, &z, &z, &cap));
        assert_eq!(oil.ic_paid, vec![10.0, 20.0]);
        assert_eq!(oil.ic_unpaid, vec![20.0, 0.0]);
        assert_eq!(oil.cost_recovery, vec![0.0, 20.0]);
        assert_eq!(oil.ets_before_transfer, vec![0.0, 60.0]);
        assert_relative_eq!(oil.ic_forfeited(), 0.0);
    }

    #[test]
    fn test_transfer_from_gas_surplus_to_oil_deficit() {
        let oil_avail = [10.0, 10.0];
        let oil_ded = [50.0, 0.0];
        let gas_avail = [100.0, 100.0];
        let gas_ded = [20.0, 0.0];
        let z = [0.0; 2];
        let cap = [1.0; 2];
        let (oil, gas) = joint_recovery(input(&oil_avail, &oil_ded, &z, &cap), input(&gas_avail, &gas_ded, &z, &cap));
        // Year 0: oil short by 40, gas surplus 80
        assert_eq!(oil.transfer_in[0], 40.0);
        assert_eq!(gas.transfer_out[0], 40.0);
        assert_eq!(oil.unrecovered_after_transfer[0], 0.0);
        assert_eq!(gas.ets_after_transfer[0], 40.0);
        assert_eq!(oil.cost_recovery_after_transfer[0], 50.0);
        // Nothing carries into year 1
        assert_eq!(oil.carry_forward[1], 0.0);
        assert_eq!(oil.transfer_in[1], 0.0);
    }

    #[test]
    fn test_no_transfer_when_both_short() {
        let avail = [10.0];
        let ded = [50.0];
        let z = [0.0];
        let cap = [1.0];
        let (oil, gas) = joint_recovery(input(&avail, &ded, &z, &cap), input(&avail, &ded, &z, &cap));
        assert_eq!(oil.transfer_in[0] + gas.transfer_in[0], 0.0);
        assert_eq!(oil.ending_unrecovered(), 40.0);
    }

    fn dmo_input<'a>(years: &'a [i32], ones: &'a [f64], unrec: &'a [f64], onstream: NaiveDate) -> DmoInput<'a> {
        DmoInput {
            project_years: years,
            onstream,
            lifting: ones,
            price: ones,
            ctr_share: ones,
            unrecovered: unrec,
            ctr_ets: ones,
            ctr_ftp: ones,
            post_uu_22_year2001: true,
            is_end_weighted: false,
        }
    }

    #[test]
    fn test_dmo_fee_discounted_after_holiday_once_recovered() {
        let years = [2020, 2021, 2022, 2023, 2024, 2025];
        let ones = [100.0; 6];
        let unrec = [5.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let onstream = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let terms = DmoTerms {
            volume_portion: 0.25,
            fee_portion: 0.25,
            holiday_duration: 60,
        };
        let out = domestic_market_obligation(&terms, &dmo_input(&years, &ones, &unrec, onstream)).unwrap();
        // volume = 0.25 * 100 * 100
        assert_relative_eq!(out.volume[0], 2500.0);
        // holiday through 2024
        for i in 0..5 {
            assert_relative_eq!(out.ddmo[i], 0.0);
        }
        assert_relative_eq!(out.fee[5], 0.25 * 2500.0 * 100.0);
        assert_relative_eq!(out.ddmo[5], 0.75 * 2500.0 * 100.0);
    }

    #[test]
    fn test_dmo_end_weighted_splits_holiday_year() {
        let years = [2020, 2021];
        let ones = [1.0; 2];
        let unrec = [0.0; 2];
        let onstream = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let terms = DmoTerms {
            volume_portion: 1.0,
            fee_portion: 0.0,
            holiday_duration: 12,
        };
        let mut inp = dmo_input(&years, &ones, &unrec, onstream);
        inp.is_end_weighted = true;
        let out = domestic_market_obligation(&terms, &inp).unwrap();
        // Holiday ends April 2021: three months at full price
        assert_relative_eq!(out.fee[1], 0.25, epsilon = 1e-12);
        assert_relative_eq!(out.ddmo[1], 0.75, epsilon = 1e-12);
        assert_relative_eq!(out.ddmo[0], 0.0);
    }

    #[test]
    fn test_dmo_volume_capped_before_uu22() {
        let years = [2020, 2021];
        let lifting = [100.0, 100.0];
        let price = [10.0, 10.0];
        let share = [1.0, 1.0];
        let ets = [50.0, 0.0];
        let ftp = [10.0, 10.0];
        let unrec = [0.0, 0.0];
        let terms = DmoTerms {
            volume_portion: 0.5,
            fee_portion: 0.1,
            holiday_duration: 0,
        };
        let inp = DmoInput {
            project_years: &years,
            onstream: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            lifting: &lifting,
            price: &price,
            ctr_share: &share,
            unrecovered: &unrec,
            ctr_ets: &ets,
            ctr_ftp: &ftp,
            post_uu_22_year2001: false,
            is_end_weighted: false,
        };
        let out = domestic_market_obligation(&terms, &inp).unwrap();
        assert_relative_eq!(out.volume[0], 6.0);
        assert_relative_eq!(out.volume[1], 0.0);
    }

    #[test]
    fn test_portion_check_strict_and_permissive() {
        assert!(check_portion(true, "oil_ftp_portion", 0.2).is_ok());
        assert!(check_portion(false, "oil_ftp_portion", 1.5).is_ok());
        assert!(matches!(check_portion(true, "oil_ftp_portion", 1.5), Err(FiscalError::Contract(_))));
        assert!(check_portion(true, "gas_dmo_fee_portion", -0.1).is_err());
    }

    #[test]
    fn test_bracket_lookup() {
        let brackets = [
            SplitBracket { bottom: 0.0, top: 1.0, oil_ctr_pretax: 0.3, gas_ctr_pretax: 0.5 },
            SplitBracket { bottom: 1.0, top: 2.0, oil_ctr_pretax: 0.2, gas_ctr_pretax: 0.4 },
        ];
        let (oil, gas) = pretax_by_bracket(&[0.0, 1.0, 1.5], &brackets).unwrap();
        assert_eq!(oil, vec![0.3, 0.3, 0.2]);
        assert_eq!(gas, vec![0.5, 0.5, 0.4]);
        assert!(matches!(pretax_by_bracket(&[2.5], &brackets), Err(FiscalError::Contract(_))));
    }

    #[test]
    fn test_rc_indicator_and_wap() {
        assert_eq!(rc_indicator(&[0.0, 100.0, 100.0], &[0.0, 50.0, 50.0]), vec![0.0, 2.0, 2.0]);
        let wap = weighted_average_price(&[vec![1.0, 0.0], vec![3.0, 0.0]], &[vec![10.0, 5.0], vec![20.0, 5.0]], 2);
        assert_relative_eq!(wap[0], 17.5);
        assert_relative_eq!(wap[1], 0.0);
    }
}

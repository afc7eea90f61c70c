//! Income tax rates and tax payment schedules

use crate::contracts::psc_tools::broadcast_years;
use crate::econ::helper::{cumsum, Rate};
use crate::econ::selection::{FtpTaxRegime, TaxRegime};
use crate::error::FiscalResult;

/// Statutory rate in force from each calendar year
const PREVAILING_RATES: &[(i32, f64)] = &[(2013, 0.44), (2016, 0.42), (2020, 0.40)];

/// Rate in force in `year` under the prevailing table; years before the
/// first entry take the first rate
pub fn prevailing_rate(year: i32) -> f64 {
    PREVAILING_RATES
        .iter()
        .rev()
        .find(|(from, _)| year >= *from)
        .map_or(PREVAILING_RATES[0].1, |(_, rate)| *rate)
}

/// Yearly tax rate for a project starting in `start_year`
pub fn tax_rate_by_regime(regime: TaxRegime, start_year: i32, project_years: &[i32]) -> Vec<f64> {
    let n = project_years.len();
    match regime {
        TaxRegime::Prevailing => project_years.iter().map(|&y| prevailing_rate(y)).collect(),
        TaxRegime::Uu36_2008 => vec![0.44; n],
        TaxRegime::Uu02_2020 => vec![0.42; n],
        TaxRegime::Uu07_2021 => vec![0.40; n],
        TaxRegime::NailedDown => {
            let (last_year, last_rate) = PREVAILING_RATES[PREVAILING_RATES.len() - 1];
            if start_year >= last_year {
                vec![last_rate; n]
            } else {
                vec![PREVAILING_RATES[0].1; n]
            }
        }
    }
}

/// Yearly tax rate: an explicit effective rate wins over the regime table
pub fn resolve_tax_rate(
    regime: TaxRegime,
    effective_tax_rate: Option<&Rate>,
    start_year: i32,
    project_years: &[i32],
) -> FiscalResult<Vec<f64>> {
    match effective_tax_rate {
        Some(rate) => broadcast_years("effective_tax_rate", rate, project_years.len()),
        None => Ok(tax_rate_by_regime(regime, start_year, project_years)),
    }
}

/// Tax before FTP regime 20/2017: nothing is due until the contractor first has
/// a positive equity share; that year pays on all taxable income to date.
pub fn pre_pdjp_tax(ctr_share: &[f64], taxable_income: &[f64], tax_rate: &[f64]) -> Vec<f64> {
    let cum_ti = cumsum(taxable_income);
    let mut out = vec![0.0; ctr_share.len()];
    let mut applied_before = false;
    for i in 0..ctr_share.len() {
        let applied = ctr_share[i] > 0.0;
        out[i] = match (applied, applied_before) {
            (true, false) => cum_ti[i] * tax_rate[i],
            (true, true) => taxable_income[i] * tax_rate[i],
            _ => 0.0,
        };
        applied_before = applied;
    }
    out
}

/// Tax under FTP regime 20/2017: contractor FTP is taxed only once cumulative
/// FTP exceeds the unrecovered cost; the rest of taxable income is taxed as earned.
pub fn pdjp_tax(ftp_ctr: &[f64], unrecovered: &[f64], taxable_income: &[f64], tax_rate: &[f64]) -> Vec<f64> {
    let cum_ftp = cumsum(ftp_ctr);
    let n = ftp_ctr.len();
    let mut taxed_before = 0.0;
    let mut considered_prev = 0.0;
    let mut out = vec![0.0; n];

    for i in 0..n {
        taxed_before += considered_prev;
        let exceeding = if cum_ftp[i] > unrecovered[i] {
            cum_ftp[i] - taxed_before
        } else {
            0.0
        };
        let considered = if exceeding > unrecovered[i] {
            exceeding - unrecovered[i]
        } else {
            0.0
        };
        out[i] = considered * tax_rate[i] + (taxable_income[i] - ftp_ctr[i]) * tax_rate[i];
        considered_prev = considered;
    }
    out
}

/// Tax payment by FTP tax regime
pub fn tax_payment(
    regime: FtpTaxRegime,
    ctr_share: &[f64],
    taxable_income: &[f64],
    tax_rate: &[f64],
    ftp_ctr: &[f64],
    unrecovered: &[f64],
) -> Vec<f64> {
    match regime {
        FtpTaxRegime::PrePdjp20_2017 => pre_pdjp_tax(ctr_share, taxable_income, tax_rate),
        FtpTaxRegime::Pdjp20_2017 => pdjp_tax(ftp_ctr, unrecovered, taxable_income, tax_rate),
        FtpTaxRegime::DirectMode => taxable_income.iter().zip(tax_rate).map(|(ti, r)| ti * r).collect(),
    }
}

/// Roll tax due against the contractor share: what cannot be paid in a year is
/// carried as an unpaid balance. Returns `(unpaid_balance, tax_paid)`.
pub fn unpaid_tax_balance(tax_due: &[f64], ctr_share: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = tax_due.len();
    let mut unpaid = vec![0.0; n];
    let mut paid = vec![0.0; n];
    let mut carried = 0.0;
    for i in 0..n {
        let owed = carried + tax_due[i];
        unpaid[i] = (owed - ctr_share[i]).max(0.0);
        paid[i] = ctr_share[i].min(owed);
        carried = unpaid[i];
    }
    (unpaid, paid)
}

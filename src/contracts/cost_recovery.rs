//! Cost Recovery PSC engine
//!
//! Revenue less FTP first pays investment credit, then recoverable cost up
//! to the cap. What is left is equity to be split. Oil and gas are walked
//! together so surplus equity of one fluid can cover the other's
//! unrecovered cost; shares, DMO and tax then follow per fluid and are
//! consolidated at the end.

use serde::{Deserialize, Serialize};

use crate::contracts::config::CostRecoveryArgs;
use crate::contracts::project::{BaseProject, ExpenditureRates, FluidBook};
use crate::contracts::psc_tools::{
    broadcast_years, check_portion, domestic_market_obligation, first_tranche, joint_recovery, pretax_by_bracket,
    rc_indicator, DmoInput, DmoOutcome, DmoTerms, FtpSplit, RecoveryInput, RecoveryOutcome, SplitBracket,
};
use crate::contracts::results::StreamResult;
use crate::contracts::tax::{pre_pdjp_tax, resolve_tax_rate, tax_payment, unpaid_tax_balance};
use crate::econ::helper::{add_arrays, sub_arrays, Rate};
use crate::econ::selection::{FluidType, FtpTaxRegime, TaxSplitType};
use crate::error::{FiscalError, FiscalResult};

/// Contract terms of a Cost Recovery PSC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostRecoveryParams {
    pub oil_ftp_is_available: bool,
    /// Contractor keeps its pretax share of oil FTP
    pub oil_ftp_is_shared: bool,
    /// Share of oil revenue taken as FTP
    pub oil_ftp_portion: f64,
    pub gas_ftp_is_available: bool,
    pub gas_ftp_is_shared: bool,
    pub gas_ftp_portion: f64,

    /// Where the contractor pretax share comes from
    pub tax_split_type: TaxSplitType,

    /// Pretax share table for sliding-scale and R/C splits
    pub brackets: Vec<SplitBracket>,

    /// Yearly indicator looked up in `brackets`. Defaults to the oil price
    /// for the sliding scale and to cumulative R/C for the R/C split.
    pub split_indicator: Option<Vec<f64>>,

    /// Contractor share of equity to be split, conventional split
    pub oil_ctr_pretax_share: f64,
    pub gas_ctr_pretax_share: f64,

    pub oil_ic_rate: f64,
    pub gas_ic_rate: f64,
    pub ic_is_available: bool,

    /// Ceiling on cost recovery as a share of revenue after FTP
    pub oil_cr_cap_rate: f64,
    pub gas_cr_cap_rate: f64,

    pub oil_dmo: DmoTerms,
    pub gas_dmo: DmoTerms,

    /// Fail instead of warn on portions outside [0, 1]
    pub strict_validation: bool,
}

impl Default for CostRecoveryParams {
    fn default() -> Self {
        Self {
            oil_ftp_is_available: true,
            oil_ftp_is_shared: true,
            oil_ftp_portion: 0.2,
            gas_ftp_is_available: true,
            gas_ftp_is_shared: true,
            gas_ftp_portion: 0.2,
            tax_split_type: TaxSplitType::Conventional,
            brackets: Vec::new(),
            split_indicator: None,
            oil_ctr_pretax_share: 0.25,
            gas_ctr_pretax_share: 0.5,
            oil_ic_rate: 0.0,
            gas_ic_rate: 0.0,
            ic_is_available: false,
            oil_cr_cap_rate: 1.0,
            gas_cr_cap_rate: 1.0,
            oil_dmo: DmoTerms {
                volume_portion: 0.25,
                fee_portion: 0.25,
                holiday_duration: 60,
            },
            gas_dmo: DmoTerms {
                volume_portion: 1.0,
                fee_portion: 1.0,
                holiday_duration: 60,
            },
            strict_validation: false,
        }
    }
}

/// Per-fluid view of the contract terms
struct FluidTerms {
    ftp_is_available: bool,
    ftp_is_shared: bool,
    ftp_portion: f64,
    ic_rate: f64,
    cr_cap_rate: f64,
    dmo: DmoTerms,
}

impl CostRecoveryParams {
    fn terms(&self, fluid: FluidType) -> FluidTerms {
        match fluid {
            FluidType::Gas => FluidTerms {
                ftp_is_available: self.gas_ftp_is_available,
                ftp_is_shared: self.gas_ftp_is_shared,
                ftp_portion: self.gas_ftp_portion,
                ic_rate: self.gas_ic_rate,
                cr_cap_rate: self.gas_cr_cap_rate,
                dmo: self.gas_dmo,
            },
            _ => FluidTerms {
                ftp_is_available: self.oil_ftp_is_available,
                ftp_is_shared: self.oil_ftp_is_shared,
                ftp_portion: self.oil_ftp_portion,
                ic_rate: self.oil_ic_rate,
                cr_cap_rate: self.oil_cr_cap_rate,
                dmo: self.oil_dmo,
            },
        }
    }

    fn validate(&self) -> FiscalResult<()> {
        let strict = self.strict_validation;
        for (field, value) in [
            ("oil_ftp_portion", self.oil_ftp_portion),
            ("gas_ftp_portion", self.gas_ftp_portion),
            ("oil_ctr_pretax_share", self.oil_ctr_pretax_share),
            ("gas_ctr_pretax_share", self.gas_ctr_pretax_share),
            ("oil_dmo_volume_portion", self.oil_dmo.volume_portion),
            ("oil_dmo_fee_portion", self.oil_dmo.fee_portion),
            ("gas_dmo_volume_portion", self.gas_dmo.volume_portion),
            ("gas_dmo_fee_portion", self.gas_dmo.fee_portion),
        ] {
            check_portion(strict, field, value)?;
        }
        for bracket in &self.brackets {
            check_portion(strict, "bracket oil_ctr_pretax", bracket.oil_ctr_pretax)?;
            check_portion(strict, "bracket gas_ctr_pretax", bracket.gas_ctr_pretax)?;
            if bracket.bottom > bracket.top {
                return Err(FiscalError::Contract(format!(
                    "split bracket bottom {} is above its top {}",
                    bracket.bottom, bracket.top
                )));
            }
        }
        if self.tax_split_type != TaxSplitType::Conventional && self.brackets.is_empty() {
            return Err(FiscalError::Contract(format!(
                "{} needs at least one split bracket",
                self.tax_split_type
            )));
        }
        for (field, value) in [
            ("oil_ic_rate", self.oil_ic_rate),
            ("gas_ic_rate", self.gas_ic_rate),
            ("oil_cr_cap_rate", self.oil_cr_cap_rate),
            ("gas_cr_cap_rate", self.gas_cr_cap_rate),
        ] {
            if value < 0.0 {
                return Err(FiscalError::Contract(format!("{field} must not be negative, got {value}")));
            }
        }
        Ok(())
    }
}

/// Intermediate arrays of one fluid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryDetail {
    pub ctr_pretax_share: Vec<f64>,
    pub ftp: FtpSplit,
    /// Investment credit earned each year
    pub investment_credit: Vec<f64>,
    pub recovery: RecoveryOutcome,
    pub dmo: DmoOutcome,
    pub tax_rate: Vec<f64>,
    /// VAT and PDRI included in the fluid's expenditures
    pub indirect_tax: Vec<f64>,
    /// Capital not yet depreciated at the end of the contract
    pub undepreciated: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRecoveryResult {
    pub project_years: Vec<i32>,
    pub oil: StreamResult,
    pub gas: StreamResult,
    pub consolidated: StreamResult,
    pub oil_detail: RecoveryDetail,
    pub gas_detail: RecoveryDetail,
    /// Consolidated tax due but not yet paid; only accrues before FTP regime 20/2017
    pub unpaid_tax: Vec<f64>,
    pub sunk_cost: Option<f64>,
    /// Investment credit never paid by the end of the contract
    pub ic_forfeited: f64,
}

/// Arrays of one fluid going into shares, DMO and tax
struct FluidPass<'a> {
    fluid: FluidType,
    book: &'a FluidBook,
    depreciation: Vec<f64>,
    undepreciated: f64,
    non_capital: Vec<f64>,
    pretax: Vec<f64>,
    ftp: FtpSplit,
    investment_credit: Vec<f64>,
    recovery: RecoveryOutcome,
}

/// Derive net share, takes and cash flow from the shares and tax already in `stream`
fn settle(stream: &mut StreamResult, ftp_government: &[f64]) {
    let n = stream.len();
    stream.contractor_net_share = sub_arrays(&stream.taxable_income, &stream.tax);
    stream.contractor_take = add_arrays(&stream.contractor_net_share, &stream.recovery);
    stream.government_take = (0..n)
        .map(|i| ftp_government[i] + stream.government_share[i] + stream.tax[i] + stream.ddmo[i])
        .collect();
    stream.cashflow = (0..n)
        .map(|i| stream.contractor_take[i] - stream.capital[i] - stream.non_capital[i])
        .collect();
}

/// A Cost Recovery PSC over one project
#[derive(Debug, Clone, PartialEq)]
pub struct CostRecovery {
    project: BaseProject,
    params: CostRecoveryParams,
}

impl CostRecovery {
    pub fn new(project: BaseProject, params: CostRecoveryParams) -> FiscalResult<Self> {
        params.validate()?;
        Ok(Self { project, params })
    }

    pub fn project(&self) -> &BaseProject {
        &self.project
    }

    pub fn params(&self) -> &CostRecoveryParams {
        &self.params
    }

    /// A new contract with `edit` applied to a copy of the terms
    pub fn with_overrides(&self, edit: impl FnOnce(&mut CostRecoveryParams)) -> FiscalResult<Self> {
        let mut params = self.params.clone();
        edit(&mut params);
        Self::new(self.project.clone(), params)
    }

    /// The same terms over another project
    pub fn with_project(&self, project: BaseProject) -> FiscalResult<Self> {
        Self::new(project, self.params.clone())
    }

    fn depreciation(
        &self,
        fluid: FluidType,
        args: &CostRecoveryArgs,
        rates: &ExpenditureRates,
    ) -> FiscalResult<(Vec<f64>, f64)> {
        let (mut depr, undepreciated) = self
            .project
            .depreciation(fluid, args.depr_method, args.decline_factor, rates)?;
        if args.sum_undepreciated_cost {
            if let Some(last) = depr.last_mut() {
                *last += undepreciated;
            }
            return Ok((depr, 0.0));
        }
        Ok((depr, undepreciated))
    }

    fn pretax_shares(&self, oil: &FluidBook, gas: &FluidBook) -> FiscalResult<(Vec<f64>, Vec<f64>)> {
        let n = self.project.project_duration();
        let params = &self.params;
        let given = params
            .split_indicator
            .as_ref()
            .map(|v| broadcast_years("split_indicator", &Rate::PerYear(v.clone()), n))
            .transpose()?;
        let indicator = match params.tax_split_type {
            TaxSplitType::Conventional => {
                return Ok((vec![params.oil_ctr_pretax_share; n], vec![params.gas_ctr_pretax_share; n]));
            }
            TaxSplitType::SlidingScale => given.unwrap_or_else(|| self.project.wap_price(FluidType::Oil)),
            TaxSplitType::RcSplit => given.unwrap_or_else(|| {
                rc_indicator(
                    &add_arrays(&oil.revenue, &gas.revenue),
                    &add_arrays(&oil.costs.total(), &gas.costs.total()),
                )
            }),
        };
        pretax_by_bracket(&indicator, &params.brackets)
    }

    fn investment_credit(&self, fluid: FluidType, rate: f64) -> FiscalResult<Vec<f64>> {
        let n = self.project.project_duration();
        if !self.params.ic_is_available {
            return Ok(vec![0.0; n]);
        }
        Ok(match self.project.capital(fluid)? {
            Some(capital) => capital.ic_eligible_cost().iter().map(|c| c * rate).collect(),
            None => vec![0.0; n],
        })
    }

    fn finish_fluid(
        &self,
        pass: FluidPass<'_>,
        args: &CostRecoveryArgs,
        tax_rate: &[f64],
    ) -> FiscalResult<(StreamResult, RecoveryDetail)> {
        let p = &self.project;
        let n = p.project_duration();
        let terms = self.params.terms(pass.fluid);
        let ets = &pass.recovery.ets_after_transfer;

        let contractor_share: Vec<f64> = pass.pretax.iter().zip(ets).map(|(s, e)| s * e).collect();
        let government_share: Vec<f64> = pass.pretax.iter().zip(ets).map(|(s, e)| (1.0 - s) * e).collect();

        let lifting = p.lifting_volume(pass.fluid);
        let price = p.wap_price(pass.fluid);
        let mut dmo = domestic_market_obligation(
            &terms.dmo,
            &DmoInput {
                project_years: p.project_years(),
                onstream: p.onstream_date(pass.fluid),
                lifting: &lifting,
                price: &price,
                ctr_share: &pass.pretax,
                unrecovered: &pass.recovery.unrecovered_after_transfer,
                ctr_ets: &contractor_share,
                ctr_ftp: &pass.ftp.contractor,
                post_uu_22_year2001: args.post_uu_22_year2001,
                is_end_weighted: args.is_dmo_end_weighted,
            },
        )?;
        if args.ftp_tax_regime == FtpTaxRegime::PrePdjp20_2017 {
            for (ddmo, share) in dmo.ddmo.iter_mut().zip(&contractor_share) {
                if *share <= 0.0 {
                    *ddmo = 0.0;
                }
            }
        }

        let taxable_income: Vec<f64> = (0..n)
            .map(|i| pass.ftp.contractor[i] + contractor_share[i] + pass.recovery.ic_paid[i] - dmo.ddmo[i])
            .collect();
        let tax = tax_payment(
            args.ftp_tax_regime,
            &contractor_share,
            &taxable_income,
            tax_rate,
            &pass.ftp.contractor,
            &pass.recovery.unrecovered_after_transfer,
        );

        let mut stream = StreamResult {
            revenue: pass.book.revenue.clone(),
            capital: pass.book.costs.capital.clone(),
            non_capital: pass.non_capital,
            depreciation: pass.depreciation,
            recovery: pass.recovery.cost_recovery_after_transfer.clone(),
            equity_to_be_split: ets.clone(),
            contractor_share,
            government_share,
            ddmo: dmo.ddmo.clone(),
            taxable_income,
            tax,
            ..StreamResult::zeros(n)
        };
        settle(&mut stream, &pass.ftp.government);

        let detail = RecoveryDetail {
            ctr_pretax_share: pass.pretax,
            ftp: pass.ftp,
            investment_credit: pass.investment_credit,
            recovery: pass.recovery,
            dmo,
            tax_rate: tax_rate.to_vec(),
            indirect_tax: pass.book.costs.indirect_tax.clone(),
            undepreciated: pass.undepreciated,
        };
        Ok((stream, detail))
    }

    /// Run the waterfall for both fluids and consolidate
    pub fn run(&self, args: &CostRecoveryArgs) -> FiscalResult<CostRecoveryResult> {
        let p = &self.project;
        let years = p.project_years().to_vec();
        let n = years.len();
        log::debug!(
            "cost recovery: {}..{} ({} years), {} producing fluid(s)",
            p.start_year(),
            p.end_year(),
            n,
            p.producing_fluids()
        );

        let rates = args.expenditure_rates(p);
        let targets = args.other_revenue();
        let oil_book = p.fluid_book(FluidType::Oil, &targets, &rates)?;
        let gas_book = p.fluid_book(FluidType::Gas, &targets, &rates)?;

        let (oil_pretax, gas_pretax) = self.pretax_shares(&oil_book, &gas_book)?;
        let oil_terms = self.params.terms(FluidType::Oil);
        let gas_terms = self.params.terms(FluidType::Gas);

        let oil_ftp = first_tranche(
            &oil_book.revenue,
            oil_terms.ftp_is_available,
            oil_terms.ftp_is_shared,
            oil_terms.ftp_portion,
            &oil_pretax,
        );
        let gas_ftp = first_tranche(
            &gas_book.revenue,
            gas_terms.ftp_is_available,
            gas_terms.ftp_is_shared,
            gas_terms.ftp_portion,
            &gas_pretax,
        );

        let (oil_depr, oil_undepreciated) = self.depreciation(FluidType::Oil, args, &rates)?;
        let (gas_depr, gas_undepreciated) = self.depreciation(FluidType::Gas, args, &rates)?;
        let oil_non_capital = oil_book.costs.non_capital(args.oil_cost_of_sales_applied);
        let gas_non_capital = gas_book.costs.non_capital(args.gas_cost_of_sales_applied);
        let oil_ic = self.investment_credit(FluidType::Oil, oil_terms.ic_rate)?;
        let gas_ic = self.investment_credit(FluidType::Gas, gas_terms.ic_rate)?;

        let oil_available = sub_arrays(&oil_book.revenue, &oil_ftp.total);
        let gas_available = sub_arrays(&gas_book.revenue, &gas_ftp.total);
        let oil_deductible = add_arrays(&oil_depr, &oil_non_capital);
        let gas_deductible = add_arrays(&gas_depr, &gas_non_capital);
        let oil_cap = vec![oil_terms.cr_cap_rate; n];
        let gas_cap = vec![gas_terms.cr_cap_rate; n];

        let (oil_recovery, gas_recovery) = joint_recovery(
            RecoveryInput {
                available: &oil_available,
                deductible: &oil_deductible,
                investment_credit: &oil_ic,
                cap_rate: &oil_cap,
            },
            RecoveryInput {
                available: &gas_available,
                deductible: &gas_deductible,
                investment_credit: &gas_ic,
                cap_rate: &gas_cap,
            },
        );

        let tax_rate = resolve_tax_rate(args.tax_regime, args.effective_tax_rate.as_ref(), p.start_year(), &years)?;
        let ftp_government = add_arrays(&oil_ftp.government, &gas_ftp.government);

        let (oil, oil_detail) = self.finish_fluid(
            FluidPass {
                fluid: FluidType::Oil,
                book: &oil_book,
                depreciation: oil_depr,
                undepreciated: oil_undepreciated,
                non_capital: oil_non_capital,
                pretax: oil_pretax,
                ftp: oil_ftp,
                investment_credit: oil_ic,
                recovery: oil_recovery,
            },
            args,
            &tax_rate,
        )?;
        let (gas, gas_detail) = self.finish_fluid(
            FluidPass {
                fluid: FluidType::Gas,
                book: &gas_book,
                depreciation: gas_depr,
                undepreciated: gas_undepreciated,
                non_capital: gas_non_capital,
                pretax: gas_pretax,
                ftp: gas_ftp,
                investment_credit: gas_ic,
                recovery: gas_recovery,
            },
            args,
            &tax_rate,
        )?;

        let mut consolidated = oil.sum(&gas);
        let unpaid_tax = if args.ftp_tax_regime == FtpTaxRegime::PrePdjp20_2017 {
            let due = pre_pdjp_tax(&consolidated.contractor_share, &consolidated.taxable_income, &tax_rate);
            let (unpaid, paid) = unpaid_tax_balance(&due, &consolidated.contractor_share);
            consolidated.tax = paid;
            settle(&mut consolidated, &ftp_government);
            unpaid
        } else {
            vec![0.0; n]
        };

        let sunk_cost = args
            .sunk_cost_reference_year
            .map(|year| p.sunk_cost(year, &add_arrays(&consolidated.capital, &consolidated.non_capital)))
            .transpose()?;
        let ic_forfeited = oil_detail.recovery.ic_forfeited() + gas_detail.recovery.ic_forfeited();

        log::debug!(
            "cost recovery done: contractor take {:.2}, government take {:.2}",
            consolidated.contractor_take.iter().sum::<f64>(),
            consolidated.government_take.iter().sum::<f64>()
        );

        Ok(CostRecoveryResult {
            project_years: years,
            oil,
            gas,
            consolidated,
            oil_detail,
            gas_detail,
            unpaid_tax,
            sunk_cost,
            ic_forfeited,
        })
    }
}

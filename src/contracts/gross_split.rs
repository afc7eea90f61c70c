//! Gross Split PSC engine
//!
//! The contractor takes a split of gross revenue and bears its own cost.
//! Expenses exceeding the contractor share are carried forward, and either
//! fluid's surplus can absorb the other's carry.

use serde::{Deserialize, Serialize};

use crate::contracts::config::GrossSplitArgs;
use crate::contracts::project::{BaseProject, ExpenditureRates, FluidBook};
use crate::contracts::psc_tools::{
    check_portion, domestic_market_obligation, joint_recovery, DmoInput, DmoOutcome, DmoTerms, RecoveryInput,
    RecoveryOutcome,
};
use crate::contracts::results::StreamResult;
use crate::contracts::split_tables::{
    contractor_split, progressive_split, variable_split, FieldAttributes, BASE_SPLIT_CTR_GAS, BASE_SPLIT_CTR_OIL,
};
use crate::contracts::tax::resolve_tax_rate;
use crate::econ::helper::{add_arrays, cumsum, sub_arrays};
use crate::econ::selection::FluidType;
use crate::error::{FiscalError, FiscalResult};

/// Years over which intangible cost is amortized when amortization is on
const INTANGIBLE_AMORTIZATION_YEARS: f64 = 5.0;

/// Contract terms of a Gross Split PSC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrossSplitParams {
    /// Attributes that set the variable split
    pub field: FieldAttributes,
    pub base_split_ctr_oil: f64,
    pub base_split_ctr_gas: f64,
    /// Discretionary adjustment added to both fluids
    pub split_ministry_disc: f64,
    /// BSCF of gas per MMBOE, for cumulative production
    pub conversion_bboe2bscf: f64,
    pub oil_dmo: DmoTerms,
    pub gas_dmo: DmoTerms,
    pub strict_validation: bool,
}

impl Default for GrossSplitParams {
    fn default() -> Self {
        Self {
            field: FieldAttributes::default(),
            base_split_ctr_oil: BASE_SPLIT_CTR_OIL,
            base_split_ctr_gas: BASE_SPLIT_CTR_GAS,
            split_ministry_disc: 0.08,
            conversion_bboe2bscf: 5.6,
            oil_dmo: DmoTerms {
                volume_portion: 0.25,
                fee_portion: 1.0,
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

impl GrossSplitParams {
    fn validate(&self) -> FiscalResult<()> {
        let strict = self.strict_validation;
        for (field, value) in [
            ("base_split_ctr_oil", self.base_split_ctr_oil),
            ("base_split_ctr_gas", self.base_split_ctr_gas),
            ("oil_dmo_volume_portion", self.oil_dmo.volume_portion),
            ("oil_dmo_fee_portion", self.oil_dmo.fee_portion),
            ("gas_dmo_volume_portion", self.gas_dmo.volume_portion),
            ("gas_dmo_fee_portion", self.gas_dmo.fee_portion),
        ] {
            check_portion(strict, field, value)?;
        }
        if self.conversion_bboe2bscf <= 0.0 {
            return Err(FiscalError::Contract(format!(
                "conversion_bboe2bscf must be positive, got {}",
                self.conversion_bboe2bscf
            )));
        }
        Ok(())
    }

    fn base_split(&self, fluid: FluidType) -> f64 {
        match fluid {
            FluidType::Gas => self.base_split_ctr_gas,
            _ => self.base_split_ctr_oil,
        }
    }

    fn dmo(&self, fluid: FluidType) -> DmoTerms {
        match fluid {
            FluidType::Gas => self.gas_dmo,
            _ => self.oil_dmo,
        }
    }
}

/// Intermediate arrays of one fluid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitDetail {
    pub variable_split: f64,
    pub progressive_split: Vec<f64>,
    pub ctr_split: Vec<f64>,
    /// Contractor share of revenue before the inter-fluid transfer
    pub ctr_share_before_transfer: Vec<f64>,
    pub total_expenses: Vec<f64>,
    pub recovery: RecoveryOutcome,
    pub dmo: DmoOutcome,
    pub tax_rate: Vec<f64>,
    pub indirect_tax: Vec<f64>,
    pub undepreciated: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrossSplitResult {
    pub project_years: Vec<i32>,
    pub oil: StreamResult,
    pub gas: StreamResult,
    pub consolidated: StreamResult,
    pub oil_detail: SplitDetail,
    pub gas_detail: SplitDetail,
    /// Oil plus gas-equivalent lifting to date
    pub cumulative_production: Vec<f64>,
    pub sunk_cost: Option<f64>,
}

/// A Gross Split PSC over one project
#[derive(Debug, Clone, PartialEq)]
pub struct GrossSplit {
    project: BaseProject,
    params: GrossSplitParams,
}

struct SplitPass<'a> {
    fluid: FluidType,
    book: &'a FluidBook,
    depreciation: Vec<f64>,
    undepreciated: f64,
    expenses: Vec<f64>,
    progressive: Vec<f64>,
    split: Vec<f64>,
    ctr_share: Vec<f64>,
    gov_share: Vec<f64>,
    recovery: RecoveryOutcome,
}

impl GrossSplit {
    pub fn new(project: BaseProject, params: GrossSplitParams) -> FiscalResult<Self> {
        params.validate()?;
        Ok(Self { project, params })
    }

    pub fn project(&self) -> &BaseProject {
        &self.project
    }

    pub fn params(&self) -> &GrossSplitParams {
        &self.params
    }

    /// A new contract with `edit` applied to a copy of the terms
    pub fn with_overrides(&self, edit: impl FnOnce(&mut GrossSplitParams)) -> FiscalResult<Self> {
        let mut params = self.params.clone();
        edit(&mut params);
        Self::new(self.project.clone(), params)
    }

    pub fn with_project(&self, project: BaseProject) -> FiscalResult<Self> {
        Self::new(project, self.params.clone())
    }

    fn depreciation(
        &self,
        fluid: FluidType,
        args: &GrossSplitArgs,
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

    /// Depreciation, intangible (expensed or amortized), OPEX, ASR, LBT and cost of sales
    fn expenses(
        &self,
        fluid: FluidType,
        book: &FluidBook,
        depreciation: &[f64],
        amortize: bool,
        rates: &ExpenditureRates,
    ) -> FiscalResult<Vec<f64>> {
        let intangible = if amortize {
            self.project
                .amortized_intangible(fluid, INTANGIBLE_AMORTIZATION_YEARS, rates)?
        } else {
            book.costs.intangible.clone()
        };
        let c = &book.costs;
        Ok((0..depreciation.len())
            .map(|i| depreciation[i] + intangible[i] + c.opex[i] + c.asr[i] + c.lbt[i] + c.cost_of_sales[i])
            .collect())
    }

    fn finish_fluid(
        &self,
        pass: SplitPass<'_>,
        variable: f64,
        args: &GrossSplitArgs,
        tax_rate: &[f64],
    ) -> FiscalResult<(StreamResult, SplitDetail)> {
        let p = &self.project;
        let n = p.project_duration();
        let rec = &pass.recovery;

        // Contractor share after giving or receiving surplus for the other fluid
        let contractor_share: Vec<f64> = (0..n)
            .map(|i| pass.ctr_share[i] - rec.transfer_out[i] + rec.transfer_in[i])
            .collect();
        let net_operating_profit = rec.ets_after_transfer.clone();

        let lifting = p.lifting_volume(pass.fluid);
        let price = p.wap_price(pass.fluid);
        let no_ftp = vec![0.0; n];
        let dmo = domestic_market_obligation(
            &self.params.dmo(pass.fluid),
            &DmoInput {
                project_years: p.project_years(),
                onstream: p.onstream_date(pass.fluid),
                lifting: &lifting,
                price: &price,
                ctr_share: &pass.split,
                unrecovered: &rec.unrecovered_after_transfer,
                ctr_ets: &net_operating_profit,
                ctr_ftp: &no_ftp,
                post_uu_22_year2001: args.post_uu_22_year2001,
                is_end_weighted: args.is_dmo_end_weighted,
            },
        )?;

        let taxable_income = sub_arrays(&net_operating_profit, &dmo.ddmo);
        let tax: Vec<f64> = taxable_income
            .iter()
            .zip(tax_rate)
            .map(|(ti, r)| ti.max(0.0) * r)
            .collect();
        let contractor_net_share = sub_arrays(&taxable_income, &tax);
        let contractor_take = add_arrays(&contractor_net_share, &rec.cost_recovery_after_transfer);
        let non_capital = pass.book.costs.non_capital(true);
        let cashflow: Vec<f64> = (0..n)
            .map(|i| contractor_take[i] - pass.book.costs.capital[i] - non_capital[i])
            .collect();
        let government_take: Vec<f64> = (0..n).map(|i| pass.gov_share[i] + tax[i] + dmo.ddmo[i]).collect();

        let stream = StreamResult {
            revenue: pass.book.revenue.clone(),
            capital: pass.book.costs.capital.clone(),
            non_capital,
            depreciation: pass.depreciation,
            recovery: rec.cost_recovery_after_transfer.clone(),
            equity_to_be_split: net_operating_profit,
            contractor_share,
            government_share: pass.gov_share,
            ddmo: dmo.ddmo.clone(),
            taxable_income,
            tax,
            contractor_net_share,
            contractor_take,
            government_take,
            cashflow,
        };
        let detail = SplitDetail {
            variable_split: variable,
            progressive_split: pass.progressive,
            ctr_split: pass.split,
            ctr_share_before_transfer: pass.ctr_share,
            total_expenses: pass.expenses,
            recovery: pass.recovery,
            dmo,
            tax_rate: tax_rate.to_vec(),
            indirect_tax: pass.book.costs.indirect_tax.clone(),
            undepreciated: pass.undepreciated,
        };
        Ok((stream, detail))
    }

    pub fn run(&self, args: &GrossSplitArgs) -> FiscalResult<GrossSplitResult> {
        let p = &self.project;
        let years = p.project_years().to_vec();
        let n = years.len();
        log::debug!(
            "gross split: {}..{} ({} years), {} producing fluid(s), {}",
            p.start_year(),
            p.end_year(),
            n,
            p.producing_fluids(),
            args.regime
        );

        let rates = args.expenditure_rates(p);
        let targets = args.other_revenue();
        let books = [
            p.fluid_book(FluidType::Oil, &targets, &rates)?,
            p.fluid_book(FluidType::Gas, &targets, &rates)?,
        ];

        let variable = variable_split(args.regime, &self.params.field);
        let oil_lifting = p.lifting_volume(FluidType::Oil);
        let gas_lifting = p.lifting_volume(FluidType::Gas);
        let cumulative_production = cumsum(
            &oil_lifting
                .iter()
                .zip(&gas_lifting)
                .map(|(o, g)| o + g / self.params.conversion_bboe2bscf)
                .collect::<Vec<_>>(),
        );

        let mut passes = Vec::with_capacity(2);
        for (fluid, book) in [FluidType::Oil, FluidType::Gas].into_iter().zip(&books) {
            let (depreciation, undepreciated) = self.depreciation(fluid, args, &rates)?;
            let expenses = self.expenses(fluid, book, &depreciation, args.amortization, &rates)?;
            let price = p.wap_price(fluid);
            let progressive: Vec<f64> = (0..n)
                .map(|i| progressive_split(args.regime, fluid, price[i], cumulative_production[i]))
                .collect();
            let split = contractor_split(
                self.params.base_split(fluid),
                variable,
                self.params.split_ministry_disc,
                &progressive,
            );
            let ctr_share: Vec<f64> = book.revenue.iter().zip(&split).map(|(r, s)| r * s).collect();
            let gov_share = sub_arrays(&book.revenue, &ctr_share);
            passes.push(SplitPass {
                fluid,
                book,
                depreciation,
                undepreciated,
                expenses,
                progressive,
                split,
                ctr_share,
                gov_share,
                recovery: RecoveryOutcome::default(),
            });
        }

        let zeros = vec![0.0; n];
        let full = vec![1.0; n];
        let (oil_recovery, gas_recovery) = joint_recovery(
            RecoveryInput {
                available: &passes[0].ctr_share,
                deductible: &passes[0].expenses,
                investment_credit: &zeros,
                cap_rate: &full,
            },
            RecoveryInput {
                available: &passes[1].ctr_share,
                deductible: &passes[1].expenses,
                investment_credit: &zeros,
                cap_rate: &full,
            },
        );
        passes[0].recovery = oil_recovery;
        passes[1].recovery = gas_recovery;

        let tax_rate = resolve_tax_rate(args.tax_regime, args.effective_tax_rate.as_ref(), p.start_year(), &years)?;
        let mut passes = passes.into_iter();
        let (Some(oil_pass), Some(gas_pass)) = (passes.next(), passes.next()) else {
            return Err(FiscalError::Contract("gross split needs an oil and a gas pass".to_string()));
        };
        let (oil, oil_detail) = self.finish_fluid(oil_pass, variable, args, &tax_rate)?;
        let (gas, gas_detail) = self.finish_fluid(gas_pass, variable, args, &tax_rate)?;
        let consolidated = oil.sum(&gas);

        let sunk_cost = args
            .sunk_cost_reference_year
            .map(|year| p.sunk_cost(year, &add_arrays(&consolidated.capital, &consolidated.non_capital)))
            .transpose()?;

        log::debug!(
            "gross split done: contractor take {:.2}, government take {:.2}",
            consolidated.contractor_take.iter().sum::<f64>(),
            consolidated.government_take.iter().sum::<f64>()
        );

        Ok(GrossSplitResult {
            project_years: years,
            oil,
            gas,
            consolidated,
            oil_detail,
            gas_detail,
            cumulative_production,
            sunk_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::project::ProjectCosts;
    use crate::econ::costs::{CapitalCost, Intangible, Opex};
    use crate::econ::revenue::Lifting;
    use crate::econ::selection::GrossSplitRegime;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn project() -> BaseProject {
        let years: Vec<i32> = (2026..=2031).collect();
        let oil = Lifting::new(2024, 2031, years.clone(), vec![1.0; 6], vec![70.0; 6], FluidType::Oil).unwrap();
        let gas = Lifting::new(2024, 2031, years.clone(), vec![11.2; 6], vec![8.0; 6], FluidType::Gas).unwrap();
        let costs = ProjectCosts {
            capital: vec![CapitalCost::new(2024, 2031, vec![2024, 2025], vec![40.0, 20.0], vec![FluidType::Oil, FluidType::Gas])
                .unwrap()],
            intangible: vec![Intangible::new(2024, 2031, vec![2025], vec![10.0], vec![FluidType::Oil]).unwrap()],
            opex: vec![Opex::new(2024, 2031, years, vec![5.0; 6], vec![FluidType::Oil; 6]).unwrap()],
            ..Default::default()
        };
        BaseProject::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2031, 12, 31).unwrap(),
            None,
            None,
            vec![oil, gas],
            costs,
        )
        .unwrap()
    }

    fn contract() -> GrossSplit {
        GrossSplit::new(project(), GrossSplitParams::default()).unwrap()
    }

    #[test]
    fn test_cumulative_production_in_oil_equivalent() {
        let result = contract().run(&GrossSplitArgs::default()).unwrap();
        // 1 oil + 11.2 / 5.6 gas per producing year
        assert_eq!(result.cumulative_production[1], 0.0);
        assert_relative_eq!(result.cumulative_production[2], 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.cumulative_production[7], 18.0, epsilon = 1e-12);
    }

    #[test]
    fn test_contractor_split_components() {
        let result = contract().run(&GrossSplitArgs::default()).unwrap();
        let d = &result.oil_detail;
        assert_relative_eq!(d.variable_split, 0.10, epsilon = 1e-12);
        // 52/2017: oil below 85 adds (85 - 70) * 0.25%; cumulative under 30 adds 10%
        assert_relative_eq!(d.progressive_split[2], 0.0375 + 0.10, epsilon = 1e-12);
        assert_relative_eq!(d.ctr_split[2], 0.43 + 0.10 + 0.08 + 0.1375, epsilon = 1e-12);
        let g = &result.gas_detail;
        assert_relative_eq!(g.ctr_split[2], 0.48 + 0.10 + 0.08 + 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_takes_partition_revenue() {
        let result = contract().run(&GrossSplitArgs::default()).unwrap();
        let c = &result.consolidated;
        for i in 0..c.len() {
            assert_relative_eq!(c.contractor_take[i] + c.government_take[i], c.revenue[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_expenses_carried_forward_before_production() {
        let result = contract().run(&GrossSplitArgs::default()).unwrap();
        let rec = &result.oil_detail.recovery;
        assert_eq!(rec.cost_recovery_after_transfer[0], 0.0);
        assert!(rec.unrecovered_after_transfer[1] > 0.0);
        // Intangible of 2025 is expensed in 2025 and waits for revenue
        assert_relative_eq!(result.oil_detail.total_expenses[1] - result.oil.depreciation[1], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_amortization_spreads_intangible() {
        let args = GrossSplitArgs {
            amortization: true,
            ..Default::default()
        };
        let result = contract().run(&args).unwrap();
        let d = &result.oil_detail;
        let intangible_part: Vec<f64> = (0..8)
            .map(|i| d.total_expenses[i] - result.oil.depreciation[i] - if i >= 2 { 5.0 } else { 0.0 })
            .collect();
        assert_relative_eq!(intangible_part[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(intangible_part[5], 2.0, epsilon = 1e-12);
        assert_relative_eq!(intangible_part[6], 0.0, epsilon = 1e-12);
        // Cash flow still sees the spend when it happens
        assert_relative_eq!(result.oil.non_capital[1], 10.0);
    }

    #[test]
    fn test_tax_is_never_negative() {
        let result = contract().run(&GrossSplitArgs::default()).unwrap();
        assert!(result.consolidated.tax.iter().all(|t| *t >= 0.0));
    }

    #[test]
    fn test_regime_8_2017_changes_split() {
        let args = GrossSplitArgs {
            regime: GrossSplitRegime::Permen8_2017,
            ..Default::default()
        };
        let result = contract().run(&args).unwrap();
        // 70 USD/bbl falls in the 70..85 step; cumulative 3 in the 1..10 step
        assert_relative_eq!(result.oil_detail.progressive_split[2], 0.0 + 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_conversion_rejected() {
        let err = contract().with_overrides(|p| p.conversion_bboe2bscf = 0.0).unwrap_err();
        assert!(matches!(err, FiscalError::Contract(_)));
        let err = contract()
            .with_overrides(|p| {
                p.base_split_ctr_gas = 1.3;
                p.strict_validation = true;
            })
            .unwrap_err();
        assert!(matches!(err, FiscalError::Contract(_)));
    }
}

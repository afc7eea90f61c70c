//! Base project aggregation
//!
//! A [`BaseProject`] owns the lifting schedules and cost entities of one
//! contract and re-expresses them, per fluid, on the project's own year
//! axis. Both contract engines read their revenue, cost and depreciation
//! arrays through it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::contracts::config::OtherRevenueTargets;
use crate::contracts::psc_tools::weighted_average_price;
use crate::econ::costs::{
    combine_same_fluid, Asr, AsrData, CapitalCost, CapitalCostData, CostEntity, CostItem, CostOfSales,
    CostOfSalesData, FiscalRates, Intangible, IntangibleData, Lbt, LbtData, Opex, OpexData,
};
use crate::econ::helper::{add_arrays, reproject, sub_arrays, Rate};
use crate::econ::revenue::{Lifting, LiftingData};
use crate::econ::selection::{DeprMethod, FluidType, InflationAppliedTo, OtherRevenue};
use crate::error::{FiscalError, FiscalResult};

/// Serializable input for [`BaseProject`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectData {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub oil_onstream_date: Option<NaiveDate>,
    #[serde(default)]
    pub gas_onstream_date: Option<NaiveDate>,
    #[serde(default)]
    pub lifting: Vec<LiftingData>,
    #[serde(default)]
    pub capital_cost: Vec<CapitalCostData>,
    #[serde(default)]
    pub intangible_cost: Vec<IntangibleData>,
    #[serde(default)]
    pub opex: Vec<OpexData>,
    #[serde(default)]
    pub asr_cost: Vec<AsrData>,
    #[serde(default)]
    pub lbt_cost: Vec<LbtData>,
    #[serde(default)]
    pub cost_of_sales: Vec<CostOfSalesData>,
}

/// Cost entities of a project, by category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectCosts {
    pub capital: Vec<CapitalCost>,
    pub intangible: Vec<Intangible>,
    pub opex: Vec<Opex>,
    pub asr: Vec<Asr>,
    pub lbt: Vec<Lbt>,
    pub cost_of_sales: Vec<CostOfSales>,
}

impl ProjectCosts {
    /// Add one item to its category
    pub fn push(&mut self, item: CostItem) {
        match item {
            CostItem::Capital(c) => self.capital.push(c),
            CostItem::Intangible(c) => self.intangible.push(c),
            CostItem::Opex(c) => self.opex.push(c),
            CostItem::Asr(c) => self.asr.push(c),
            CostItem::Lbt(c) => self.lbt.push(c),
            CostItem::CostOfSales(c) => self.cost_of_sales.push(c),
        }
    }

    /// Every item, category by category
    pub fn items(&self) -> Vec<CostItem> {
        let mut out = Vec::new();
        out.extend(self.capital.iter().cloned().map(CostItem::Capital));
        out.extend(self.intangible.iter().cloned().map(CostItem::Intangible));
        out.extend(self.opex.iter().cloned().map(CostItem::Opex));
        out.extend(self.asr.iter().cloned().map(CostItem::Asr));
        out.extend(self.lbt.iter().cloned().map(CostItem::Lbt));
        out.extend(self.cost_of_sales.iter().cloned().map(CostItem::CostOfSales));
        out
    }
}

/// How run arguments turn raw cost into expenditures
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenditureRates {
    /// Year inflation compounds from
    pub year_ref: i32,
    pub inflation_rate: Rate,
    pub inflation_applied_to: Option<InflationAppliedTo>,
    pub vat_rate: Rate,
    pub pdri_rate: Rate,
}

impl ExpenditureRates {
    pub fn none(year_ref: i32) -> Self {
        Self {
            year_ref,
            inflation_rate: Rate::default(),
            inflation_applied_to: None,
            vat_rate: Rate::default(),
            pdri_rate: Rate::default(),
        }
    }

    fn inflates_capex(&self) -> bool {
        matches!(
            self.inflation_applied_to,
            Some(InflationAppliedTo::Capex | InflationAppliedTo::CapexAndOpex)
        )
    }

    fn inflates_opex(&self) -> bool {
        matches!(
            self.inflation_applied_to,
            Some(InflationAppliedTo::Opex | InflationAppliedTo::CapexAndOpex)
        )
    }
}

/// Post-tax expenditures of one fluid on the project axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostArrays {
    pub capital: Vec<f64>,
    pub intangible: Vec<f64>,
    pub opex: Vec<f64>,
    pub asr: Vec<f64>,
    pub lbt: Vec<f64>,
    pub cost_of_sales: Vec<f64>,
    /// VAT and PDRI included in the amounts above
    pub indirect_tax: Vec<f64>,
}

impl CostArrays {
    /// Intangible, OPEX, ASR and LBT, plus cost of sales when `with_cost_of_sales`
    pub fn non_capital(&self, with_cost_of_sales: bool) -> Vec<f64> {
        let mut out = add_arrays(&add_arrays(&self.intangible, &self.opex), &add_arrays(&self.asr, &self.lbt));
        if with_cost_of_sales {
            out = add_arrays(&out, &self.cost_of_sales);
        }
        out
    }

    /// Every category summed
    pub fn total(&self) -> Vec<f64> {
        add_arrays(&self.capital, &self.non_capital(true))
    }
}

/// Revenue and expenditures of one fluid, after other revenue is folded in
#[derive(Debug, Clone, PartialEq)]
pub struct FluidBook {
    pub revenue: Vec<f64>,
    pub costs: CostArrays,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseProject {
    start_date: NaiveDate,
    end_date: NaiveDate,
    oil_onstream_date: NaiveDate,
    gas_onstream_date: NaiveDate,
    project_years: Vec<i32>,
    lifting: Vec<Lifting>,
    costs: ProjectCosts,
}

fn base_error(msg: String) -> FiscalError {
    FiscalError::BaseProject(msg)
}

impl BaseProject {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        oil_onstream_date: Option<NaiveDate>,
        gas_onstream_date: Option<NaiveDate>,
        lifting: Vec<Lifting>,
        costs: ProjectCosts,
    ) -> FiscalResult<Self> {
        if start_date > end_date {
            return Err(base_error(format!(
                "start date {start_date} is after the end date {end_date}"
            )));
        }
        let project_years: Vec<i32> = (start_date.year()..=end_date.year()).collect();
        let mut project = Self {
            start_date,
            end_date,
            oil_onstream_date: end_date,
            gas_onstream_date: end_date,
            project_years,
            lifting,
            costs,
        };

        for lifting in &project.lifting {
            project.check_range(&format!("{} lifting", lifting.fluid_type()), lifting.start_year(), lifting.end_year())?;
        }
        for item in project.costs.items() {
            project.check_item(&item)?;
        }

        project.oil_onstream_date = project.resolve_onstream(FluidType::Oil, oil_onstream_date)?;
        project.gas_onstream_date = project.resolve_onstream(FluidType::Gas, gas_onstream_date)?;
        Ok(project)
    }

    pub fn from_data(data: ProjectData) -> FiscalResult<Self> {
        let lifting = data
            .lifting
            .into_iter()
            .map(Lifting::from_data)
            .collect::<FiscalResult<Vec<_>>>()?;
        let costs = ProjectCosts {
            capital: data.capital_cost.into_iter().map(CapitalCost::from_data).collect::<FiscalResult<_>>()?,
            intangible: data.intangible_cost.into_iter().map(Intangible::from_data).collect::<FiscalResult<_>>()?,
            opex: data.opex.into_iter().map(Opex::from_data).collect::<FiscalResult<_>>()?,
            asr: data.asr_cost.into_iter().map(Asr::from_data).collect::<FiscalResult<_>>()?,
            lbt: data.lbt_cost.into_iter().map(Lbt::from_data).collect::<FiscalResult<_>>()?,
            cost_of_sales: data
                .cost_of_sales
                .into_iter()
                .map(CostOfSales::from_data)
                .collect::<FiscalResult<_>>()?,
        };
        Self::new(
            data.start_date,
            data.end_date,
            data.oil_onstream_date,
            data.gas_onstream_date,
            lifting,
            costs,
        )
    }

    fn check_range(&self, what: &str, start_year: i32, end_year: i32) -> FiscalResult<()> {
        if start_year < self.start_year() || end_year > self.end_year() {
            return Err(base_error(format!(
                "{what} ({start_year}..{end_year}) falls outside the project years ({}..{})",
                self.start_year(),
                self.end_year()
            )));
        }
        Ok(())
    }

    fn check_item(&self, item: &CostItem) -> FiscalResult<()> {
        let (start, end) = match item {
            CostItem::Capital(c) => (c.start_year(), c.end_year()),
            CostItem::Intangible(c) => (c.start_year(), c.end_year()),
            CostItem::Opex(c) => (c.start_year(), c.end_year()),
            CostItem::Asr(c) => (c.start_year(), c.end_year()),
            CostItem::Lbt(c) => (c.start_year(), c.end_year()),
            CostItem::CostOfSales(c) => (c.start_year(), c.end_year()),
        };
        self.check_range(item.category(), start, end)
    }

    /// Onstream defaults to 1 January of the first producing year, or the end
    /// date when the fluid never produces
    fn resolve_onstream(&self, fluid: FluidType, given: Option<NaiveDate>) -> FiscalResult<NaiveDate> {
        let revenue = self.revenue(fluid);
        let Some(first) = revenue.iter().position(|&r| r > 0.0) else {
            return Ok(self.end_date);
        };
        let first_year = self.project_years[first];
        match given {
            None => NaiveDate::from_ymd_opt(first_year, 1, 1)
                .ok_or_else(|| base_error(format!("invalid onstream year {first_year}"))),
            Some(date) => {
                let year = date.year();
                if year < self.start_year() || year > self.end_year() {
                    return Err(base_error(format!(
                        "{fluid} onstream year ({year}) is outside the project years ({}..{})",
                        self.start_year(),
                        self.end_year()
                    )));
                }
                if year != first_year {
                    return Err(base_error(format!(
                        "{fluid} onstream year ({year}) differs from its first producing year ({first_year})"
                    )));
                }
                Ok(date)
            }
        }
    }

    /// Same project with one more cost item
    pub fn with_cost(&self, item: CostItem) -> FiscalResult<Self> {
        self.check_item(&item)?;
        let mut next = self.clone();
        next.costs.push(item);
        Ok(next)
    }

    /// Same project with every schedule and cost passed through the given maps
    pub fn map_entities(
        &self,
        map_lifting: impl Fn(&Lifting) -> Lifting,
        map_cost: impl Fn(&CostItem) -> CostItem,
    ) -> FiscalResult<Self> {
        let mut costs = ProjectCosts::default();
        for item in self.costs.items() {
            costs.push(map_cost(&item));
        }
        Self::new(
            self.start_date,
            self.end_date,
            Some(self.oil_onstream_date),
            Some(self.gas_onstream_date),
            self.lifting.iter().map(map_lifting).collect(),
            costs,
        )
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn start_year(&self) -> i32 {
        self.start_date.year()
    }

    pub fn end_year(&self) -> i32 {
        self.end_date.year()
    }

    pub fn project_years(&self) -> &[i32] {
        &self.project_years
    }

    pub fn project_duration(&self) -> usize {
        self.project_years.len()
    }

    pub fn lifting(&self) -> &[Lifting] {
        &self.lifting
    }

    pub fn costs(&self) -> &ProjectCosts {
        &self.costs
    }

    pub fn onstream_date(&self, fluid: FluidType) -> NaiveDate {
        match fluid {
            FluidType::Gas => self.gas_onstream_date,
            _ => self.oil_onstream_date,
        }
    }

    fn to_axis(&self, values: &[f64], from_start: i32) -> Vec<f64> {
        reproject(values, from_start, self.start_year(), self.project_duration())
    }

    fn sum_lifting(&self, fluid: FluidType, f: impl Fn(&Lifting) -> Vec<f64>) -> Vec<f64> {
        self.lifting
            .iter()
            .filter(|l| l.fluid_type() == fluid)
            .fold(vec![0.0; self.project_duration()], |acc, l| {
                add_arrays(&acc, &self.to_axis(&f(l), l.start_year()))
            })
    }

    pub fn revenue(&self, fluid: FluidType) -> Vec<f64> {
        self.sum_lifting(fluid, Lifting::revenue)
    }

    pub fn lifting_volume(&self, fluid: FluidType) -> Vec<f64> {
        self.sum_lifting(fluid, Lifting::lifting_rate_arr)
    }

    pub fn production_volume(&self, fluid: FluidType) -> Vec<f64> {
        self.sum_lifting(fluid, Lifting::prod_rate_arr)
    }

    /// Lifting-weighted price over every schedule of `fluid`
    pub fn wap_price(&self, fluid: FluidType) -> Vec<f64> {
        let (volumes, prices): (Vec<_>, Vec<_>) = self
            .lifting
            .iter()
            .filter(|l| l.fluid_type() == fluid)
            .map(|l| {
                (
                    self.to_axis(&l.lifting_rate_arr(), l.start_year()),
                    self.to_axis(&l.price_arr(), l.start_year()),
                )
            })
            .unzip();
        weighted_average_price(&volumes, &prices, self.project_duration())
    }

    /// Oil and gas, counted when they have any revenue
    pub fn producing_fluids(&self) -> usize {
        [FluidType::Oil, FluidType::Gas]
            .iter()
            .filter(|&&f| self.revenue(f).iter().any(|&r| r > 0.0))
            .count()
    }

    fn on_axis<T: CostEntity>(&self, entities: &[T], fluid: FluidType) -> FiscalResult<Option<T>> {
        Ok(combine_same_fluid(entities, fluid)?.map(|e| e.widen(self.start_year(), self.end_year())))
    }

    pub fn capital(&self, fluid: FluidType) -> FiscalResult<Option<CapitalCost>> {
        self.on_axis(&self.costs.capital, fluid)
    }

    fn fiscal_rates(&self, rates: &ExpenditureRates, inflate: bool) -> FiscalRates {
        let base = FiscalRates {
            axis_start: self.start_year(),
            axis_duration: self.project_duration(),
            year_ref: Some(rates.year_ref),
            inflation_rate: rates.inflation_rate.clone(),
            vat_rate: rates.vat_rate.clone(),
            pdri_rate: rates.pdri_rate.clone(),
        };
        if inflate {
            base
        } else {
            base.without_inflation()
        }
    }

    fn post_tax<T: CostEntity>(
        &self,
        entities: &[T],
        fluid: FluidType,
        rates: &FiscalRates,
    ) -> FiscalResult<(Vec<f64>, Vec<f64>)> {
        let zeros = vec![0.0; self.project_duration()];
        match self.on_axis(entities, fluid)? {
            None => Ok((zeros.clone(), zeros)),
            Some(entity) => Ok((entity.expenditures_post_tax(rates)?, entity.indirect_taxes(rates)?)),
        }
    }

    /// Post-tax expenditures of every category for `fluid`
    pub fn cost_arrays(&self, fluid: FluidType, rates: &ExpenditureRates) -> FiscalResult<CostArrays> {
        let capex_rates = self.fiscal_rates(rates, rates.inflates_capex());
        let opex_rates = self.fiscal_rates(rates, rates.inflates_opex());
        let flat_rates = self.fiscal_rates(rates, false);

        let (capital, t1) = self.post_tax(&self.costs.capital, fluid, &capex_rates)?;
        let (intangible, t2) = self.post_tax(&self.costs.intangible, fluid, &capex_rates)?;
        let (opex, t3) = self.post_tax(&self.costs.opex, fluid, &opex_rates)?;
        let (asr, t4) = self.post_tax(&self.costs.asr, fluid, &flat_rates)?;
        let (lbt, t5) = self.post_tax(&self.costs.lbt, fluid, &flat_rates)?;
        let (cost_of_sales, t6) = self.post_tax(&self.costs.cost_of_sales, fluid, &flat_rates)?;

        let indirect_tax = [t2, t3, t4, t5, t6].iter().fold(t1, |acc, t| add_arrays(&acc, t));
        Ok(CostArrays {
            capital,
            intangible,
            opex,
            asr,
            lbt,
            cost_of_sales,
            indirect_tax,
        })
    }

    /// Revenue and cost arrays of oil or gas, with sulfur, electricity and CO2
    /// revenue booked where `targets` sends them
    pub fn fluid_book(
        &self,
        fluid: FluidType,
        targets: &OtherRevenueTargets,
        rates: &ExpenditureRates,
    ) -> FiscalResult<FluidBook> {
        let (to_revenue, to_opex) = match fluid {
            FluidType::Oil => (OtherRevenue::AdditionToOilRevenue, OtherRevenue::ReductionToOilOpex),
            FluidType::Gas => (OtherRevenue::AdditionToGasRevenue, OtherRevenue::ReductionToGasOpex),
            other => {
                return Err(FiscalError::Contract(format!("{other} has no fiscal book of its own")));
            }
        };
        let mut revenue = self.revenue(fluid);
        let mut costs = self.cost_arrays(fluid, rates)?;
        for (aux, target) in [
            (FluidType::Sulfur, targets.sulfur),
            (FluidType::Electricity, targets.electricity),
            (FluidType::Co2, targets.co2),
        ] {
            if target == to_revenue {
                revenue = add_arrays(&revenue, &self.revenue(aux));
            } else if target == to_opex {
                costs.opex = sub_arrays(&costs.opex, &self.revenue(aux));
            }
        }
        Ok(FluidBook { revenue, costs })
    }

    /// Depreciation of `fluid` capital on the project axis, plus the amount left undepreciated
    pub fn depreciation(
        &self,
        fluid: FluidType,
        method: DeprMethod,
        decline_factor: f64,
        rates: &ExpenditureRates,
    ) -> FiscalResult<(Vec<f64>, f64)> {
        match self.capital(fluid)? {
            None => Ok((vec![0.0; self.project_duration()], 0.0)),
            Some(capital) => {
                capital.total_depreciation_rate(method, decline_factor, &self.fiscal_rates(rates, rates.inflates_capex()))
            }
        }
    }

    /// Intangible cost of `fluid` amortized straight-line over `years` from its expense year
    pub fn amortized_intangible(&self, fluid: FluidType, years: f64, rates: &ExpenditureRates) -> FiscalResult<Vec<f64>> {
        let Some(intangible) = self.on_axis(&self.costs.intangible, fluid)? else {
            return Ok(vec![0.0; self.project_duration()]);
        };
        let spend = intangible.expenditures_post_tax(&self.fiscal_rates(rates, rates.inflates_capex()))?;
        let mut out = vec![0.0; self.project_duration()];
        for (i, amount) in spend.iter().enumerate() {
            let charges = crate::econ::depreciation::straight_line(*amount, 0.0, years);
            for (k, charge) in charges.iter().enumerate() {
                if let Some(slot) = out.get_mut(i + k) {
                    *slot += charge;
                }
            }
        }
        Ok(out)
    }

    /// Spend up to and including `reference_year`.
    ///
    /// Zero when the reference year is the start year. The reference year may
    /// not precede the start, follow the end, or follow either onstream year.
    pub fn sunk_cost(&self, reference_year: i32, spend: &[f64]) -> FiscalResult<f64> {
        if reference_year < self.start_year() {
            return Err(FiscalError::Contract(format!(
                "sunk cost reference year ({reference_year}) is before the start year ({})",
                self.start_year()
            )));
        }
        if reference_year > self.end_year() {
            return Err(FiscalError::Contract(format!(
                "sunk cost reference year ({reference_year}) is after the end year ({})",
                self.end_year()
            )));
        }
        for fluid in [FluidType::Oil, FluidType::Gas] {
            let onstream = self.onstream_date(fluid).year();
            if reference_year > onstream {
                return Err(FiscalError::Contract(format!(
                    "sunk cost reference year ({reference_year}) is after the {fluid} onstream year ({onstream})"
                )));
            }
        }
        if reference_year == self.start_year() {
            log::warn!("sunk cost reference year equals the start year; no sunk cost is reported");
            return Ok(0.0);
        }
        let upto = (reference_year - self.start_year()) as usize;
        Ok(spend.iter().take(upto + 1).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn project() -> BaseProject {
        let oil = Lifting::new(2021, 2024, vec![2022, 2023], vec![10.0, 20.0], vec![50.0, 60.0], FluidType::Oil).unwrap();
        let oil2 = Lifting::new(2022, 2025, vec![2023], vec![10.0], vec![90.0], FluidType::Oil).unwrap();
        let gas = Lifting::new(2020, 2025, vec![2024], vec![5.0], vec![6.0], FluidType::Gas).unwrap();
        let costs = ProjectCosts {
            capital: vec![CapitalCost::new(2020, 2025, vec![2020, 2021], vec![100.0, 50.0], vec![FluidType::Oil, FluidType::Gas]).unwrap()],
            opex: vec![Opex::new(2022, 2025, vec![2022, 2023], vec![5.0, 5.0], vec![FluidType::Oil; 2]).unwrap()],
            ..Default::default()
        };
        BaseProject::new(date(2020), date(2025), None, None, vec![oil, oil2, gas], costs).unwrap()
    }

    #[test]
    fn test_project_axis_and_revenue() {
        let p = project();
        assert_eq!(p.project_years(), &[2020, 2021, 2022, 2023, 2024, 2025]);
        assert_eq!(p.revenue(FluidType::Oil), vec![0.0, 0.0, 500.0, 2100.0, 0.0, 0.0]);
        assert_eq!(p.revenue(FluidType::Gas), vec![0.0, 0.0, 0.0, 0.0, 30.0, 0.0]);
        assert_eq!(p.producing_fluids(), 2);
    }

    #[test]
    fn test_onstream_defaults_to_first_producing_year() {
        let p = project();
        assert_eq!(p.onstream_date(FluidType::Oil), date(2022));
        assert_eq!(p.onstream_date(FluidType::Gas), date(2024));
    }

    #[test]
    fn test_onstream_must_match_first_production() {
        let p = project();
        let err = BaseProject::new(
            date(2020),
            date(2025),
            Some(date(2023)),
            None,
            p.lifting().to_vec(),
            p.costs().clone(),
        )
        .unwrap_err();
        assert!(matches!(err, FiscalError::BaseProject(_)));
    }

    #[test]
    fn test_entity_outside_project_rejected() {
        let oil = Lifting::new(2019, 2022, vec![2020], vec![1.0], vec![1.0], FluidType::Oil).unwrap();
        let err = BaseProject::new(date(2020), date(2025), None, None, vec![oil], ProjectCosts::default()).unwrap_err();
        assert!(matches!(err, FiscalError::BaseProject(_)));
    }

    #[test]
    fn test_wap_price() {
        let p = project();
        let wap = p.wap_price(FluidType::Oil);
        assert_relative_eq!(wap[2], 50.0);
        assert_relative_eq!(wap[3], 70.0);
        assert_relative_eq!(wap[0], 0.0);
    }

    #[test]
    fn test_cost_arrays_per_fluid_on_project_axis() {
        let p = project();
        let oil = p.cost_arrays(FluidType::Oil, &ExpenditureRates::none(2020)).unwrap();
        assert_eq!(oil.capital, vec![100.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(oil.opex, vec![0.0, 0.0, 5.0, 5.0, 0.0, 0.0]);
        let gas = p.cost_arrays(FluidType::Gas, &ExpenditureRates::none(2020)).unwrap();
        assert_eq!(gas.capital, vec![0.0, 50.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(gas.opex, vec![0.0; 6]);
    }

    #[test]
    fn test_inflation_target_selects_categories() {
        let p = project();
        let rates = ExpenditureRates {
            inflation_rate: 0.1.into(),
            inflation_applied_to: Some(InflationAppliedTo::Opex),
            ..ExpenditureRates::none(2020)
        };
        let oil = p.cost_arrays(FluidType::Oil, &rates).unwrap();
        assert_relative_eq!(oil.capital[0], 100.0);
        assert_relative_eq!(oil.opex[2], 5.0 * 1.1_f64.powi(2), epsilon = 1e-9);
    }

    #[test]
    fn test_sunk_cost_rules() {
        let p = project();
        let spend = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        assert_relative_eq!(p.sunk_cost(2021, &spend).unwrap(), 30.0);
        assert_relative_eq!(p.sunk_cost(2020, &spend).unwrap(), 0.0);
        assert!(matches!(p.sunk_cost(2019, &spend), Err(FiscalError::Contract(_))));
        assert!(matches!(p.sunk_cost(2026, &spend), Err(FiscalError::Contract(_))));
        // After the oil onstream year
        assert!(matches!(p.sunk_cost(2023, &spend), Err(FiscalError::Contract(_))));
    }

    #[test]
    fn test_with_cost_adds_item() {
        let p = project();
        let extra = Intangible::new(2020, 2025, vec![2025], vec![7.0], vec![FluidType::Gas]).unwrap();
        let next = p.with_cost(CostItem::Intangible(extra)).unwrap();
        let gas = next.cost_arrays(FluidType::Gas, &ExpenditureRates::none(2020)).unwrap();
        assert_eq!(gas.intangible[5], 7.0);
        assert_eq!(p.costs().intangible.len(), 0);
    }

    #[test]
    fn test_other_revenue_routing() {
        let sulfur = Lifting::new(2020, 2025, vec![2023], vec![2.0], vec![10.0], FluidType::Sulfur).unwrap();
        let power = Lifting::new(2020, 2025, vec![2022], vec![1.0], vec![3.0], FluidType::Electricity).unwrap();
        let base = project();
        let mut lifting = base.lifting().to_vec();
        lifting.extend([sulfur, power]);
        let p = BaseProject::new(date(2020), date(2025), None, None, lifting, base.costs().clone()).unwrap();
        let targets = OtherRevenueTargets {
            sulfur: OtherRevenue::AdditionToOilRevenue,
            electricity: OtherRevenue::ReductionToOilOpex,
            co2: OtherRevenue::AdditionToGasRevenue,
        };
        let rates = ExpenditureRates::none(2020);
        let oil = p.fluid_book(FluidType::Oil, &targets, &rates).unwrap();
        assert_eq!(oil.revenue, vec![0.0, 0.0, 500.0, 2120.0, 0.0, 0.0]);
        assert_eq!(oil.costs.opex, vec![0.0, 0.0, 2.0, 5.0, 0.0, 0.0]);
        let gas = p.fluid_book(FluidType::Gas, &targets, &rates).unwrap();
        assert_eq!(gas.revenue, p.revenue(FluidType::Gas));
        assert!(p.fluid_book(FluidType::Sulfur, &targets, &rates).is_err());
    }

    #[test]
    fn test_non_capital_with_cost_of_sales() {
        let arrays = CostArrays {
            capital: vec![1.0],
            intangible: vec![2.0],
            opex: vec![3.0],
            asr: vec![4.0],
            lbt: vec![5.0],
            cost_of_sales: vec![6.0],
            indirect_tax: vec![0.0],
        };
        assert_eq!(arrays.non_capital(false), vec![14.0]);
        assert_eq!(arrays.non_capital(true), vec![20.0]);
        assert_eq!(arrays.total(), vec![21.0]);
    }

    #[test]
    fn test_amortized_intangible_spreads_cost() {
        let p = project()
            .with_cost(CostItem::Intangible(
                Intangible::new(2020, 2025, vec![2022], vec![50.0], vec![FluidType::Oil]).unwrap(),
            ))
            .unwrap();
        let amort = p.amortized_intangible(FluidType::Oil, 5.0, &ExpenditureRates::none(2020)).unwrap();
        assert_eq!(amort, vec![0.0, 0.0, 10.0, 10.0, 10.0, 10.0]);
    }
}

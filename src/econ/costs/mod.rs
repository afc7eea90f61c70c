//! Cost entities
//!
//! Every cost category wraps a [`CostElements`] table: co-indexed arrays of
//! expense year, cost, fluid allocation, description and tax treatment. The
//! [`CostEntity`] trait supplies the shared transforms (dense projection,
//! inflation and indirect tax, merging and scaling). [`CostItem`] is the
//! closed set of categories used wherever a cost of any kind is passed around.

mod asr;
mod capital;
mod intangible;
mod lbt;
mod opex;

pub use asr::{Asr, AsrData};
pub use capital::{CapitalCost, CapitalCostData};
pub use intangible::{CostOfSales, CostOfSalesData, Intangible, IntangibleData};
pub use lbt::{Lbt, LbtData};
pub use opex::{Opex, OpexData};

use serde::{Deserialize, Serialize};

use crate::econ::helper::{
    apply_cost_modification, apply_inflation, dense_projection, get_identifier, get_instances,
    CostModification, Rate,
};
use crate::econ::selection::FluidType;
use crate::error::{EntityError, FiscalError, FiscalResult};

/// Per-element tax treatment, each field scalar or one value per element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementTax {
    pub vat_portion: Rate,
    pub vat_discount: Rate,
    pub pdri_portion: Rate,
    pub pdri_discount: Rate,
    pub lbt_discount: Rate,
    pub pdrd_discount: Rate,
}

/// Rates applied when turning raw cost into expenditures.
///
/// Array rates are indexed by calendar year on the axis starting at
/// `axis_start`; each element picks the value of its own expense year.
#[derive(Debug, Clone, PartialEq)]
pub struct FiscalRates {
    pub axis_start: i32,
    pub axis_duration: usize,
    /// Year inflation compounds from; defaults to the entity's start year
    pub year_ref: Option<i32>,
    pub inflation_rate: Rate,
    pub vat_rate: Rate,
    pub pdri_rate: Rate,
}

impl FiscalRates {
    /// No inflation and no indirect tax
    pub fn none(axis_start: i32, axis_duration: usize) -> Self {
        Self {
            axis_start,
            axis_duration,
            year_ref: None,
            inflation_rate: Rate::default(),
            vat_rate: Rate::default(),
            pdri_rate: Rate::default(),
        }
    }

    /// Same rates with inflation switched off
    pub fn without_inflation(&self) -> Self {
        Self {
            inflation_rate: Rate::default(),
            ..self.clone()
        }
    }
}

/// Spread each amount evenly over `expense_year..=final_year` on the axis from `start_year`
pub(crate) fn distribute_to_final_year(
    start_year: i32,
    duration: usize,
    expense_year: &[i32],
    final_year: &[i32],
    amounts: &[f64],
) -> Vec<f64> {
    let mut out = vec![0.0; duration];
    for ((&from, &to), &amount) in expense_year.iter().zip(final_year).zip(amounts) {
        let span = (to - from + 1).max(1);
        let share = amount / span as f64;
        for year in from..from + span {
            let idx = year - start_year;
            if idx >= 0 && (idx as usize) < duration {
                out[idx as usize] += share;
            }
        }
    }
    out
}

/// Check `final_year` against the expense years and the entity's end year
pub(crate) fn check_final_year(elements: &CostElements, final_year: &[i32]) -> Result<(), EntityError> {
    for (&fy, &ey) in final_year.iter().zip(elements.expense_year()) {
        if fy < ey || fy > elements.end_year() {
            return Err(EntityError::YearOutOfRange {
                field: "final_year",
                year: fy,
                start_year: ey,
                end_year: elements.end_year(),
            });
        }
    }
    Ok(())
}

/// Co-indexed element arrays shared by every cost category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostElements {
    start_year: i32,
    end_year: i32,
    expense_year: Vec<i32>,
    cost: Vec<f64>,
    cost_allocation: Vec<FluidType>,
    description: Vec<String>,
    vat_portion: Vec<f64>,
    vat_discount: Vec<f64>,
    pdri_portion: Vec<f64>,
    pdri_discount: Vec<f64>,
    lbt_discount: Vec<f64>,
    pdrd_discount: Vec<f64>,
}

fn broadcast(name: &'static str, value: &Rate, len: usize) -> Result<Vec<f64>, EntityError> {
    let values = match value {
        Rate::Scalar(v) => vec![*v; len],
        Rate::PerYear(vs) if vs.len() == len => vs.clone(),
        Rate::PerYear(vs) => {
            return Err(EntityError::LengthMismatch {
                lengths: vec![("cost", len), (name, vs.len())],
            })
        }
    };
    if let Some(bad) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
        return Err(EntityError::PortionOutOfRange { field: name, value: *bad });
    }
    Ok(values)
}

/// Fail with every length listed when co-indexed arrays disagree
pub(crate) fn check_lengths(lengths: &[(&'static str, usize)]) -> Result<(), EntityError> {
    if lengths.windows(2).any(|w| w[0].1 != w[1].1) {
        return Err(EntityError::LengthMismatch {
            lengths: lengths.to_vec(),
        });
    }
    Ok(())
}

impl CostElements {
    pub fn new(
        start_year: i32,
        end_year: i32,
        expense_year: Vec<i32>,
        cost: Vec<f64>,
        cost_allocation: Vec<FluidType>,
        description: Option<Vec<String>>,
        tax: &ElementTax,
    ) -> Result<Self, EntityError> {
        if start_year > end_year {
            return Err(EntityError::InvertedYears { start_year, end_year });
        }

        let n = cost.len();
        let mut lengths = vec![
            ("cost", n),
            ("expense_year", expense_year.len()),
            ("cost_allocation", cost_allocation.len()),
        ];
        if let Some(d) = &description {
            lengths.push(("description", d.len()));
        }
        check_lengths(&lengths)?;

        if let Some(&year) = expense_year.iter().find(|&&y| y < start_year || y > end_year) {
            return Err(EntityError::YearOutOfRange {
                field: "expense_year",
                year,
                start_year,
                end_year,
            });
        }

        Ok(Self {
            start_year,
            end_year,
            expense_year,
            cost,
            cost_allocation,
            description: description.unwrap_or_else(|| vec![" ".to_string(); n]),
            vat_portion: broadcast("vat_portion", &tax.vat_portion, n)?,
            vat_discount: broadcast("vat_discount", &tax.vat_discount, n)?,
            pdri_portion: broadcast("pdri_portion", &tax.pdri_portion, n)?,
            pdri_discount: broadcast("pdri_discount", &tax.pdri_discount, n)?,
            lbt_discount: broadcast("lbt_discount", &tax.lbt_discount, n)?,
            pdrd_discount: broadcast("pdrd_discount", &tax.pdrd_discount, n)?,
        })
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    pub fn project_duration(&self) -> usize {
        (self.end_year - self.start_year + 1) as usize
    }

    pub fn expense_year(&self) -> &[i32] {
        &self.expense_year
    }

    pub fn cost(&self) -> &[f64] {
        &self.cost
    }

    pub fn cost_allocation(&self) -> &[FluidType] {
        &self.cost_allocation
    }

    pub fn description(&self) -> &[String] {
        &self.description
    }

    pub fn len(&self) -> usize {
        self.cost.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cost.is_empty()
    }

    /// Elements concatenated onto the union of both year ranges
    pub(crate) fn merged(&self, other: &Self) -> Self {
        fn cat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            a.iter().chain(b).cloned().collect()
        }
        Self {
            start_year: self.start_year.min(other.start_year),
            end_year: self.end_year.max(other.end_year),
            expense_year: cat(&self.expense_year, &other.expense_year),
            cost: cat(&self.cost, &other.cost),
            cost_allocation: cat(&self.cost_allocation, &other.cost_allocation),
            description: cat(&self.description, &other.description),
            vat_portion: cat(&self.vat_portion, &other.vat_portion),
            vat_discount: cat(&self.vat_discount, &other.vat_discount),
            pdri_portion: cat(&self.pdri_portion, &other.pdri_portion),
            pdri_discount: cat(&self.pdri_discount, &other.pdri_discount),
            lbt_discount: cat(&self.lbt_discount, &other.lbt_discount),
            pdrd_discount: cat(&self.pdrd_discount, &other.pdrd_discount),
        }
    }

    pub(crate) fn selected(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(v: &[T], idx: &[usize]) -> Vec<T> {
            idx.iter().map(|&i| v[i].clone()).collect()
        }
        Self {
            start_year: self.start_year,
            end_year: self.end_year,
            expense_year: pick(&self.expense_year, indices),
            cost: pick(&self.cost, indices),
            cost_allocation: pick(&self.cost_allocation, indices),
            description: pick(&self.description, indices),
            vat_portion: pick(&self.vat_portion, indices),
            vat_discount: pick(&self.vat_discount, indices),
            pdri_portion: pick(&self.pdri_portion, indices),
            pdri_discount: pick(&self.pdri_discount, indices),
            lbt_discount: pick(&self.lbt_discount, indices),
            pdrd_discount: pick(&self.pdrd_discount, indices),
        }
    }

    pub(crate) fn with_cost(&self, cost: Vec<f64>) -> Self {
        Self {
            cost,
            ..self.clone()
        }
    }

    /// Widen the year range, keeping every element
    pub(crate) fn with_years(&self, start_year: i32, end_year: i32) -> Self {
        Self {
            start_year: self.start_year.min(start_year),
            end_year: self.end_year.max(end_year),
            ..self.clone()
        }
    }

    fn base_year(&self, rates: &FiscalRates) -> i32 {
        rates.year_ref.unwrap_or(self.start_year)
    }

    /// Per-element cost after inflation only
    pub fn element_cost_pre_tax(&self, rates: &FiscalRates) -> FiscalResult<Vec<f64>> {
        let inflation = rates.inflation_rate.at_years(
            "inflation_rate",
            rates.axis_start,
            rates.axis_duration,
            &self.expense_year,
        )?;
        apply_inflation(
            self.base_year(rates),
            &self.cost,
            &self.expense_year,
            &Rate::PerYear(inflation),
        )
    }

    /// Per-element cost after inflation and indirect taxes
    pub fn element_cost_post_tax(&self, rates: &FiscalRates) -> FiscalResult<Vec<f64>> {
        let at = |name: &'static str, rate: &Rate| {
            rate.at_years(name, rates.axis_start, rates.axis_duration, &self.expense_year)
                .map(Rate::PerYear)
        };
        let params = CostModification {
            inflation_rate: at("inflation_rate", &rates.inflation_rate)?,
            vat_portion: Rate::PerYear(self.vat_portion.clone()),
            vat_rate: at("vat_rate", &rates.vat_rate)?,
            vat_discount: Rate::PerYear(self.vat_discount.clone()),
            pdri_portion: Rate::PerYear(self.pdri_portion.clone()),
            pdri_rate: at("pdri_rate", &rates.pdri_rate)?,
            pdri_discount: Rate::PerYear(self.pdri_discount.clone()),
            lbt_discount: Rate::PerYear(self.lbt_discount.clone()),
            pdrd_discount: Rate::PerYear(self.pdrd_discount.clone()),
        };
        apply_cost_modification(self.base_year(rates), &self.cost, &self.expense_year, &params)
    }

    /// Element indices grouped by shared tax signature and fluid allocation
    pub fn tax_groups(&self) -> Vec<Vec<usize>> {
        get_instances(&get_identifier(
            &self.vat_portion,
            &self.pdri_portion,
            &self.cost_allocation,
        ))
    }
}

/// Behaviour shared by every cost category
pub trait CostEntity: Sized + Clone {
    const CATEGORY: &'static str;

    fn elements(&self) -> &CostElements;

    /// Tag a validation failure with this category
    fn wrap(err: EntityError) -> FiscalError;

    /// Merge two entities of this category onto the union of their year ranges
    fn combine(&self, other: &Self) -> FiscalResult<Self>;

    /// Keep only the elements at `indices`
    fn select(&self, indices: &[usize]) -> Self;

    /// Apply `f` to every monetary input of the elements
    fn map_cost(&self, f: impl Fn(f64) -> f64) -> Self;

    /// Widen the entity's own year range to cover `start_year..=end_year`
    fn widen(&self, start_year: i32, end_year: i32) -> Self;

    /// Place per-element amounts onto the entity's own year axis
    fn project_elements(&self, amounts: &[f64]) -> Vec<f64> {
        let el = self.elements();
        dense_projection(el.start_year, el.project_duration(), &el.expense_year, amounts)
    }

    fn start_year(&self) -> i32 {
        self.elements().start_year
    }

    fn end_year(&self) -> i32 {
        self.elements().end_year
    }

    fn scale(&self, factor: f64) -> Self {
        self.map_cost(|c| c * factor)
    }

    fn divide(&self, divisor: f64) -> FiscalResult<Self> {
        if divisor == 0.0 {
            return Err(Self::wrap(EntityError::DivisionByZero {
                context: Self::CATEGORY,
            }));
        }
        Ok(self.map_cost(|c| c / divisor))
    }

    /// Ratio of total raw cost between two entities of this category
    fn cost_ratio(&self, other: &Self) -> FiscalResult<f64> {
        let denom: f64 = other.elements().cost.iter().sum();
        if denom == 0.0 {
            return Err(Self::wrap(EntityError::DivisionByZero {
                context: Self::CATEGORY,
            }));
        }
        Ok(self.elements().cost.iter().sum::<f64>() / denom)
    }

    /// Elements allocated to `fluid`
    fn for_fluid(&self, fluid: FluidType) -> Self {
        let idx: Vec<usize> = self
            .elements()
            .cost_allocation
            .iter()
            .enumerate()
            .filter(|(_, f)| **f == fluid)
            .map(|(i, _)| i)
            .collect();
        self.select(&idx)
    }

    /// One sub-entity per tax signature bucket
    fn tax_buckets(&self) -> Vec<Self> {
        self.elements()
            .tax_groups()
            .iter()
            .map(|idx| self.select(idx))
            .collect()
    }

    /// Raw cost on the entity's own axis
    fn expenditures(&self) -> Vec<f64> {
        self.project_elements(&self.elements().cost)
    }

    fn expenditures_pre_tax(&self, rates: &FiscalRates) -> FiscalResult<Vec<f64>> {
        Ok(self.project_elements(&self.elements().element_cost_pre_tax(rates)?))
    }

    /// Taxed bucket by bucket, then summed onto the entity's own axis
    fn expenditures_post_tax(&self, rates: &FiscalRates) -> FiscalResult<Vec<f64>> {
        let mut total = vec![0.0; self.elements().project_duration()];
        for bucket in self.tax_buckets() {
            let taxed = bucket.elements().element_cost_post_tax(rates)?;
            for (t, v) in total.iter_mut().zip(bucket.project_elements(&taxed)) {
                *t += v;
            }
        }
        Ok(total)
    }

    fn indirect_taxes(&self, rates: &FiscalRates) -> FiscalResult<Vec<f64>> {
        let pre = self.expenditures_pre_tax(rates)?;
        let post = self.expenditures_post_tax(rates)?;
        Ok(post.iter().zip(&pre).map(|(a, b)| a - b).collect())
    }
}

/// Merge a slice of same-category entities, keeping only `fluid` elements.
/// Returns `None` when nothing is allocated to `fluid`.
pub fn combine_same_fluid<T: CostEntity>(entities: &[T], fluid: FluidType) -> FiscalResult<Option<T>> {
    let mut merged: Option<T> = None;
    for entity in entities {
        let part = entity.for_fluid(fluid);
        merged = Some(match merged {
            None => part,
            Some(acc) => acc.combine(&part)?,
        });
    }
    Ok(merged)
}

/// A cost of any category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CostItem {
    Capital(CapitalCost),
    Intangible(Intangible),
    Opex(Opex),
    Asr(Asr),
    Lbt(Lbt),
    CostOfSales(CostOfSales),
}

impl CostItem {
    pub fn category(&self) -> &'static str {
        match self {
            CostItem::Capital(_) => CapitalCost::CATEGORY,
            CostItem::Intangible(_) => Intangible::CATEGORY,
            CostItem::Opex(_) => Opex::CATEGORY,
            CostItem::Asr(_) => Asr::CATEGORY,
            CostItem::Lbt(_) => Lbt::CATEGORY,
            CostItem::CostOfSales(_) => CostOfSales::CATEGORY,
        }
    }

    fn wrap(&self, err: EntityError) -> FiscalError {
        match self {
            CostItem::Capital(_) => CapitalCost::wrap(err),
            CostItem::Intangible(_) => Intangible::wrap(err),
            CostItem::Opex(_) => Opex::wrap(err),
            CostItem::Asr(_) => Asr::wrap(err),
            CostItem::Lbt(_) => Lbt::wrap(err),
            CostItem::CostOfSales(_) => CostOfSales::wrap(err),
        }
    }

    fn mismatch(&self, other: &CostItem) -> FiscalError {
        self.wrap(EntityError::IncompatibleMerge {
            left: self.category(),
            right: other.category(),
        })
    }

    /// Merge two items of the same category; a different category is an error
    /// tagged with the left operand's category.
    pub fn combine(&self, other: &CostItem) -> FiscalResult<CostItem> {
        Ok(match (self, other) {
            (CostItem::Capital(a), CostItem::Capital(b)) => CostItem::Capital(a.combine(b)?),
            (CostItem::Intangible(a), CostItem::Intangible(b)) => CostItem::Intangible(a.combine(b)?),
            (CostItem::Opex(a), CostItem::Opex(b)) => CostItem::Opex(a.combine(b)?),
            (CostItem::Asr(a), CostItem::Asr(b)) => CostItem::Asr(a.combine(b)?),
            (CostItem::Lbt(a), CostItem::Lbt(b)) => CostItem::Lbt(a.combine(b)?),
            (CostItem::CostOfSales(a), CostItem::CostOfSales(b)) => CostItem::CostOfSales(a.combine(b)?),
            (a, b) => return Err(a.mismatch(b)),
        })
    }

    /// Negate the other item's cost and merge
    pub fn subtract(&self, other: &CostItem) -> FiscalResult<CostItem> {
        self.combine(&other.scale(-1.0))
    }

    pub fn scale(&self, factor: f64) -> CostItem {
        match self {
            CostItem::Capital(a) => CostItem::Capital(a.scale(factor)),
            CostItem::Intangible(a) => CostItem::Intangible(a.scale(factor)),
            CostItem::Opex(a) => CostItem::Opex(a.scale(factor)),
            CostItem::Asr(a) => CostItem::Asr(a.scale(factor)),
            CostItem::Lbt(a) => CostItem::Lbt(a.scale(factor)),
            CostItem::CostOfSales(a) => CostItem::CostOfSales(a.scale(factor)),
        }
    }

    pub fn divide(&self, divisor: f64) -> FiscalResult<CostItem> {
        if divisor == 0.0 {
            return Err(self.wrap(EntityError::DivisionByZero {
                context: self.category(),
            }));
        }
        Ok(self.scale(1.0 / divisor))
    }

    /// Ratio of total cost; both items must share a category
    pub fn cost_ratio(&self, other: &CostItem) -> FiscalResult<f64> {
        match (self, other) {
            (CostItem::Capital(a), CostItem::Capital(b)) => a.cost_ratio(b),
            (CostItem::Intangible(a), CostItem::Intangible(b)) => a.cost_ratio(b),
            (CostItem::Opex(a), CostItem::Opex(b)) => a.cost_ratio(b),
            (CostItem::Asr(a), CostItem::Asr(b)) => a.cost_ratio(b),
            (CostItem::Lbt(a), CostItem::Lbt(b)) => a.cost_ratio(b),
            (CostItem::CostOfSales(a), CostItem::CostOfSales(b)) => a.cost_ratio(b),
            (a, b) => Err(a.mismatch(b)),
        }
    }

    pub fn expenditures(&self) -> Vec<f64> {
        match self {
            CostItem::Capital(a) => a.expenditures(),
            CostItem::Intangible(a) => a.expenditures(),
            CostItem::Opex(a) => a.expenditures(),
            CostItem::Asr(a) => a.expenditures(),
            CostItem::Lbt(a) => a.expenditures(),
            CostItem::CostOfSales(a) => a.expenditures(),
        }
    }
}

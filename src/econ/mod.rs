//! Economic building blocks: selectors, cost and lifting entities, depreciation,
//! indicators and the economic limit

pub mod costs;
pub mod depreciation;
pub mod helper;
pub mod indicator;
pub mod limit;
pub mod revenue;
pub mod selection;

pub use costs::{
    combine_same_fluid, Asr, CapitalCost, CostEntity, CostItem, CostOfSales, ElementTax, FiscalRates,
    Intangible, Lbt, Opex,
};
pub use helper::Rate;
pub use revenue::Lifting;

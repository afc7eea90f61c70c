//! Gross Split lookup tables
//!
//! The variable split is a sum of per-attribute adjustments read from a
//! static table; the progressive split is a step or slope function of price
//! and cumulative production. Regulations 20/2019 and 12/2020 kept the
//! 52/2017 tables.

use serde::{Deserialize, Serialize};

use crate::econ::selection::{
    ApiGravity, Co2Content, DomesticUse, FieldLocation, FieldStatus, FluidType, GrossSplitRegime, H2sContent,
    InfrastructureAvailability, ProductionStage, ReservoirDepth, ReservoirType,
};

pub const BASE_SPLIT_CTR_OIL: f64 = 0.43;
pub const BASE_SPLIT_CTR_GAS: f64 = 0.48;

/// Field attributes that set the variable split
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldAttributes {
    pub field_status: FieldStatus,
    pub field_location: FieldLocation,
    pub reservoir_depth: ReservoirDepth,
    pub infrastructure: InfrastructureAvailability,
    pub reservoir_type: ReservoirType,
    pub api_oil: ApiGravity,
    pub domestic_use: DomesticUse,
    pub production_stage: ProductionStage,
    pub co2_content: Co2Content,
    pub h2s_content: H2sContent,
}

fn status(v: FieldStatus) -> f64 {
    match v {
        FieldStatus::PodI => 0.05,
        FieldStatus::PodII => 0.03,
        FieldStatus::NoPod => 0.0,
    }
}

fn location(v: FieldLocation) -> f64 {
    match v {
        FieldLocation::Onshore => 0.0,
        FieldLocation::Offshore0To20 => 0.08,
        FieldLocation::Offshore20To50 => 0.10,
        FieldLocation::Offshore50To150 => 0.12,
        FieldLocation::Offshore150To1000 => 0.14,
        FieldLocation::OffshoreOver1000 => 0.16,
    }
}

fn depth(v: ReservoirDepth) -> f64 {
    match v {
        ReservoirDepth::UpTo2500 => 0.0,
        ReservoirDepth::Over2500 => 0.01,
    }
}

fn infrastructure(v: InfrastructureAvailability) -> f64 {
    match v {
        InfrastructureAvailability::WellDeveloped => 0.0,
        InfrastructureAvailability::NewFrontierOffshore => 0.02,
        InfrastructureAvailability::NewFrontierOnshore => 0.04,
    }
}

fn reservoir(v: ReservoirType) -> f64 {
    match v {
        ReservoirType::Conventional => 0.0,
        ReservoirType::NonConventional => 0.16,
    }
}

fn api(v: ApiGravity) -> f64 {
    match v {
        ApiGravity::Below25 => 0.01,
        ApiGravity::AtLeast25 => 0.0,
    }
}

fn tkdn(v: DomesticUse) -> f64 {
    match v {
        DomesticUse::From30To50 => 0.02,
        DomesticUse::From50To70 => 0.03,
        DomesticUse::From70To100 => 0.04,
    }
}

fn stage(v: ProductionStage) -> f64 {
    match v {
        ProductionStage::Primary => 0.0,
        ProductionStage::Secondary => 0.06,
        ProductionStage::Tertiary => 0.10,
    }
}

fn co2(v: Co2Content) -> f64 {
    match v {
        Co2Content::Below5 => 0.0,
        Co2Content::From5To10 => 0.005,
        Co2Content::From10To20 => 0.01,
        Co2Content::From20To40 => 0.015,
        Co2Content::From40To60 => 0.02,
        Co2Content::AtLeast60 => 0.04,
    }
}

fn h2s(v: H2sContent) -> f64 {
    match v {
        H2sContent::Below100 => 0.0,
        H2sContent::From100To1000 => 0.01,
        H2sContent::From1000To2000 => 0.02,
        H2sContent::From2000To3000 => 0.04,
        H2sContent::From3000To4000 => 0.04,
        H2sContent::AtLeast4000 => 0.05,
    }
}

/// Sum of the attribute adjustments under `regime`
///
/// Every regime reads the same attribute table; regimes differ in the progressive split.
pub fn variable_split(regime: GrossSplitRegime, field: &FieldAttributes) -> f64 {
    match regime {
        GrossSplitRegime::Permen8_2017
        | GrossSplitRegime::Permen52_2017
        | GrossSplitRegime::Permen20_2019
        | GrossSplitRegime::Permen12_2020 => attribute_sum(field),
    }
}

fn attribute_sum(field: &FieldAttributes) -> f64 {
    status(field.field_status)
        + location(field.field_location)
        + depth(field.reservoir_depth)
        + infrastructure(field.infrastructure)
        + reservoir(field.reservoir_type)
        + api(field.api_oil)
        + tkdn(field.domestic_use)
        + stage(field.production_stage)
        + co2(field.co2_content)
        + h2s(field.h2s_content)
}

/// Oil price steps of regulation 8/2017, USD/bbl
const OIL_PRICE_STEPS_8_2017: &[(f64, f64)] = &[
    (40.0, 0.075),
    (55.0, 0.05),
    (70.0, 0.025),
    (85.0, 0.0),
    (100.0, -0.025),
    (115.0, -0.05),
];

/// Cumulative production steps of regulation 8/2017, MMBOE
const CUM_STEPS_8_2017: &[(f64, f64)] = &[(1.0, 0.05), (10.0, 0.04), (20.0, 0.03), (50.0, 0.02), (150.0, 0.01)];

/// Cumulative production steps of regulation 52/2017, MMBOE
const CUM_STEPS_52_2017: &[(f64, f64)] = &[(30.0, 0.10), (60.0, 0.09), (90.0, 0.08), (125.0, 0.06), (175.0, 0.04)];

/// Value of the first step whose upper bound exceeds `x`, else `above`
fn step(table: &[(f64, f64)], x: f64, above: f64) -> f64 {
    table
        .iter()
        .find(|(upper, _)| x < *upper)
        .map_or(above, |(_, v)| *v)
}

/// Progressive split for one fluid in one year
pub fn progressive_split(regime: GrossSplitRegime, fluid: FluidType, price: f64, cumulative: f64) -> f64 {
    match regime {
        GrossSplitRegime::Permen8_2017 => {
            let price_part = match fluid {
                FluidType::Oil => step(OIL_PRICE_STEPS_8_2017, price, -0.075),
                _ => 0.0,
            };
            price_part + step(CUM_STEPS_8_2017, cumulative, 0.0)
        }
        GrossSplitRegime::Permen52_2017 | GrossSplitRegime::Permen20_2019 | GrossSplitRegime::Permen12_2020 => {
            let price_part = match fluid {
                FluidType::Oil if price < 85.0 => (85.0 - price) * 0.25 / 100.0,
                FluidType::Gas if price < 7.0 => (7.0 - price) * 2.5 / 100.0,
                FluidType::Gas if price > 10.0 => (10.0 - price) * 2.5 / 100.0,
                _ => 0.0,
            };
            price_part + step(CUM_STEPS_52_2017, cumulative, 0.0)
        }
    }
}

/// Contractor split per year: base, variable, discretion and progressive, clamped to [0, 1]
pub fn contractor_split(
    base: f64,
    variable: f64,
    ministry_discretion: f64,
    progressive: &[f64],
) -> Vec<f64> {
    progressive
        .iter()
        .map(|p| (base + variable + ministry_discretion + p).clamp(0.0, 1.0))
        .collect()
}

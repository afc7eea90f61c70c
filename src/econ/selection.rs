//! Selector enums used across the engine
//!
//! Each enum owns exactly one string table. Encoding (`as_str`, `Display`,
//! `Serialize`) and decoding (`FromStr`, `Deserialize`) both go through that
//! table, so the JSON wire format and the CLI spelling cannot drift apart.
//! Decoding scans the whole table and is case-insensitive.

use crate::error::FiscalError;

macro_rules! selection_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in table order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = FiscalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| FiscalError::Selection {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

selection_enum! {
    /// Stream a cost or lifting element belongs to
    #[derive(Default)]
    FluidType ("fluid type") {
        #[default]
        Oil => "Oil",
        Gas => "Gas",
        Sulfur => "Sulfur",
        Electricity => "Electricity",
        Co2 => "CO2",
        All => "All",
    }
}

selection_enum! {
    /// Depreciation method for capital cost
    #[derive(Default)]
    DeprMethod ("depreciation method") {
        StraightLine => "SL",
        DecliningBalance => "DB",
        DoubleDecliningBalance => "DDB",
        #[default]
        PscDecliningBalance => "PSC DB",
    }
}

selection_enum! {
    /// Truncation policy for [`crate::econ::limit::econ_limit`]
    #[derive(Default)]
    LimitMethod ("limit method") {
        #[default]
        MaxCumCashflow => "Maximum Cumulative Cash Flow",
        MaxNpv => "Maximum NPV",
        NegativeCashflow => "Negative Cash Flow",
    }
}

selection_enum! {
    /// Input scaled by a sensitivity sweep
    SensitivityParameter ("sensitivity parameter") {
        OilPrice => "Oil Price",
        GasPrice => "Gas Price",
        Opex => "OPEX",
        Capex => "CAPEX",
        Lifting => "Lifting",
    }
}

selection_enum! {
    /// Income tax regime
    #[derive(Default)]
    TaxRegime ("tax regime") {
        #[default]
        NailedDown => "nailed down",
        Prevailing => "prevailing",
        Uu36_2008 => "UU No.36 Tahun 2008",
        Uu02_2020 => "UU No.02 Tahun 2020",
        Uu07_2021 => "UU No.07 Tahun 2021",
    }
}

selection_enum! {
    /// How FTP is brought into the contractor's taxable base
    #[derive(Default)]
    FtpTaxRegime ("FTP tax regime") {
        #[default]
        Pdjp20_2017 => "PDJP No.20 Tahun 2017",
        PrePdjp20_2017 => "Pre PDJP No.20 Tahun 2017",
        DirectMode => "Direct Mode",
    }
}

selection_enum! {
    /// Source of the contractor pretax share in Cost Recovery
    #[derive(Default)]
    TaxSplitType ("tax split type") {
        #[default]
        Conventional => "Conventional PSC",
        SlidingScale => "ICP Sliding Scale",
        RcSplit => "R/C Split",
    }
}

selection_enum! {
    /// Treatment of sulfur, electricity and CO2 revenue
    OtherRevenue ("other revenue") {
        AdditionToOilRevenue => "Addition to Oil Revenue",
        AdditionToGasRevenue => "Addition to Gas Revenue",
        ReductionToOilOpex => "Reduction to Oil OPEX",
        ReductionToGasOpex => "Reduction to Gas OPEX",
    }
}

selection_enum! {
    /// Cost categories that receive inflation escalation
    #[derive(Default)]
    InflationAppliedTo ("inflation target") {
        #[default]
        Capex => "CAPEX",
        Opex => "OPEX",
        CapexAndOpex => "CAPEX AND OPEX",
    }
}

selection_enum! {
    /// Ministerial regulation governing Gross Split lookup tables
    #[derive(Default)]
    GrossSplitRegime ("gross split regime") {
        Permen8_2017 => "PERMEN_ESDM_8_2017",
        #[default]
        Permen52_2017 => "PERMEN_ESDM_52_2017",
        Permen20_2019 => "PERMEN_ESDM_20_2019",
        Permen12_2020 => "PERMEN_ESDM_12_2020",
    }
}

selection_enum! {
    #[derive(Default)]
    FieldStatus ("field status") {
        PodI => "POD I",
        PodII => "POD II",
        #[default]
        NoPod => "No POD",
    }
}

selection_enum! {
    #[derive(Default)]
    FieldLocation ("field location") {
        #[default]
        Onshore => "Onshore",
        Offshore0To20 => "Offshore (0<h<=20)",
        Offshore20To50 => "Offshore (20<h<=50)",
        Offshore50To150 => "Offshore (50<h<=150)",
        Offshore150To1000 => "Offshore (150<h<=1000)",
        OffshoreOver1000 => "Offshore (h>1000)",
    }
}

selection_enum! {
    #[derive(Default)]
    ReservoirDepth ("reservoir depth") {
        #[default]
        UpTo2500 => "<=2500",
        Over2500 => ">2500",
    }
}

selection_enum! {
    #[derive(Default)]
    InfrastructureAvailability ("infrastructure availability") {
        #[default]
        WellDeveloped => "Well Developed",
        NewFrontierOffshore => "New Frontier Offshore",
        NewFrontierOnshore => "New Frontier Onshore",
    }
}

selection_enum! {
    #[derive(Default)]
    ReservoirType ("reservoir type") {
        #[default]
        Conventional => "Conventional",
        NonConventional => "Non Conventional",
    }
}

selection_enum! {
    #[derive(Default)]
    ApiGravity ("API gravity") {
        #[default]
        Below25 => "<25",
        AtLeast25 => ">=25",
    }
}

selection_enum! {
    /// Local content (TKDN) tier, percent
    #[derive(Default)]
    DomesticUse ("domestic use") {
        From30To50 => "30<=x<50",
        #[default]
        From50To70 => "50<=x<70",
        From70To100 => "70<=x<100",
    }
}

selection_enum! {
    #[derive(Default)]
    ProductionStage ("production stage") {
        Primary => "Primary",
        #[default]
        Secondary => "Secondary",
        Tertiary => "Tertiary",
    }
}

selection_enum! {
    /// CO2 content, percent
    #[derive(Default)]
    Co2Content ("CO2 content") {
        #[default]
        Below5 => "<5",
        From5To10 => "5<=x<10",
        From10To20 => "10<=x<20",
        From20To40 => "20<=x<40",
        From40To60 => "40<=x<60",
        AtLeast60 => "x>=60",
    }
}

selection_enum! {
    /// H2S content, ppm
    #[derive(Default)]
    H2sContent ("H2S content") {
        #[default]
        Below100 => "<100",
        From100To1000 => "100<=x<1000",
        From1000To2000 => "1000<=x<2000",
        From2000To3000 => "2000<=x<3000",
        From3000To4000 => "3000<=x<4000",
        AtLeast4000 => "x>=4000",
    }
}

impl FluidType {
    /// Auxiliary streams whose revenue is folded into oil or gas
    pub fn is_other_revenue(&self) -> bool {
        matches!(self, FluidType::Sulfur | FluidType::Electricity | FluidType::Co2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scans_whole_table() {
        // The last entry must be reachable; a first-key short circuit would miss it.
        assert_eq!("UU No.07 Tahun 2021".parse::<TaxRegime>().unwrap(), TaxRegime::Uu07_2021);
        assert_eq!("Direct Mode".parse::<FtpTaxRegime>().unwrap(), FtpTaxRegime::DirectMode);
        assert_eq!("R/C Split".parse::<TaxSplitType>().unwrap(), TaxSplitType::RcSplit);
    }

    #[test]
    fn test_decode_is_case_insensitive_and_trimmed() {
        assert_eq!(" psc db ".parse::<DeprMethod>().unwrap(), DeprMethod::PscDecliningBalance);
        assert_eq!("co2".parse::<FluidType>().unwrap(), FluidType::Co2);
    }

    #[test]
    fn test_unknown_string_is_selection_error() {
        let err = "Sliding".parse::<TaxSplitType>().unwrap_err();
        match err {
            FiscalError::Selection { kind, value } => {
                assert_eq!(kind, "tax split type");
                assert_eq!(value, "Sliding");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_every_variant_round_trips_through_its_table() {
        for v in H2sContent::ALL {
            assert_eq!(v.as_str().parse::<H2sContent>().unwrap(), *v);
        }
        for v in OtherRevenue::ALL {
            assert_eq!(v.to_string().parse::<OtherRevenue>().unwrap(), *v);
        }
    }

    #[test]
    fn test_serde_uses_same_table() {
        let json = serde_json::to_string(&GrossSplitRegime::Permen20_2019).unwrap();
        assert_eq!(json, "\"PERMEN_ESDM_20_2019\"");
        let back: FieldLocation = serde_json::from_str("\"Offshore (20<h<=50)\"").unwrap();
        assert_eq!(back, FieldLocation::Offshore20To50);
        assert!(serde_json::from_str::<FieldLocation>("\"Mars\"").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DeprMethod::default(), DeprMethod::PscDecliningBalance);
        assert_eq!(GrossSplitRegime::default(), GrossSplitRegime::Permen52_2017);
        assert!(FluidType::Sulfur.is_other_revenue());
        assert!(!FluidType::Gas.is_other_revenue());
    }
}

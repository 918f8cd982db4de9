//! Static demand segment catalogue.
//!
//! Input segments are the matrices grown period by period; output segments
//! are the 19 daily matrices assembled from them at the end of a run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;

/// How growth factors are applied to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactoringMethod {
    /// Factor looked up in the direction of travel (P=O, A=D).
    Direct,
    /// Mean of the forward and reverse factors.
    BidirectionalAverage,
}

/// How daily input segments are assembled into the output segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    /// Average each internal "from home" segment with its transposed to-home leg.
    #[default]
    Averaging,
    /// Keep the "from home" segment only.
    FromOnly,
}

/// Rule used to build one output segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    AverageWithReturn {
        outbound: DemandSegment,
        return_leg: DemandSegment,
    },
    ExpandOnly(DemandSegment),
}

macro_rules! segments {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = EdgeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok($name::$variant),)+
                    other => Err(EdgeError::InvalidData(format!(
                        "Unknown segment: '{other}'"
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

segments!(DemandSegment {
    HbebcaInt => "HBEBCA_Int",
    HbebncaInt => "HBEBNCA_Int",
    NhbebcaInt => "NHBEBCA_Int",
    NhbebncaInt => "NHBEBNCA_Int",
    HbwcaInt => "HBWCA_Int",
    HbwncaInt => "HBWNCA_Int",
    HbocaInt => "HBOCA_Int",
    HboncaInt => "HBONCA_Int",
    NhbocaInt => "NHBOCA_Int",
    NhboncaInt => "NHBONCA_Int",
    HbebcaIntT => "HBEBCA_Int_T",
    HbebncaIntT => "HBEBNCA_Int_T",
    NhbebcaIntT => "NHBEBCA_Int_T",
    NhbebncaIntT => "NHBEBNCA_Int_T",
    HbwcaIntT => "HBWCA_Int_T",
    HbwncaIntT => "HBWNCA_Int_T",
    HbocaIntT => "HBOCA_Int_T",
    HboncaIntT => "HBONCA_Int_T",
    NhbocaIntT => "NHBOCA_Int_T",
    NhboncaIntT => "NHBONCA_Int_T",
    EbcaExtFm => "EBCA_Ext_FM",
    EbcaExtTo => "EBCA_Ext_TO",
    EbncaExt => "EBNCA_Ext",
    HbwcaExtFm => "HBWCA_Ext_FM",
    HbwcaExtTo => "HBWCA_Ext_TO",
    HbwncaExt => "HBWNCA_Ext",
    OcaExtFm => "OCA_Ext_FM",
    OcaExtTo => "OCA_Ext_TO",
    OncaExt => "ONCA_Ext",
});

segments!(OutputSegment {
    HbebcaInt => "HBEBCA_Int",
    HbebncaInt => "HBEBNCA_Int",
    NhbebcaInt => "NHBEBCA_Int",
    NhbebncaInt => "NHBEBNCA_Int",
    HbwcaInt => "HBWCA_Int",
    HbwncaInt => "HBWNCA_Int",
    HbocaInt => "HBOCA_Int",
    HboncaInt => "HBONCA_Int",
    NhbocaInt => "NHBOCA_Int",
    NhboncaInt => "NHBONCA_Int",
    EbcaExtFm => "EBCA_Ext_FM",
    EbcaExtTo => "EBCA_Ext_TO",
    EbncaExt => "EBNCA_Ext",
    HbwcaExtFm => "HBWCA_Ext_FM",
    HbwcaExtTo => "HBWCA_Ext_TO",
    HbwncaExt => "HBWNCA_Ext",
    OcaExtFm => "OCA_Ext_FM",
    OcaExtTo => "OCA_Ext_TO",
    OncaExt => "ONCA_Ext",
});

impl DemandSegment {
    /// To-home matrices are transposed before the station split because
    /// the split probabilities are indexed by the outbound direction.
    pub fn is_to_home(self) -> bool {
        self.name().ends_with("_Int_T")
    }

    pub fn factoring_method(self) -> FactoringMethod {
        use DemandSegment::*;
        match self {
            HbebcaInt | HbebncaInt | HbwcaInt | HbocaInt | HbebcaIntT | HbebncaIntT
            | HbwcaIntT | HbocaIntT | EbcaExtFm | EbcaExtTo | HbwcaExtFm | HbwcaExtTo
            | OcaExtFm | OcaExtTo => FactoringMethod::Direct,
            NhbebcaInt | NhbebncaInt | HbwncaInt | HboncaInt | NhbocaInt | NhboncaInt
            | NhbebcaIntT | NhbebncaIntT | HbwncaIntT | HboncaIntT | NhbocaIntT
            | NhboncaIntT | EbncaExt | HbwncaExt | OncaExt => {
                FactoringMethod::BidirectionalAverage
            }
        }
    }
}

impl OutputSegment {
    /// The input segment carrying this output's "from" (or only) direction.
    pub fn outbound(self) -> DemandSegment {
        use OutputSegment as O;
        use DemandSegment as D;
        match self {
            O::HbebcaInt => D::HbebcaInt,
            O::HbebncaInt => D::HbebncaInt,
            O::NhbebcaInt => D::NhbebcaInt,
            O::NhbebncaInt => D::NhbebncaInt,
            O::HbwcaInt => D::HbwcaInt,
            O::HbwncaInt => D::HbwncaInt,
            O::HbocaInt => D::HbocaInt,
            O::HboncaInt => D::HboncaInt,
            O::NhbocaInt => D::NhbocaInt,
            O::NhboncaInt => D::NhboncaInt,
            O::EbcaExtFm => D::EbcaExtFm,
            O::EbcaExtTo => D::EbcaExtTo,
            O::EbncaExt => D::EbncaExt,
            O::HbwcaExtFm => D::HbwcaExtFm,
            O::HbwcaExtTo => D::HbwcaExtTo,
            O::HbwncaExt => D::HbwncaExt,
            O::OcaExtFm => D::OcaExtFm,
            O::OcaExtTo => D::OcaExtTo,
            O::OncaExt => D::OncaExt,
        }
    }

    pub fn combination(self, mode: CombinationMode) -> Combination {
        use OutputSegment as O;
        use DemandSegment as D;
        let outbound = self.outbound();
        if mode == CombinationMode::FromOnly {
            return Combination::ExpandOnly(outbound);
        }
        let return_leg = match self {
            O::HbebcaInt => D::HbebcaIntT,
            O::HbebncaInt => D::HbebncaIntT,
            O::HbwcaInt => D::HbwcaIntT,
            O::HbwncaInt => D::HbwncaIntT,
            O::HbocaInt => D::HbocaIntT,
            O::HboncaInt => D::HboncaIntT,
            _ => return Combination::ExpandOnly(outbound),
        };
        Combination::AverageWithReturn {
            outbound,
            return_leg,
        }
    }
}

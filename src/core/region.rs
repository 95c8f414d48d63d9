//! Province normalisation and route classification.
//!
//! Everything here is pure: no I/O, no shared state. Route classes are
//! decided by walking [`ROUTE_RULES`] top-down and taking the first rule
//! whose predicate matches, so precedence is exactly the order of that table.
use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Administrative marker of a commune-level (non-urban) unit.
const RURAL_MARKER: &str = "xã";

/// Provinces reached at the curated different-region rate from Hà Nội.
pub const SPECIAL_PROVINCES_FROM_HANOI: &[&str] = &[
    "ninhthuan",
    "binhthuan",
    "lamdong",
    "binhphuoc",
    "tayninh",
    "binhduong",
    "dongnai",
    "baria-vungtau",
];

/// Provinces reached at the curated different-region rate from Hồ Chí Minh.
pub const SPECIAL_PROVINCES_FROM_HCM: &[&str] = &[
    "hoabinh",
    "hungyen",
    "haiduong",
    "hanam",
    "thaibinh",
    "namdinh",
    "ninhbinh",
];

/// The six shipping regions. Numeric ids match the master-data `RegionID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Region {
    HoChiMinh = 1,
    HaNoi = 2,
    DaNang = 3,
    Southern = 4,
    Central = 5,
    Northern = 6,
}

impl Region {
    /// Region assumed when a request omits one. See DESIGN.md, open question.
    pub const FALLBACK: Region = Region::Northern;

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Hà Nội and Hồ Chí Minh, the two largest metro regions.
    pub fn is_major_hub(self) -> bool {
        matches!(self, Region::HaNoi | Region::HoChiMinh)
    }

    pub fn is_macro_region(self) -> bool {
        matches!(self, Region::Northern | Region::Central | Region::Southern)
    }
}

impl TryFrom<u8> for Region {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Region::HoChiMinh),
            2 => Ok(Region::HaNoi),
            3 => Ok(Region::DaNang),
            4 => Ok(Region::Southern),
            5 => Ok(Region::Central),
            6 => Ok(Region::Northern),
            other => Err(format!("Unknown region id {other}, expected 1-6")),
        }
    }
}

impl From<Region> for u8 {
    fn from(region: Region) -> Self {
        region.id()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::HoChiMinh => "ho_chi_minh",
            Region::HaNoi => "ha_noi",
            Region::DaNang => "da_nang",
            Region::Southern => "southern",
            Region::Central => "central",
            Region::Northern => "northern",
        };
        f.write_str(name)
    }
}

/// Delivery service tier; each tier has its own fee table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    #[default]
    Standard,
    Fast,
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceTier::Standard => f.write_str("standard"),
            ServiceTier::Fast => f.write_str("fast"),
        }
    }
}

impl std::str::FromStr for ServiceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(ServiceTier::Standard),
            "fast" => Ok(ServiceTier::Fast),
            other => Err(format!("Unknown service tier '{other}'")),
        }
    }
}

/// Geographic relationship between origin and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    SameProvinceMajor,
    SameProvinceOther,
    SameRegion,
    SpecialRoute,
    DifferentRegionSpecial,
    DifferentRegion,
}

impl RouteClass {
    /// Classes priced with the local weight surcharge.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            RouteClass::SameProvinceMajor | RouteClass::SameProvinceOther | RouteClass::SameRegion
        )
    }
}

/// Fold a province name into its comparison key.
///
/// Diacritics are stripped, `đ`/`Đ` become `d`/`D`, the result is lower-cased
/// and all whitespace removed. Applying it twice yields the same key.
pub fn normalize(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn contains_rural_marker(text: &str) -> bool {
    text.nfc().collect::<String>().to_lowercase().contains(RURAL_MARKER)
}

/// True iff the ward name denotes a commune-level unit.
pub fn is_rural_ward(ward_name: &str) -> bool {
    contains_rural_marker(ward_name)
}

/// Origin-side rural check; only affects the delivery-day addend.
pub fn is_rural_origin(origin_province: &str) -> bool {
    contains_rural_marker(origin_province)
}

/// Inputs to the classification rules.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub origin_region: Region,
    pub dest_region: Region,
    pub origin_key: &'a str,
    pub dest_key: &'a str,
    pub tier: ServiceTier,
}

/// One entry of the classification chain.
pub struct RouteRule {
    pub class: RouteClass,
    predicate: fn(&RouteContext<'_>) -> bool,
}

impl RouteRule {
    pub fn matches(&self, ctx: &RouteContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

fn same_province(ctx: &RouteContext<'_>) -> bool {
    ctx.origin_key == ctx.dest_key
}

fn same_province_major(ctx: &RouteContext<'_>) -> bool {
    same_province(ctx) && ctx.origin_region.is_major_hub()
}

fn same_region(ctx: &RouteContext<'_>) -> bool {
    use Region::*;

    (ctx.origin_region == ctx.dest_region && ctx.origin_region.is_macro_region())
        || matches!(
            (ctx.origin_region, ctx.dest_region),
            (HaNoi, Northern) | (HoChiMinh, Southern) | (Northern, HaNoi) | (Southern, HoChiMinh)
        )
}

fn special_route(ctx: &RouteContext<'_>) -> bool {
    use Region::*;

    matches!(
        (ctx.origin_region, ctx.dest_region),
        (HaNoi, DaNang)
            | (HoChiMinh, DaNang)
            | (DaNang, HaNoi)
            | (DaNang, HoChiMinh)
            | (Northern, DaNang)
            | (Southern, DaNang)
            | (DaNang, Northern)
            | (DaNang, Southern)
    )
}

fn different_region_special(ctx: &RouteContext<'_>) -> bool {
    use Region::*;

    if ctx.tier != ServiceTier::Standard {
        return false;
    }
    let dest = ctx.dest_key;
    let from_hanoi_list = SPECIAL_PROVINCES_FROM_HANOI.contains(&dest);
    let from_hcm_list = SPECIAL_PROVINCES_FROM_HCM.contains(&dest);

    (ctx.origin_region == HaNoi && from_hanoi_list)
        || (ctx.origin_region == HoChiMinh && from_hcm_list)
        || (matches!(ctx.origin_region, Northern | Central)
            && (ctx.dest_region == HoChiMinh || from_hanoi_list))
        || (matches!(ctx.origin_region, Southern | Central)
            && (ctx.dest_region == HaNoi || from_hcm_list))
}

fn always(_: &RouteContext<'_>) -> bool {
    true
}

/// Classification chain, evaluated top-down; the last rule always matches.
pub const ROUTE_RULES: [RouteRule; 6] = [
    RouteRule {
        class: RouteClass::SameProvinceMajor,
        predicate: same_province_major,
    },
    RouteRule {
        class: RouteClass::SameProvinceOther,
        predicate: same_province,
    },
    RouteRule {
        class: RouteClass::SameRegion,
        predicate: same_region,
    },
    RouteRule {
        class: RouteClass::SpecialRoute,
        predicate: special_route,
    },
    RouteRule {
        class: RouteClass::DifferentRegionSpecial,
        predicate: different_region_special,
    },
    RouteRule {
        class: RouteClass::DifferentRegion,
        predicate: always,
    },
];

/// Classify a route. Keys must already be [`normalize`]d.
pub fn classify_route(
    origin_region: Region,
    dest_region: Region,
    origin_key: &str,
    dest_key: &str,
    tier: ServiceTier,
) -> RouteClass {
    let ctx = RouteContext {
        origin_region,
        dest_region,
        origin_key,
        dest_key,
        tier,
    };
    ROUTE_RULES
        .iter()
        .find(|rule| rule.matches(&ctx))
        .map_or(RouteClass::DifferentRegion, |rule| rule.class)
}

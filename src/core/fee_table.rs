//! Fee configuration: per service tier, per route class, per rural flag.
//!
//! The table is plain data and is passed explicitly to the calculator, so a
//! deployment can override it from configuration while tests pin it.
use serde::{Deserialize, Serialize};

use super::region::{RouteClass, ServiceTier};

/// Base fee and delivery horizon for one route variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    /// Fee in whole currency units (VND)
    pub fee: u64,
    /// Base delivery days, fractional (0.25 = 6 hours)
    pub base_days: f64,
}

impl FeeRule {
    pub const fn new(fee: u64, base_days: f64) -> Self {
        Self { fee, base_days }
    }
}

/// Urban and rural variants of a route's fee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePricing {
    pub urban: FeeRule,
    pub rural: FeeRule,
}

impl RoutePricing {
    pub const fn new(urban: FeeRule, rural: FeeRule) -> Self {
        Self { urban, rural }
    }

    pub fn rule(&self, rural: bool) -> FeeRule {
        if rural { self.rural } else { self.urban }
    }
}

/// Weight allowance included in the base fee and the charge per extra interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSurcharge {
    pub threshold_kg: f64,
    pub per_interval_fee: u64,
}

impl WeightSurcharge {
    /// Size of one billable weight interval.
    pub const INTERVAL_KG: f64 = 0.5;

    pub const fn new(threshold_kg: f64, per_interval_fee: u64) -> Self {
        Self {
            threshold_kg,
            per_interval_fee,
        }
    }

    /// Number of started intervals above the threshold.
    pub fn intervals(&self, weight_kg: f64) -> u64 {
        let extra = (weight_kg - self.threshold_kg).max(0.0);
        (extra / Self::INTERVAL_KG).ceil() as u64
    }

    /// Saturates instead of overflowing on extreme tables.
    pub fn surcharge(&self, weight_kg: f64) -> u64 {
        self.intervals(weight_kg).saturating_mul(self.per_interval_fee)
    }
}

/// All prices for a single service tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierFees {
    pub same_province_major: RoutePricing,
    pub same_province_other: RoutePricing,
    pub same_region: RoutePricing,
    pub special_route: RoutePricing,
    /// Absent for tiers that never classify routes this way
    #[serde(default)]
    pub different_region_special: Option<RoutePricing>,
    pub different_region: RoutePricing,
    /// Surcharge for same-province and same-region routes
    pub local_surcharge: WeightSurcharge,
    /// Surcharge for every other route class
    pub default_surcharge: WeightSurcharge,
}

impl TierFees {
    pub fn pricing(&self, class: RouteClass) -> &RoutePricing {
        match class {
            RouteClass::SameProvinceMajor => &self.same_province_major,
            RouteClass::SameProvinceOther => &self.same_province_other,
            RouteClass::SameRegion => &self.same_region,
            RouteClass::SpecialRoute => &self.special_route,
            RouteClass::DifferentRegionSpecial => self
                .different_region_special
                .as_ref()
                .unwrap_or(&self.different_region),
            RouteClass::DifferentRegion => &self.different_region,
        }
    }

    pub fn surcharge(&self, class: RouteClass) -> &WeightSurcharge {
        if class.is_local() {
            &self.local_surcharge
        } else {
            &self.default_surcharge
        }
    }

    fn all_pricing(&self) -> impl Iterator<Item = &RoutePricing> {
        [
            Some(&self.same_province_major),
            Some(&self.same_province_other),
            Some(&self.same_region),
            Some(&self.special_route),
            self.different_region_special.as_ref(),
            Some(&self.different_region),
        ]
        .into_iter()
        .flatten()
    }

    /// Sanity problems in this tier, as human readable messages.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for pricing in self.all_pricing() {
            for rule in [pricing.urban, pricing.rural] {
                if !rule.base_days.is_finite() || rule.base_days < 0.0 {
                    problems.push(format!("base_days must be >= 0, got {}", rule.base_days));
                }
            }
        }
        for surcharge in [self.local_surcharge, self.default_surcharge] {
            if !surcharge.threshold_kg.is_finite() || surcharge.threshold_kg < 0.0 {
                problems.push(format!(
                    "threshold_kg must be >= 0, got {}",
                    surcharge.threshold_kg
                ));
            }
            if surcharge.per_interval_fee == 0 {
                problems.push("per_interval_fee must be greater than 0".to_string());
            }
        }
        problems
    }
}

/// Immutable fee configuration for every service tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeTable {
    pub standard: TierFees,
    pub fast: TierFees,
}

impl FeeTable {
    pub fn tier(&self, tier: ServiceTier) -> &TierFees {
        match tier {
            ServiceTier::Standard => &self.standard,
            ServiceTier::Fast => &self.fast,
        }
    }

    /// Look up the fee rule for a classified route.
    pub fn rule(&self, tier: ServiceTier, class: RouteClass, rural: bool) -> FeeRule {
        self.tier(tier).pricing(class).rule(rural)
    }

    /// The built-in table.
    ///
    /// | route                     | standard        | fast            |
    /// |---------------------------|-----------------|-----------------|
    /// | same province, major hub  | 22000 / 0.25d   | 22000 / 0.25d   |
    /// | same province, other      | 16500 / 0.5d    | 16500 / 0.5d    |
    /// | same region               | 30000 / 1d      | 30000 / 1d      |
    /// | special route             | 30000 / 3.5d    | 40000 / 1d      |
    /// | different region, special | 30000 / 4d      | n/a             |
    /// | different region          | 32000 / 4d      | 45000 / 2d      |
    ///
    /// Rural variants cost more and keep the same horizon. Local routes
    /// include 3 kg and charge 2500 per extra 0.5 kg; other routes include
    /// 0.5 kg and charge 5000 (standard) or 10000 (fast) per 0.5 kg.
    pub const fn builtin() -> Self {
        Self {
            standard: TierFees {
                same_province_major: RoutePricing::new(
                    FeeRule::new(22000, 0.25),
                    FeeRule::new(30000, 0.25),
                ),
                same_province_other: RoutePricing::new(
                    FeeRule::new(16500, 0.5),
                    FeeRule::new(30000, 0.5),
                ),
                same_region: RoutePricing::new(FeeRule::new(30000, 1.0), FeeRule::new(35000, 1.0)),
                special_route: RoutePricing::new(
                    FeeRule::new(30000, 3.5),
                    FeeRule::new(37000, 3.5),
                ),
                different_region_special: Some(RoutePricing::new(
                    FeeRule::new(30000, 4.0),
                    FeeRule::new(37000, 4.0),
                )),
                different_region: RoutePricing::new(
                    FeeRule::new(32000, 4.0),
                    FeeRule::new(40000, 4.0),
                ),
                local_surcharge: WeightSurcharge::new(3.0, 2500),
                default_surcharge: WeightSurcharge::new(0.5, 5000),
            },
            fast: TierFees {
                same_province_major: RoutePricing::new(
                    FeeRule::new(22000, 0.25),
                    FeeRule::new(30000, 0.25),
                ),
                same_province_other: RoutePricing::new(
                    FeeRule::new(16500, 0.5),
                    FeeRule::new(30000, 0.5),
                ),
                same_region: RoutePricing::new(FeeRule::new(30000, 1.0), FeeRule::new(35000, 1.0)),
                special_route: RoutePricing::new(
                    FeeRule::new(40000, 1.0),
                    FeeRule::new(50000, 1.0),
                ),
                different_region_special: None,
                different_region: RoutePricing::new(
                    FeeRule::new(45000, 2.0),
                    FeeRule::new(55000, 2.0),
                ),
                local_surcharge: WeightSurcharge::new(3.0, 2500),
                default_surcharge: WeightSurcharge::new(0.5, 10000),
            },
        }
    }

    /// Sanity problems across both tiers, prefixed with the tier name.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, tier) in [("standard", &self.standard), ("fast", &self.fast)] {
            problems.extend(tier.problems().into_iter().map(|p| format!("{name}: {p}")));
        }
        problems
    }
}

impl Default for FeeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

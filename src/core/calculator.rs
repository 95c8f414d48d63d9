//! Pure shipping-fee computation.
use serde::{Deserialize, Serialize};

use super::{
    error::{ShippingError, ShippingResult},
    fee_table::FeeTable,
    region::{self, Region, RouteClass, ServiceTier},
};

/// One end of a shipment as seen by the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Province name as entered or returned by master data
    pub province: String,
    /// Missing regions fall back to [`Region::FALLBACK`]
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub ward: Option<String>,
}

impl Endpoint {
    pub fn new(province: impl Into<String>, region: Option<Region>) -> Self {
        Self {
            province: province.into(),
            region,
            ward: None,
        }
    }

    pub fn with_ward(mut self, ward: impl Into<String>) -> Self {
        self.ward = Some(ward.into());
        self
    }

    fn region_or_fallback(&self, side: &str) -> Region {
        self.region.unwrap_or_else(|| {
            tracing::warn!(
                side,
                province = %self.province,
                fallback = %Region::FALLBACK,
                "Region missing, pricing with fallback region"
            );
            Region::FALLBACK
        })
    }
}

/// Input to a single pricing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub weight_kg: f64,
    pub origin: Endpoint,
    pub destination: Endpoint,
    #[serde(default)]
    pub tier: ServiceTier,
}

impl ShipmentRequest {
    /// Reject weights that are not finite and strictly positive.
    pub fn validate(&self) -> ShippingResult<()> {
        validate_weight(self.weight_kg)
    }
}

/// Heaviest parcel accepted for quoting, in kilograms.
pub const MAX_WEIGHT_KG: f64 = 1_000.0;

pub(crate) fn validate_weight(weight_kg: f64) -> ShippingResult<()> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(ShippingError::Validation(format!(
            "weight must be a positive number of kilograms, got {weight_kg}"
        )));
    }
    if weight_kg > MAX_WEIGHT_KG {
        return Err(ShippingError::Validation(format!(
            "weight {weight_kg} kg exceeds the {MAX_WEIGHT_KG} kg limit"
        )));
    }
    Ok(())
}

/// Fee and delivery horizon. Both are `None` for an unquotable shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShipmentQuote {
    pub fee: Option<u64>,
    pub eta_days: Option<u32>,
}

impl ShipmentQuote {
    pub const UNQUOTABLE: ShipmentQuote = ShipmentQuote {
        fee: None,
        eta_days: None,
    };

    pub fn is_unquotable(&self) -> bool {
        self.fee.is_none() && self.eta_days.is_none()
    }
}

/// Every intermediate decision of a pricing call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub route_class: RouteClass,
    pub rural_destination: bool,
    pub rural_origin: bool,
    pub base_fee: u64,
    pub surcharge_intervals: u64,
    pub surcharge: u64,
    pub days: f64,
    pub fee: u64,
    pub eta_days: u32,
}

/// Price a shipment and keep the intermediate decisions.
pub fn price(request: &ShipmentRequest, table: &FeeTable) -> PriceBreakdown {
    let origin_key = region::normalize(&request.origin.province);
    let dest_key = region::normalize(&request.destination.province);
    let origin_region = request.origin.region_or_fallback("origin");
    let dest_region = request.destination.region_or_fallback("destination");

    let route_class = region::classify_route(
        origin_region,
        dest_region,
        &origin_key,
        &dest_key,
        request.tier,
    );
    let rural_destination = request
        .destination
        .ward
        .as_deref()
        .is_some_and(region::is_rural_ward);
    let rural_origin = region::is_rural_origin(&request.origin.province);

    let tier = table.tier(request.tier);
    let rule = tier.pricing(route_class).rule(rural_destination);
    let surcharge_rule = tier.surcharge(route_class);
    let surcharge_intervals = surcharge_rule.intervals(request.weight_kg);
    let surcharge = surcharge_rule.surcharge(request.weight_kg);

    let days = rule.base_days + if rural_origin { 1.0 } else { 0.5 };
    let eta_days = (days.ceil() as u32).max(1);

    PriceBreakdown {
        route_class,
        rural_destination,
        rural_origin,
        base_fee: rule.fee,
        surcharge_intervals,
        surcharge,
        days,
        fee: rule.fee.saturating_add(surcharge),
        eta_days,
    }
}

/// Compute the quote for a shipment.
pub fn compute(request: &ShipmentRequest, table: &FeeTable) -> ShipmentQuote {
    let breakdown = price(request, table);
    ShipmentQuote {
        fee: Some(breakdown.fee),
        eta_days: Some(breakdown.eta_days),
    }
}

/// Calculator bound to a fee table.
#[derive(Debug, Clone, Default)]
pub struct ShippingCalculator {
    table: FeeTable,
}

impl ShippingCalculator {
    pub fn new(table: FeeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &FeeTable {
        &self.table
    }

    /// Validate then price the request.
    pub fn quote(&self, request: &ShipmentRequest) -> ShippingResult<ShipmentQuote> {
        request.validate()?;
        Ok(compute(request, &self.table))
    }

    pub fn breakdown(&self, request: &ShipmentRequest) -> ShippingResult<PriceBreakdown> {
        request.validate()?;
        Ok(price(request, &self.table))
    }
}

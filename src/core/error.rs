use thiserror::Error;

use crate::ports::UpstreamError;

/// Errors surfaced by the shipping engine to its callers.
///
/// `Unquotable` is deliberately absent: an origin without province or region
/// data is a business state and is reported as an empty quote instead.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ShippingError {
    /// Malformed input such as a non-positive weight
    #[error("Invalid shipment input: {0}")]
    Validation(String),

    /// An external geo / master-data dependency failed or timed out
    #[error("Upstream service '{service}' unavailable: {reason}")]
    UpstreamUnavailable {
        /// The collaborator that failed (e.g. "geo_ip")
        service: &'static str,
        /// Human readable cause
        reason: String,
    },

    /// The resolved region text did not match any province in master data
    #[error("No province matches '{0}'")]
    ProvinceNotFound(String),

    /// District id not present under the given province
    #[error("District {district_id} not found in province {province_id}")]
    DistrictNotFound { province_id: u32, district_id: u32 },

    /// Ward code not present under the given district
    #[error("Ward '{ward_code}' not found in district {district_id}")]
    WardNotFound { district_id: u32, ward_code: String },
}

impl ShippingError {
    /// Wrap a port failure for the named collaborator.
    pub fn upstream(service: &'static str, err: UpstreamError) -> Self {
        ShippingError::UpstreamUnavailable {
            service,
            reason: err.to_string(),
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShippingError::UpstreamUnavailable { .. })
    }

    /// Whether this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ShippingError::ProvinceNotFound(_)
                | ShippingError::DistrictNotFound { .. }
                | ShippingError::WardNotFound { .. }
        )
    }
}

/// Result alias for engine operations
pub type ShippingResult<T> = Result<T, ShippingError>;

//! Canonical address names from carrier master-data ids.
use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use super::{
    error::{ShippingError, ShippingResult},
    region::Region,
    resolver::{DEFAULT_UPSTREAM_TIMEOUT, bounded},
};
use crate::ports::{MasterData, UpstreamError};

/// Address as submitted by a client form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressIds {
    pub province_id: u32,
    pub district_id: u32,
    pub ward_code: String,
}

/// Address with master-data names filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAddress {
    pub province_id: u32,
    pub province_name: String,
    pub district_id: u32,
    pub district_name: String,
    pub ward_code: String,
    pub ward_name: String,
    pub region_id: Region,
}

/// Looks up province, district and ward in that order.
pub struct AddressCanonicalizer {
    master_data: Arc<dyn MasterData>,
    upstream_timeout: Duration,
}

impl AddressCanonicalizer {
    pub fn new(master_data: Arc<dyn MasterData>) -> Self {
        Self {
            master_data,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_upstream_timeout(mut self, upstream_timeout: Duration) -> Self {
        self.upstream_timeout = upstream_timeout;
        self
    }

    /// Resolve ids to names.
    ///
    /// # Returns
    /// The first missing level as `ProvinceNotFound`, `DistrictNotFound`
    /// or `WardNotFound`.
    pub async fn canonicalize(&self, ids: &AddressIds) -> ShippingResult<CanonicalAddress> {
        let provinces = bounded(
            "master_data",
            self.upstream_timeout,
            self.master_data.fetch_provinces(),
        )
        .await?;
        let province = provinces
            .into_iter()
            .find(|p| p.province_id == ids.province_id)
            .ok_or_else(|| ShippingError::ProvinceNotFound(ids.province_id.to_string()))?;
        let region_id = Region::try_from(province.region_id).map_err(|e| {
            ShippingError::upstream("master_data", UpstreamError::InvalidResponse(e))
        })?;

        let districts = bounded(
            "master_data",
            self.upstream_timeout,
            self.master_data.fetch_districts(ids.province_id),
        )
        .await?;
        let district = districts
            .into_iter()
            .find(|d| d.district_id == ids.district_id)
            .ok_or(ShippingError::DistrictNotFound {
                province_id: ids.province_id,
                district_id: ids.district_id,
            })?;

        let wards = bounded(
            "master_data",
            self.upstream_timeout,
            self.master_data.fetch_wards(ids.district_id),
        )
        .await?;
        let ward = wards
            .into_iter()
            .find(|w| w.ward_code == ids.ward_code)
            .ok_or_else(|| ShippingError::WardNotFound {
                district_id: ids.district_id,
                ward_code: ids.ward_code.clone(),
            })?;

        Ok(CanonicalAddress {
            province_id: province.province_id,
            province_name: province.province_name,
            district_id: district.district_id,
            district_name: district.district_name,
            ward_code: ward.ward_code,
            ward_name: ward.ward_name,
            region_id,
        })
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::UpstreamResult;

/// Province entry of the carrier master data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRecord {
    #[serde(rename = "ProvinceID")]
    pub province_id: u32,
    #[serde(rename = "ProvinceName")]
    pub province_name: String,
    /// Alternative spellings of the province name
    #[serde(rename = "NameExtension", default)]
    pub name_extension: Vec<String>,
    #[serde(rename = "RegionID")]
    pub region_id: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictRecord {
    #[serde(rename = "DistrictID")]
    pub district_id: u32,
    #[serde(rename = "ProvinceID")]
    pub province_id: u32,
    #[serde(rename = "DistrictName")]
    pub district_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardRecord {
    #[serde(rename = "WardCode")]
    pub ward_code: String,
    #[serde(rename = "DistrictID")]
    pub district_id: u32,
    #[serde(rename = "WardName")]
    pub ward_name: String,
}

/// MasterData defines the port for the province / district / ward catalogue
#[async_trait]
pub trait MasterData: Send + Sync + 'static {
    /// All provinces
    async fn fetch_provinces(&self) -> UpstreamResult<Vec<ProvinceRecord>>;

    /// Districts of one province
    async fn fetch_districts(&self, province_id: u32) -> UpstreamResult<Vec<DistrictRecord>>;

    /// Wards of one district
    async fn fetch_wards(&self, district_id: u32) -> UpstreamResult<Vec<WardRecord>>;
}

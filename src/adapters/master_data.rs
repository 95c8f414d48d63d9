use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

use super::http_client::JsonHttpClient;
use crate::ports::{
    DistrictRecord, MasterData, ProvinceRecord, UpstreamError, UpstreamResult, WardRecord,
};

/// Default GHN master-data endpoint
pub const DEFAULT_MASTER_DATA_URL: &str =
    "https://online-gateway.ghn.vn/shiip/public-api/master-data";

/// GHN response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<Vec<T>>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> UpstreamResult<Vec<T>> {
        if self.code != 200 {
            return Err(UpstreamError::InvalidResponse(format!(
                "master data returned code {}: {}",
                self.code, self.message
            )));
        }
        Ok(self.data.unwrap_or_default())
    }
}

/// Province / district / ward catalogue from the GHN public API
pub struct GhnMasterData {
    http: JsonHttpClient,
    base_url: String,
    token: String,
}

impl GhnMasterData {
    pub fn new(http: JsonHttpClient, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn headers(&self) -> [(&str, &str); 1] {
        [("Token", self.token.as_str())]
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> UpstreamResult<Vec<T>> {
        let url = format!("{}/{}", self.base_url, path);
        let envelope: Envelope<T> = self.http.post_json(&url, &body, &self.headers()).await?;
        envelope.into_data()
    }
}

#[async_trait]
impl MasterData for GhnMasterData {
    async fn fetch_provinces(&self) -> UpstreamResult<Vec<ProvinceRecord>> {
        let url = format!("{}/province", self.base_url);
        let envelope: Envelope<ProvinceRecord> = self.http.get_json(&url, &self.headers()).await?;
        let provinces = envelope.into_data()?;
        tracing::debug!(count = provinces.len(), "Fetched provinces");
        Ok(provinces)
    }

    async fn fetch_districts(&self, province_id: u32) -> UpstreamResult<Vec<DistrictRecord>> {
        self.post("district", json!({ "province_id": province_id })).await
    }

    async fn fetch_wards(&self, district_id: u32) -> UpstreamResult<Vec<WardRecord>> {
        self.post("ward", json!({ "district_id": district_id })).await
    }
}

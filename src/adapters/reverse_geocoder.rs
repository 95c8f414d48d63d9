use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::JsonHttpClient;
use crate::ports::{GeoAddress, ReverseGeocoder, UpstreamResult};

/// Default reverse geocoding endpoint (Nominatim)
pub const DEFAULT_REVERSE_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: GeoAddress,
}

/// Reverse geocoder speaking the Nominatim `/reverse` API
pub struct NominatimGeocoder {
    http: JsonHttpClient,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(http: JsonHttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, lat: f64, lon: f64) -> UpstreamResult<GeoAddress> {
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}&addressdetails=1",
            self.base_url, lat, lon
        );
        let body: NominatimResponse = self.http.get_json(&url, &[]).await?;
        Ok(body.address)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use axum::{Json, Router, extract::Query, routing::get};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;
    use crate::adapters::http_client::DEFAULT_USER_AGENT;

    #[tokio::test]
    async fn test_reverse_returns_address_details() {
        let app = Router::new().route(
            "/reverse",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("format").map(String::as_str), Some("json"));
                assert_eq!(params.get("addressdetails").map(String::as_str), Some("1"));
                Json(json!({
                    "display_name": "Tràng Tiền, Hoàn Kiếm, Hà Nội",
                    "address": {
                        "quarter": "Phường Tràng Tiền",
                        "suburb": "Quận Hoàn Kiếm",
                        "city": "Hà Nội",
                        "country": "Việt Nam",
                        "postcode": "11000"
                    }
                }))
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let http = JsonHttpClient::new(Duration::from_secs(2), DEFAULT_USER_AGENT).unwrap();
        let geocoder = NominatimGeocoder::new(http, format!("http://{}/", addr));
        let address = geocoder.reverse(21.0245, 105.8412).await.unwrap();

        assert_eq!(address.quarter.as_deref(), Some("Phường Tràng Tiền"));
        assert_eq!(address.city.as_deref(), Some("Hà Nội"));
        assert!(address.state.is_none());
    }
}

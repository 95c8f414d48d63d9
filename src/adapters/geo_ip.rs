use std::net::IpAddr;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::http_client::JsonHttpClient;
use crate::ports::{GeoIpInfo, GeoIpLookup, UpstreamError, UpstreamResult};

/// Default geo-IP endpoint (ipinfo.io compatible)
pub const DEFAULT_GEO_IP_URL: &str = "https://ipinfo.io";

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    /// "lat,lon"
    loc: Option<String>,
    region: Option<String>,
}

fn parse_loc(loc: &str) -> Option<(f64, f64)> {
    let (lat, lon) = loc.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

/// Geo-IP lookup against an ipinfo-style `/{ip}/json` API
pub struct IpInfoGeoLookup {
    http: JsonHttpClient,
    base_url: String,
    token: Option<String>,
}

impl IpInfoGeoLookup {
    pub fn new(http: JsonHttpClient, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// `{base}/{ip}/json`, or `{base}/json` when `ip` is absent or not an
    /// IP address. The token goes in the query string.
    fn url_for(&self, ip: Option<&str>) -> UpstreamResult<Url> {
        let invalid_base = |reason: String| {
            UpstreamError::Unreachable(format!("invalid geo-IP URL '{}': {reason}", self.base_url))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid_base(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid_base("cannot carry a path".into()))?;
            segments.pop_if_empty();
            if let Some(ip) = ip.and_then(|ip| ip.trim().parse::<IpAddr>().ok()) {
                segments.push(&ip.to_string());
            }
            segments.push("json");
        }
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}

#[async_trait]
impl GeoIpLookup for IpInfoGeoLookup {
    async fn lookup(&self, ip: Option<&str>) -> UpstreamResult<GeoIpInfo> {
        let url = self.url_for(ip)?;
        let body: IpInfoResponse = self.http.get_json(url.as_str(), &[]).await?;

        let loc = body
            .loc
            .ok_or_else(|| UpstreamError::InvalidResponse("geo-IP response has no 'loc'".into()))?;
        let (lat, lon) = parse_loc(&loc)
            .ok_or_else(|| UpstreamError::InvalidResponse(format!("malformed loc '{loc}'")))?;
        let region = body
            .region
            .filter(|region| !region.is_empty())
            .ok_or_else(|| UpstreamError::InvalidResponse("geo-IP response has no 'region'".into()))?;

        Ok(GeoIpInfo { lat, lon, region })
    }
}

use std::time::Duration;

use reqwest::{Client, RequestBuilder, header};
use serde::{Serialize, de::DeserializeOwned};

use crate::ports::{UpstreamError, UpstreamResult};

/// Default User-Agent sent to lookup services
pub const DEFAULT_USER_AGENT: &str = concat!("shipfee/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP client shared by the lookup adapters.
///
/// Responsibilities:
/// * Applies a per-request timeout and a User-Agent
/// * Maps transport, status and decode failures to [`UpstreamError`]
///
/// No retries are attempted here.
#[derive(Clone, Debug)]
pub struct JsonHttpClient {
    client: Client,
    timeout: Duration,
}

impl JsonHttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| UpstreamError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode the JSON body.
    ///
    /// # Arguments
    /// * `url` - Absolute URL
    /// * `headers` - Extra request headers, e.g. API tokens
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> UpstreamResult<T> {
        let request = Self::with_headers(self.client.get(url), headers);
        self.send(url, request).await
    }

    /// POST a JSON body to `url` and decode the JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> UpstreamResult<T> {
        let request = Self::with_headers(self.client.post(url).json(body), headers);
        self.send(url, request).await
    }

    fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
        request = request.header(header::ACCEPT, "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request
    }

    async fn send<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> UpstreamResult<T> {
        tracing::debug!(url, "Calling upstream");
        let response = request.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }

    fn map_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else if err.is_decode() {
            UpstreamError::InvalidResponse(err.to_string())
        } else {
            UpstreamError::Unreachable(err.to_string())
        }
    }
}

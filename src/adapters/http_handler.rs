//! HTTP surface of the engine.
//!
//! | Method | Path                          | Body / query          |
//! |--------|-------------------------------|-----------------------|
//! | POST   | `/api/v1/shipping/quote`      | [`QuoteRequest`]      |
//! | GET    | `/api/v1/location`            | `?ip=` (optional)     |
//! | POST   | `/api/v1/addresses/canonical` | [`AddressIds`]        |
//! | GET    | `/health`                     |                       |
use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    Json, Router,
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::{
    core::{
        AddressCanonicalizer, AddressIds, CallerIdentity, CanonicalAddress, Location,
        ProductShipping, QuoteResponse, ServiceTier, ShippingError, ShippingFeeCache,
        ShippingResult,
    },
    tracing_setup::{create_quote_span, create_resolve_span},
};

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer.
#[derive(Debug, Clone, PartialEq)]
pub struct CallerIp(pub Option<String>);

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

/// First parseable address from the proxy headers. Values that are not IP
/// addresses are skipped.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded_for = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(parse_ip);
    forwarded_for.or_else(|| {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_ip)
    })
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = forwarded_ip(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        });
        Ok(CallerIp(ip.map(|ip| ip.to_string())))
    }
}

/// Domain error rendered as a JSON response
#[derive(Debug)]
pub struct ApiError(pub ShippingError);

impl From<ShippingError> for ApiError {
    fn from(err: ShippingError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ShippingError::Validation(_) => StatusCode::BAD_REQUEST,
            ShippingError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

/// Body of a quote request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tier: Option<ServiceTier>,
    pub products: Vec<ProductShipping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteListResponse {
    pub quotes: Vec<QuoteResponse>,
}

#[derive(Debug, Deserialize)]
struct LocationQuery {
    ip: Option<String>,
}

#[derive(Clone)]
struct AppState {
    engine: Arc<ShippingFeeCache>,
    canonicalizer: Arc<AddressCanonicalizer>,
    default_tier: ServiceTier,
}

/// Builds the axum router over the shipping engine.
#[derive(Clone)]
pub struct HttpHandler {
    state: AppState,
}

impl HttpHandler {
    pub fn new(
        engine: Arc<ShippingFeeCache>,
        canonicalizer: Arc<AddressCanonicalizer>,
        default_tier: ServiceTier,
    ) -> Self {
        Self {
            state: AppState {
                engine,
                canonicalizer,
                default_tier,
            },
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/api/v1/shipping/quote", post(quote))
            .route("/api/v1/location", get(location))
            .route("/api/v1/addresses/canonical", post(canonical_address))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn quote(
    State(state): State<AppState>,
    CallerIp(caller_ip): CallerIp,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteListResponse>, ApiError> {
    let tier = request.tier.unwrap_or(state.default_tier);
    let caller = CallerIdentity::new(request.user_id, caller_ip);
    let span = create_quote_span(caller.key(), request.products.len());

    let quotes: ShippingResult<Vec<QuoteResponse>> = async {
        tracing::info!(%tier, "Quote requested");
        match request.products.as_slice() {
            [product] => Ok(vec![state.engine.quote(product, tier, &caller).await?]),
            products => state.engine.quote_many(products, tier, &caller).await,
        }
    }
    .instrument(span)
    .await;
    Ok(Json(QuoteListResponse { quotes: quotes? }))
}

async fn location(
    State(state): State<AppState>,
    CallerIp(caller_ip): CallerIp,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Location>, ApiError> {
    let ip = match query.ip {
        Some(raw) => match parse_ip(&raw) {
            Some(ip) => Some(ip.to_string()),
            None => {
                return Err(ShippingError::Validation(format!(
                    "'{raw}' is not an IP address"
                ))
                .into());
            }
        },
        None => caller_ip,
    };
    let location = state
        .engine
        .resolver()
        .resolve_ip(ip.as_deref())
        .instrument(create_resolve_span(ip.as_deref()))
        .await?;
    Ok(Json(location))
}

async fn canonical_address(
    State(state): State<AppState>,
    Json(ids): Json<AddressIds>,
) -> Result<Json<CanonicalAddress>, ApiError> {
    Ok(Json(state.canonicalizer.canonicalize(&ids).await?))
}

//! API route handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::{debug, info};

use userhub_core::constants::ANONYMOUS_CLIENT;
use userhub_core::error::UserhubError;
use userhub_core::types::{CacheKey, LookupField};
use userhub_service::ServiceStats;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// Header identifying the caller for rate limiting.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Rate-limit identity of the caller.
fn client_id(headers: &HeaderMap) -> &str {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
}

/// Admits the caller, looks the key up and records the handler latency.
///
/// Every admitted request is sampled, failed or not; rejected ones are not.
async fn lookup(state: &AppState, headers: &HeaderMap, key: CacheKey) -> Result<Json<LookupResponse>> {
    let start = Instant::now();
    let client = client_id(headers);

    let outcome = state.service.admit_and_lookup(client, &key).await;

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    if !matches!(outcome, Err(UserhubError::RateLimited { .. })) {
        state.service.record_latency(latency_ms);
    }
    let lookup = outcome?;

    let user = lookup
        .user
        .ok_or_else(|| ApiError::not_found(format!("No user for key '{}'", key)))?;

    debug!(%key, client, from_cache = lookup.from_cache, latency_ms, "Served lookup");

    Ok(Json(LookupResponse {
        user: UserDto::from(user.as_ref()),
        from_cache: lookup.from_cache,
        latency_ms,
    }))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<LookupResponse>> {
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|_| ApiError::bad_request(format!("'{}' is not a numeric user id", id)))?;
    lookup(&state, &headers, CacheKey::user(id)).await
}

/// GET /api/v1/users/by/:field/:value
pub async fn get_user_by_field(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((field, value)): Path<(String, String)>,
) -> Result<Json<LookupResponse>> {
    let field: LookupField = field.parse()?;
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("Empty {}", field)));
    }
    lookup(&state, &headers, CacheKey::user_by(field, &value)).await
}

/// GET /api/v1/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<ServiceStats> {
    Json(state.service.stats())
}

/// POST /api/v1/cache/clear
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<ClearResponse> {
    let cleared_entries = state.service.stats().size;
    state.service.clear();
    info!(cleared_entries, "Cache cleared");
    Json(ClearResponse { cleared_entries })
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use axum_extra::{TypedHeader, headers::UserAgent};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use encore_types::api::TrackVisitRequest;
use encore_types::models::{DashboardSummary, VisitStats};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_STATS_DAYS: u32 = 30;
const MAX_STATS_DAYS: u32 = 365;
const MAX_PATH_LEN: usize = 512;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

/// Record a page view. Visitors are identified only by a daily hash.
pub async fn track_visit(
    State(state): State<AppState>,
    headers: HeaderMap,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(req): Json<TrackVisitRequest>,
) -> Result<StatusCode, ApiError> {
    let path = req.path.trim();
    if path.is_empty() {
        return Err(ApiError::bad_request("path is required"));
    }
    let path: String = path.chars().take(MAX_PATH_LEN).collect();

    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or("unknown");
    let agent = user_agent.as_ref().map(|TypedHeader(ua)| ua.as_str()).unwrap_or("unknown");
    let hash = visitor_hash(forwarded_for, agent, Utc::now().date_naive());

    state.run_db(move |db| db.insert_visit(&path, &hash)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn visit_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<VisitStats>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS);
    let today = Utc::now().date_naive();
    Ok(Json(state.run_db(move |db| db.visit_stats(days, today)).await?))
}

pub async fn dashboard_summary(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let today = Utc::now().date_naive();
    Ok(Json(state.run_db(move |db| db.dashboard_summary(today)).await?))
}

/// SHA-256 of address, user agent and day, hex-encoded. The same visitor
/// hashes differently on different days.
pub fn visitor_hash(address: &str, user_agent: &str, day: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(address.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(day.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

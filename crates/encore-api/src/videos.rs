use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use encore_types::api::{NewVideo, ReorderRequest, VideoPatch};
use encore_types::models::Video;

use crate::error::ApiError;
use crate::state::AppState;

/// Videos in display order.
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.run_db(|db| db.list_videos()).await?))
}

pub async fn add_video(
    State(state): State<AppState>,
    Json(new): Json<NewVideo>,
) -> Result<impl IntoResponse, ApiError> {
    if new.title.trim().is_empty() || new.url.trim().is_empty() {
        return Err(ApiError::bad_request("title and url are required"));
    }

    let video = state.run_db(move |db| db.insert_video(&new)).await?;
    state.dispatcher.publish_insert(&video);

    Ok((StatusCode::CREATED, Json(video)))
}

pub async fn update_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<VideoPatch>,
) -> Result<Json<Video>, ApiError> {
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&patch.title) || blank(&patch.url) {
        return Err(ApiError::bad_request("title and url cannot be blank"));
    }

    let video = state
        .run_db(move |db| db.update_video(id, &patch))
        .await?
        .ok_or(ApiError::NotFound("video"))?;

    state.dispatcher.publish_update(&video);
    Ok(Json(video))
}

/// Remaining videos keep their `order_index`; the next reorder compacts it.
pub async fn delete_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.run_db(move |db| db.delete_video(id)).await? {
        return Err(ApiError::NotFound("video"));
    }

    state.dispatcher.publish_delete::<Video>(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// Persist a full ordering in one transaction. Every video must appear
/// exactly once.
pub async fn reorder_videos(
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<Video>>, ApiError> {
    let videos = state
        .run_db(move |db| db.reorder_videos(&req.ids))
        .await?
        .ok_or_else(|| ApiError::Conflict("order must list every video exactly once".into()))?;

    info!("Video order saved ({} videos)", videos.len());
    for video in &videos {
        state.dispatcher.publish_update(video);
    }

    Ok(Json(videos))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use encore_types::api::{NewSongRequest, SongRequestPatch};
use encore_types::models::SongRequest;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn submit_song_request(
    State(state): State<AppState>,
    Json(new): Json<NewSongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if new.requester_name.trim().is_empty() || new.song_title.trim().is_empty() {
        return Err(ApiError::bad_request("name and song title are required"));
    }

    let request = state.run_db(move |db| db.insert_song_request(&new)).await?;
    state.dispatcher.publish_insert(&request);

    Ok((StatusCode::CREATED, Json(request)))
}

/// Queue order, oldest first.
pub async fn list_song_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<SongRequest>>, ApiError> {
    Ok(Json(state.run_db(|db| db.list_song_requests()).await?))
}

pub async fn update_song_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SongRequestPatch>,
) -> Result<Json<SongRequest>, ApiError> {
    let request = state
        .run_db(move |db| db.update_song_request_status(id, patch.status))
        .await?
        .ok_or(ApiError::NotFound("song request"))?;

    state.dispatcher.publish_update(&request);
    Ok(Json(request))
}

pub async fn delete_song_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.run_db(move |db| db.delete_song_request(id)).await? {
        return Err(ApiError::NotFound("song request"));
    }

    state.dispatcher.publish_delete::<SongRequest>(&id);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use encore_types::api::{CalendarPatch, NewCalendarItem};
use encore_types::models::CalendarItem;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_calendar_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<CalendarItem>>, ApiError> {
    Ok(Json(state.run_db(|db| db.list_calendar_items()).await?))
}

pub async fn add_calendar_item(
    State(state): State<AppState>,
    Json(new): Json<NewCalendarItem>,
) -> Result<impl IntoResponse, ApiError> {
    if new.title.trim().is_empty() || new.platform.trim().is_empty() {
        return Err(ApiError::bad_request("title and platform are required"));
    }

    let item = state
        .run_db(move |db| {
            if !linked_video_exists(db, new.video_id)? {
                return Ok(None);
            }
            db.insert_calendar_item(&new).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("linked video does not exist"))?;

    state.dispatcher.publish_insert(&item);
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_calendar_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CalendarPatch>,
) -> Result<Json<CalendarItem>, ApiError> {
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&patch.title) || blank(&patch.platform) {
        return Err(ApiError::bad_request("title and platform cannot be blank"));
    }

    let item = state
        .run_db(move |db| {
            if !linked_video_exists(db, patch.video_id)? {
                return Ok(Err(ApiError::bad_request("linked video does not exist")));
            }
            Ok(db
                .update_calendar_item(id, &patch)?
                .ok_or(ApiError::NotFound("calendar item")))
        })
        .await??;

    state.dispatcher.publish_update(&item);
    Ok(Json(item))
}

pub async fn delete_calendar_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.run_db(move |db| db.delete_calendar_item(id)).await? {
        return Err(ApiError::NotFound("calendar item"));
    }

    state.dispatcher.publish_delete::<CalendarItem>(&id);
    Ok(StatusCode::NO_CONTENT)
}

fn linked_video_exists(db: &encore_db::Database, video_id: Option<Uuid>) -> anyhow::Result<bool> {
    match video_id {
        Some(id) => Ok(db.get_video(id)?.is_some()),
        None => Ok(true),
    }
}

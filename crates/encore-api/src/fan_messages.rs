use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use encore_types::api::{FanMessagePatch, NewFanMessage};
use encore_types::models::FanMessage;

use crate::error::ApiError;
use crate::state::AppState;

/// Public contact form.
pub async fn submit_fan_message(
    State(state): State<AppState>,
    Json(new): Json<NewFanMessage>,
) -> Result<impl IntoResponse, ApiError> {
    new.validate().map_err(ApiError::bad_request)?;

    let message = state.run_db(move |db| db.insert_fan_message(&new)).await?;
    info!("New fan message {}", message.id);
    state.dispatcher.publish_insert(&message);

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_fan_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<FanMessage>>, ApiError> {
    Ok(Json(state.run_db(|db| db.list_fan_messages()).await?))
}

/// Mark read/unread or reply. A reply also marks the message read.
pub async fn update_fan_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<FanMessagePatch>,
) -> Result<Json<FanMessage>, ApiError> {
    if patch.reply.as_deref().is_some_and(|r| r.trim().is_empty()) {
        return Err(ApiError::bad_request("reply cannot be blank"));
    }

    let message = state
        .run_db(move |db| db.update_fan_message(id, &patch))
        .await?
        .ok_or(ApiError::NotFound("fan message"))?;

    state.dispatcher.publish_update(&message);
    Ok(Json(message))
}

pub async fn delete_fan_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.run_db(move |db| db.delete_fan_message(id)).await? {
        return Err(ApiError::NotFound("fan message"));
    }

    state.dispatcher.publish_delete::<FanMessage>(&id);
    Ok(StatusCode::NO_CONTENT)
}

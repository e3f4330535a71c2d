use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use encore_types::api::{Claims, EditMessageRequest, SendMessageRequest};
use encore_types::models::ChatMessage;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let messages = state.run_db(|db| db.list_chat_messages()).await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !req.has_content() {
        return Err(ApiError::bad_request("message needs text or a video"));
    }

    let message = state
        .run_db(move |db| {
            if let Some(video_id) = req.video_id {
                if db.get_video(video_id)?.is_none() {
                    return Ok(None);
                }
            }
            db.insert_chat_message(&claims.sub, &claims.name, &req).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("attached video does not exist"))?;

    debug!("{} sent chat message {}", message.sender_id, message.id);
    state.dispatcher.publish_insert(&message);

    Ok((StatusCode::CREATED, Json(message)))
}

/// Only the original sender may edit a message.
pub async fn edit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::bad_request("message body is required"));
    }

    let existing = state
        .run_db(move |db| db.get_chat_message(id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;

    if existing.sender_id != claims.sub {
        return Err(ApiError::Forbidden("only the sender can edit this message".into()));
    }

    let message = state
        .run_db(move |db| db.edit_chat_message(id, &req.body))
        .await?
        .ok_or(ApiError::NotFound("message"))?;

    state.dispatcher.publish_update(&message);
    Ok(Json(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.run_db(move |db| db.delete_chat_message(id)).await? {
        return Err(ApiError::NotFound("message"));
    }

    state.dispatcher.publish_delete::<ChatMessage>(&id);
    Ok(StatusCode::NO_CONTENT)
}

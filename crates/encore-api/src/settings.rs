use axum::{Json, extract::State};

use encore_types::api::SettingsPatch;
use encore_types::models::SiteSettings;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.run_db(|db| db.get_settings()).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<SiteSettings>, ApiError> {
    let settings = state.run_db(move |db| db.update_settings(&patch)).await?;
    state.dispatcher.publish_update(&settings);
    Ok(Json(settings))
}

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::rejection::WebSocketUpgradeRejection,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use encore_gateway::connection;

use crate::auth::verify_token;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// Upgrade to the change feed. Anonymous clients may follow public tables;
/// a token that is present but invalid is refused before the upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let authenticated = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            if verify_token(&state, token).is_none() {
                return ApiError::Unauthorized.into_response();
            }
            true
        }
        None => false,
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, authenticated))
        .into_response()
}

use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, patch, post, put},
};

use encore_types::api::HealthResponse;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{analytics, auth, calendar, chat, fan_messages, gateway, settings, song_requests, videos};

/// Every REST route plus the change-feed upgrade. Cross-cutting layers
/// (CORS, tracing) are added by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .route("/videos", get(videos::list_videos))
        .route("/settings", get(settings::get_settings))
        .route("/fan-messages", post(fan_messages::submit_fan_message))
        .route("/song-requests", post(song_requests::submit_song_request))
        .route("/visits", post(analytics::track_visit))
        .route("/gateway", get(gateway::ws_upgrade));

    let admin_routes = Router::new()
        .route("/chat/messages", get(chat::list_messages).post(chat::send_message))
        .route(
            "/chat/messages/{id}",
            patch(chat::edit_message).delete(chat::delete_message),
        )
        .route("/videos", post(videos::add_video))
        .route("/videos/order", put(videos::reorder_videos))
        .route(
            "/videos/{id}",
            patch(videos::update_video).delete(videos::delete_video),
        )
        .route("/settings", patch(settings::update_settings))
        .route("/fan-messages", get(fan_messages::list_fan_messages))
        .route(
            "/fan-messages/{id}",
            patch(fan_messages::update_fan_message).delete(fan_messages::delete_fan_message),
        )
        .route("/song-requests", get(song_requests::list_song_requests))
        .route(
            "/song-requests/{id}",
            patch(song_requests::update_song_request).delete(song_requests::delete_song_request),
        )
        .route(
            "/calendar",
            get(calendar::list_calendar_items).post(calendar::add_calendar_item),
        )
        .route(
            "/calendar/{id}",
            patch(calendar::update_calendar_item).delete(calendar::delete_calendar_item),
        )
        .route("/analytics/visits", get(analytics::visit_stats))
        .route("/analytics/summary", get(analytics::dashboard_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        feed_connections: state.dispatcher.connection_count().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use encore_types::events::{Change, RowChange, Table};
    use encore_types::models::{ChatMessage, Video};

    use crate::auth::create_token;
    use crate::state::{TEST_PASSWORD, test_state};

    fn token_for(state: &AppState, id: &str) -> String {
        create_token(&state.jwt_secret, id, id).unwrap()
    }

    async fn call(
        state: &AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = router(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn add_video(state: &AppState, token: &str, title: &str) -> Video {
        let (status, body) = call(
            state,
            "POST",
            "/videos",
            Some(token),
            Some(json!({ "title": title, "url": format!("https://youtu.be/{}", title) })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn login_issues_a_usable_token() {
        let state = test_state();

        let (status, body) = call(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "artist", "password": TEST_PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], "artist");

        let token = body["token"].as_str().unwrap();
        let (status, _) = call(&state, "GET", "/chat/messages", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn login_rejects_bad_password() {
        let state = test_state();
        let (status, body) = call(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "artist", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn admin_routes_need_a_token() {
        let state = test_state();

        let (status, _) = call(&state, "GET", "/chat/messages", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&state, "GET", "/fan-messages", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &state,
            "POST",
            "/videos",
            None,
            Some(json!({ "title": "t", "url": "u" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn public_reads_need_no_token() {
        let state = test_state();

        let (status, body) = call(&state, "GET", "/videos", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = call(&state, "GET", "/settings", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hero_image"], "/images/hero.jpg");

        let (status, body) = call(&state, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn send_message_publishes_insert() {
        let state = test_state();
        let token = token_for(&state, "artist");
        let mut feed = state.dispatcher.subscribe();

        let (status, body) = call(
            &state,
            "POST",
            "/chat/messages",
            Some(&token),
            Some(json!({ "body": "  new cut is up  " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let sent: ChatMessage = serde_json::from_value(body).unwrap();
        assert_eq!(sent.body, "new cut is up");
        assert_eq!(sent.sender_id, "artist");

        let event = feed.recv().await.unwrap();
        assert_eq!(event.decode::<ChatMessage>().unwrap(), Some(RowChange::Insert(sent)));
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let state = test_state();
        let token = token_for(&state, "artist");

        let (status, _) = call(
            &state,
            "POST",
            "/chat/messages",
            Some(&token),
            Some(json!({ "body": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &state,
            "POST",
            "/chat/messages",
            Some(&token),
            Some(json!({ "video_id": Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn message_with_only_a_video_is_accepted() {
        let state = test_state();
        let token = token_for(&state, "editor");
        let video = add_video(&state, &token, "rough-mix").await;

        let (status, body) = call(
            &state,
            "POST",
            "/chat/messages",
            Some(&token),
            Some(json!({ "video_id": video.id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["video_id"], video.id.to_string());
    }

    #[tokio::test]
    async fn only_sender_can_edit() {
        let state = test_state();
        let artist = token_for(&state, "artist");
        let editor = token_for(&state, "editor");

        let (_, body) = call(
            &state,
            "POST",
            "/chat/messages",
            Some(&artist),
            Some(json!({ "body": "first take" })),
        )
        .await;
        let id = body["id"].as_str().unwrap().to_string();
        let uri = format!("/chat/messages/{}", id);

        let (status, _) = call(&state, "PATCH", &uri, Some(&editor), Some(json!({ "body": "x" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mut feed = state.dispatcher.subscribe();
        let (status, body) =
            call(&state, "PATCH", &uri, Some(&artist), Some(json!({ "body": "second take" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["body"], "second take");
        assert_eq!(body["edited"], true);

        let event = feed.recv().await.unwrap();
        assert!(matches!(event.change, Change::Update { .. }));
    }

    #[tokio::test]
    async fn delete_message_publishes_delete_and_404s_after() {
        let state = test_state();
        let token = token_for(&state, "artist");

        let (_, body) = call(
            &state,
            "POST",
            "/chat/messages",
            Some(&token),
            Some(json!({ "body": "oops" })),
        )
        .await;
        let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
        let uri = format!("/chat/messages/{}", id);

        let mut feed = state.dispatcher.subscribe();
        let (status, _) = call(&state, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let event = feed.recv().await.unwrap();
        assert_eq!(event.decode::<ChatMessage>().unwrap(), Some(RowChange::Delete(id)));

        let (status, _) = call(&state, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reorder_renumbers_and_rejects_partial_lists() {
        let state = test_state();
        let token = token_for(&state, "editor");
        let a = add_video(&state, &token, "a").await;
        let b = add_video(&state, &token, "b").await;
        let c = add_video(&state, &token, "c").await;

        let (status, _) = call(
            &state,
            "PUT",
            "/videos/order",
            Some(&token),
            Some(json!({ "ids": [c.id, a.id] })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(
            &state,
            "PUT",
            "/videos/order",
            Some(&token),
            Some(json!({ "ids": [c.id, a.id, b.id] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let videos: Vec<Video> = serde_json::from_value(body).unwrap();
        let order: Vec<(Uuid, i64)> = videos.iter().map(|v| (v.id, v.order_index)).collect();
        assert_eq!(order, vec![(c.id, 0), (a.id, 1), (b.id, 2)]);

        let (_, body) = call(&state, "GET", "/videos", None, None).await;
        assert_eq!(body[0]["id"], c.id.to_string());
    }

    #[tokio::test]
    async fn video_patch_and_delete() {
        let state = test_state();
        let token = token_for(&state, "editor");
        let video = add_video(&state, &token, "demo").await;
        let uri = format!("/videos/{}", video.id);

        let (status, body) =
            call(&state, "PATCH", &uri, Some(&token), Some(json!({ "status": "completed" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");

        let (status, _) =
            call(&state, "PATCH", &uri, Some(&token), Some(json!({ "title": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&state, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) =
            call(&state, "PATCH", &uri, Some(&token), Some(json!({ "title": "gone" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn settings_patch_is_partial_and_published() {
        let state = test_state();
        let token = token_for(&state, "artist");
        let mut feed = state.dispatcher.subscribe();

        let (status, body) = call(
            &state,
            "PATCH",
            "/settings",
            Some(&token),
            Some(json!({ "about_text": "Singer, songwriter" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["about_text"], "Singer, songwriter");
        assert_eq!(body["hero_image"], "/images/hero.jpg");

        let event = feed.recv().await.unwrap();
        assert_eq!(event.table, Table::Settings);

        let (status, _) = call(
            &state,
            "PATCH",
            "/settings",
            Some(&token),
            Some(json!({ "background": "blue" })),
        )
        .await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn fan_message_flow() {
        let state = test_state();
        let token = token_for(&state, "artist");

        let (status, _) = call(
            &state,
            "POST",
            "/fan-messages",
            None,
            Some(json!({ "name": "Lu", "email": "not-an-email", "body": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &state,
            "POST",
            "/fan-messages",
            None,
            Some(json!({ "name": "Lu", "email": "lu@example.com", "body": "See you in Porto!" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/fan-messages/{}", body["id"].as_str().unwrap());

        let (status, body) =
            call(&state, "PATCH", &uri, Some(&token), Some(json!({ "reply": "See you there" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["read"], true);
        assert!(body["replied_at"].is_string());

        let (_, summary) = call(&state, "GET", "/analytics/summary", Some(&token), None).await;
        assert_eq!(summary["fan_messages_unread"], 0);
    }

    #[tokio::test]
    async fn song_request_queue() {
        let state = test_state();
        let token = token_for(&state, "editor");

        for title in ["Wonderwall", "Hallelujah"] {
            let (status, _) = call(
                &state,
                "POST",
                "/song-requests",
                None,
                Some(json!({ "requester_name": "Ana", "song_title": title })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, list) = call(&state, "GET", "/song-requests", Some(&token), None).await;
        assert_eq!(list[0]["song_title"], "Wonderwall");

        let uri = format!("/song-requests/{}", list[0]["id"].as_str().unwrap());
        let (status, body) =
            call(&state, "PATCH", &uri, Some(&token), Some(json!({ "status": "accepted" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "accepted");
    }

    #[tokio::test]
    async fn calendar_rejects_unknown_video_link() {
        let state = test_state();
        let token = token_for(&state, "editor");

        let (status, _) = call(
            &state,
            "POST",
            "/calendar",
            Some(&token),
            Some(json!({
                "title": "Teaser",
                "platform": "instagram",
                "scheduled_for": "2030-01-05",
                "video_id": Uuid::new_v4(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &state,
            "POST",
            "/calendar",
            Some(&token),
            Some(json!({ "title": "Teaser", "platform": "instagram", "scheduled_for": "2030-01-05" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "idea");

        let uri = format!("/calendar/{}", body["id"].as_str().unwrap());
        let (status, body) =
            call(&state, "PATCH", &uri, Some(&token), Some(json!({ "status": "scheduled" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "scheduled");
    }

    #[tokio::test]
    async fn visits_are_counted_and_days_clamped() {
        let state = test_state();
        let token = token_for(&state, "artist");

        let (status, _) = call(&state, "POST", "/visits", None, Some(json!({ "path": "/" }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&state, "POST", "/visits", None, Some(json!({ "path": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, stats) = call(&state, "GET", "/analytics/visits", Some(&token), None).await;
        assert_eq!(stats["total_visits"], 1);
        assert_eq!(stats["per_day"].as_array().unwrap().len(), 30);

        let (_, stats) = call(&state, "GET", "/analytics/visits?days=5000", Some(&token), None).await;
        assert_eq!(stats["per_day"].as_array().unwrap().len(), 365);
    }

    #[tokio::test]
    async fn gateway_refuses_invalid_token() {
        let state = test_state();
        let (status, _) = call(&state, "GET", "/gateway?token=garbage", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&state, "GET", "/gateway", None, None).await;
        assert!(status.is_client_error());
    }
}

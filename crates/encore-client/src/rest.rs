//! HTTP data access layer over the Encore REST API.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};
use uuid::Uuid;

use encore_types::api::{
    CalendarPatch, EditMessageRequest, ErrorResponse, FanMessagePatch, LoginRequest, LoginResponse,
    NewCalendarItem, NewFanMessage, NewSongRequest, NewVideo, ReorderRequest, SendMessageRequest,
    SettingsPatch, SongRequestPatch, TrackVisitRequest, VideoPatch,
};
use encore_types::events::{Row, RowChange};
use encore_types::models::{
    CalendarItem, ChatMessage, DashboardSummary, FanMessage, SiteSettings, SongRequest,
    SongRequestStatus, Video, VisitStats,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::feed::{self, Subscription};
use crate::session::Session;
use crate::store::{ChatStore, VideoStore};

/// Which requests carry the session token.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Admin,
}

pub struct RestStore {
    http: Client,
    config: ClientConfig,
    session: Option<Session>,
}

impl RestStore {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    // -- Session --

    pub async fn login(&mut self, username: &str, password: &str) -> Result<&Session> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let res: LoginResponse = self.send_json(Method::POST, "/auth/login", Access::Public, &body).await?;
        info!("Signed in as {}", res.user_id);
        Ok(self.session.insert(Session::from(res)))
    }

    /// Forget the session. Tokens are stateless, so nothing is sent.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Signed out {}", session.user.id);
        }
    }

    // -- Videos --

    pub async fn get_videos(&self) -> Result<Vec<Video>> {
        self.get("/videos", Access::Public).await
    }

    pub async fn add_video(&self, video: &NewVideo) -> Result<Video> {
        self.send_json(Method::POST, "/videos", Access::Admin, video).await
    }

    pub async fn update_video(&self, id: Uuid, patch: &VideoPatch) -> Result<Video> {
        self.send_json(Method::PATCH, &format!("/videos/{}", id), Access::Admin, patch)
            .await
    }

    pub async fn delete_video(&self, id: Uuid) -> Result<()> {
        self.delete(&format!("/videos/{}", id)).await
    }

    /// Persist a full ordering; `ids[0]` gets `order_index` 0.
    pub async fn reorder_videos(&self, ids: Vec<Uuid>) -> Result<Vec<Video>> {
        self.send_json(Method::PUT, "/videos/order", Access::Admin, &ReorderRequest { ids })
            .await
    }

    pub async fn subscribe_to_videos(
        &self,
        tx: UnboundedSender<RowChange<Video>>,
    ) -> Result<Subscription> {
        self.subscribe(tx).await
    }

    // -- Settings --

    pub async fn get_settings(&self) -> Result<SiteSettings> {
        self.get("/settings", Access::Public).await
    }

    pub async fn update_settings(&self, patch: &SettingsPatch) -> Result<SiteSettings> {
        self.send_json(Method::PATCH, "/settings", Access::Admin, patch).await
    }

    pub async fn subscribe_to_settings(
        &self,
        tx: UnboundedSender<RowChange<SiteSettings>>,
    ) -> Result<Subscription> {
        self.subscribe(tx).await
    }

    // -- Chat --

    pub async fn get_chat_messages(&self) -> Result<Vec<ChatMessage>> {
        self.get("/chat/messages", Access::Admin).await
    }

    pub async fn send_chat_message(&self, req: &SendMessageRequest) -> Result<ChatMessage> {
        self.send_json(Method::POST, "/chat/messages", Access::Admin, req).await
    }

    pub async fn edit_chat_message(&self, id: Uuid, body: &str) -> Result<ChatMessage> {
        let req = EditMessageRequest {
            body: body.to_string(),
        };
        self.send_json(Method::PATCH, &format!("/chat/messages/{}", id), Access::Admin, &req)
            .await
    }

    pub async fn delete_chat_message(&self, id: Uuid) -> Result<()> {
        self.delete(&format!("/chat/messages/{}", id)).await
    }

    pub async fn subscribe_to_chat(
        &self,
        tx: UnboundedSender<RowChange<ChatMessage>>,
    ) -> Result<Subscription> {
        self.subscribe(tx).await
    }

    // -- Fan messages --

    pub async fn submit_fan_message(&self, message: &NewFanMessage) -> Result<FanMessage> {
        message
            .validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        self.send_json(Method::POST, "/fan-messages", Access::Public, message).await
    }

    pub async fn get_fan_messages(&self) -> Result<Vec<FanMessage>> {
        self.get("/fan-messages", Access::Admin).await
    }

    pub async fn mark_fan_message_read(&self, id: Uuid, read: bool) -> Result<FanMessage> {
        let patch = FanMessagePatch {
            read: Some(read),
            reply: None,
        };
        self.patch_fan_message(id, &patch).await
    }

    pub async fn reply_to_fan_message(&self, id: Uuid, reply: &str) -> Result<FanMessage> {
        let patch = FanMessagePatch {
            read: None,
            reply: Some(reply.to_string()),
        };
        self.patch_fan_message(id, &patch).await
    }

    async fn patch_fan_message(&self, id: Uuid, patch: &FanMessagePatch) -> Result<FanMessage> {
        self.send_json(Method::PATCH, &format!("/fan-messages/{}", id), Access::Admin, patch)
            .await
    }

    pub async fn delete_fan_message(&self, id: Uuid) -> Result<()> {
        self.delete(&format!("/fan-messages/{}", id)).await
    }

    // -- Song requests --

    pub async fn submit_song_request(&self, request: &NewSongRequest) -> Result<SongRequest> {
        self.send_json(Method::POST, "/song-requests", Access::Public, request).await
    }

    pub async fn get_song_requests(&self) -> Result<Vec<SongRequest>> {
        self.get("/song-requests", Access::Admin).await
    }

    pub async fn update_song_request_status(
        &self,
        id: Uuid,
        status: SongRequestStatus,
    ) -> Result<SongRequest> {
        self.send_json(
            Method::PATCH,
            &format!("/song-requests/{}", id),
            Access::Admin,
            &SongRequestPatch { status },
        )
        .await
    }

    pub async fn delete_song_request(&self, id: Uuid) -> Result<()> {
        self.delete(&format!("/song-requests/{}", id)).await
    }

    // -- Content calendar --

    pub async fn get_calendar_items(&self) -> Result<Vec<CalendarItem>> {
        self.get("/calendar", Access::Admin).await
    }

    pub async fn add_calendar_item(&self, item: &NewCalendarItem) -> Result<CalendarItem> {
        self.send_json(Method::POST, "/calendar", Access::Admin, item).await
    }

    pub async fn update_calendar_item(&self, id: Uuid, patch: &CalendarPatch) -> Result<CalendarItem> {
        self.send_json(Method::PATCH, &format!("/calendar/{}", id), Access::Admin, patch)
            .await
    }

    pub async fn delete_calendar_item(&self, id: Uuid) -> Result<()> {
        self.delete(&format!("/calendar/{}", id)).await
    }

    // -- Analytics --

    /// Record a page view. Fire-and-forget from the caller's point of view,
    /// but failures are still reported.
    pub async fn track_visit(&self, path: &str) -> Result<()> {
        let req = TrackVisitRequest {
            path: path.to_string(),
        };
        let builder = self.request(Method::POST, "/visits", Access::Public)?.json(&req);
        check(builder.send().await?).await?;
        Ok(())
    }

    /// Visit statistics for the last `days` days (server default 30).
    pub async fn get_visit_stats(&self, days: Option<u32>) -> Result<VisitStats> {
        let path = match days {
            Some(days) => format!("/analytics/visits?days={}", days),
            None => "/analytics/visits".to_string(),
        };
        self.get(&path, Access::Admin).await
    }

    pub async fn get_dashboard_summary(&self) -> Result<DashboardSummary> {
        self.get("/analytics/summary", Access::Admin).await
    }

    // -- Plumbing --

    async fn subscribe<T: Row>(&self, tx: UnboundedSender<RowChange<T>>) -> Result<Subscription> {
        let token = self.session.as_ref().map(|s| s.token.as_str());
        feed::subscribe(&self.config, token, tx).await
    }

    fn request(&self, method: Method, path: &str, access: Access) -> Result<RequestBuilder> {
        let builder = self.http.request(method, self.config.endpoint(path));
        match (access, &self.session) {
            (_, Some(session)) => Ok(builder.bearer_auth(&session.token)),
            (Access::Public, None) => Ok(builder),
            (Access::Admin, None) => Err(ClientError::NotAuthenticated),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, access: Access) -> Result<T> {
        debug!("GET {}", path);
        let res = check(self.request(Method::GET, path, access)?.send().await?).await?;
        Ok(res.json().await?)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, access: Access, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("{} {}", method, path);
        let builder = self.request(method, path, access)?.json(body);
        let res = check(builder.send().await?).await?;
        Ok(res.json().await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!("DELETE {}", path);
        check(self.request(Method::DELETE, path, Access::Admin)?.send().await?).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into `ClientError::Status` with the server's
/// error message.
async fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

impl ChatStore for RestStore {
    async fn load_messages(&self) -> Result<Vec<ChatMessage>> {
        self.get_chat_messages().await
    }

    async fn send_message(&self, req: SendMessageRequest) -> Result<ChatMessage> {
        self.send_chat_message(&req).await
    }

    async fn edit_message(&self, id: Uuid, body: &str) -> Result<ChatMessage> {
        self.edit_chat_message(id, body).await
    }

    async fn delete_message(&self, id: Uuid) -> Result<()> {
        self.delete_chat_message(id).await
    }

    async fn subscribe_messages(
        &self,
        tx: UnboundedSender<RowChange<ChatMessage>>,
    ) -> Result<Subscription> {
        self.subscribe_to_chat(tx).await
    }
}

impl VideoStore for RestStore {
    async fn load_videos(&self) -> Result<Vec<Video>> {
        self.get_videos().await
    }

    async fn save_order(&self, ids: Vec<Uuid>) -> Result<Vec<Video>> {
        self.reorder_videos(ids).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use encore_api::auth::AdminAccounts;
    use encore_api::{AppState, AppStateInner};
    use encore_gateway::dispatcher::Dispatcher;
    use encore_types::models::VideoStatus;
    use tokio::sync::mpsc;

    const PASSWORD: &str = "green-room";

    /// Serve the real API on an ephemeral port.
    async fn spawn_server() -> (ClientConfig, AppState) {
        let mut accounts = AdminAccounts::new();
        accounts.add("artist", "Artist", PASSWORD).unwrap();
        accounts.add("editor", "Editor", PASSWORD).unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db: encore_db::Database::open_in_memory().unwrap(),
            dispatcher: Dispatcher::new(),
            jwt_secret: "client-test-secret".into(),
            accounts,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = encore_api::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (ClientConfig::new(&format!("http://{}", addr)).unwrap(), state)
    }

    async fn signed_in(config: &ClientConfig, user: &str) -> RestStore {
        let mut store = RestStore::new(config.clone());
        store.login(user, PASSWORD).await.unwrap();
        store
    }

    fn new_video(title: &str) -> NewVideo {
        NewVideo {
            title: title.into(),
            url: format!("https://www.youtube.com/watch?v={}", title),
            thumbnail_url: None,
            status: VideoStatus::Pending,
        }
    }

    #[tokio::test]
    async fn login_and_logout() {
        let (config, _) = spawn_server().await;
        let mut store = RestStore::new(config);

        let err = store.login("artist", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(store.session().is_none());

        let session = store.login("artist", PASSWORD).await.unwrap();
        assert_eq!(session.user.id, "artist");
        assert!(store.get_chat_messages().await.is_ok());

        store.logout();
        assert!(matches!(store.get_chat_messages().await, Err(ClientError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn public_reads_work_anonymously() {
        let (config, _) = spawn_server().await;
        let store = RestStore::new(config);

        assert!(store.get_videos().await.unwrap().is_empty());
        assert_eq!(store.get_settings().await.unwrap(), SiteSettings::default());
        store.track_visit("/").await.unwrap();
    }

    #[tokio::test]
    async fn video_crud_and_reorder() {
        let (config, _) = spawn_server().await;
        let store = signed_in(&config, "editor").await;

        let a = store.add_video(&new_video("a")).await.unwrap();
        let b = store.add_video(&new_video("b")).await.unwrap();
        assert_eq!((a.order_index, b.order_index), (0, 1));

        let patched = store
            .update_video(a.id, &VideoPatch { status: Some(VideoStatus::Completed), ..VideoPatch::default() })
            .await
            .unwrap();
        assert_eq!(patched.status, VideoStatus::Completed);

        let ordered = store.reorder_videos(vec![b.id, a.id]).await.unwrap();
        assert_eq!(ordered.iter().map(|v| v.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        let err = store.reorder_videos(vec![a.id]).await.unwrap_err();
        assert_eq!(err.status(), Some(409));

        store.delete_video(a.id).await.unwrap();
        let err = store.delete_video(a.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let (config, _) = spawn_server().await;
        let store = signed_in(&config, "artist").await;

        let err = store
            .send_chat_message(&SendMessageRequest { body: " ".into(), video_id: None })
            .await
            .unwrap_err();
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "message needs text or a video");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn fan_messages_and_song_requests() {
        let (config, _) = spawn_server().await;
        let public = RestStore::new(config.clone());
        let admin = signed_in(&config, "artist").await;

        let bad = NewFanMessage { name: "Rui".into(), email: "nope".into(), body: "hi".into() };
        assert!(matches!(public.submit_fan_message(&bad).await, Err(ClientError::Validation(_))));

        let sent = public
            .submit_fan_message(&NewFanMessage { email: "rui@example.com".into(), ..bad })
            .await
            .unwrap();
        let read = admin.mark_fan_message_read(sent.id, true).await.unwrap();
        assert!(read.read);
        let replied = admin.reply_to_fan_message(sent.id, "Thanks!").await.unwrap();
        assert_eq!(replied.reply.as_deref(), Some("Thanks!"));

        let request = public
            .submit_song_request(&NewSongRequest {
                requester_name: "Rui".into(),
                song_title: "Fado Menor".into(),
                song_artist: None,
                note: None,
            })
            .await
            .unwrap();
        let updated = admin
            .update_song_request_status(request.id, SongRequestStatus::Performed)
            .await
            .unwrap();
        assert_eq!(updated.status, SongRequestStatus::Performed);

        let summary = admin.get_dashboard_summary().await.unwrap();
        assert_eq!(summary.fan_messages_unread, 0);
        assert_eq!(summary.song_requests_pending, 0);
    }

    #[tokio::test]
    async fn chat_feed_delivers_changes() {
        let (config, state) = spawn_server().await;
        let artist = signed_in(&config, "artist").await;
        let editor = signed_in(&config, "editor").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = editor.subscribe_to_chat(tx).await.unwrap();
        assert!(sub.is_active());
        assert_eq!(state.dispatcher.connection_count().await, 1);

        let sent = artist
            .send_chat_message(&SendMessageRequest { body: "on stage in 5".into(), video_id: None })
            .await
            .unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change, RowChange::Insert(sent));
    }

    #[tokio::test]
    async fn anonymous_feed_is_limited_to_public_tables() {
        let (config, _) = spawn_server().await;
        let anonymous = RestStore::new(config.clone());

        let (tx, _rx) = mpsc::unbounded_channel::<RowChange<ChatMessage>>();
        assert!(matches!(anonymous.subscribe_to_chat(tx).await, Err(ClientError::Feed(_))));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = anonymous.subscribe_to_settings(tx).await.unwrap();

        let admin = signed_in(&config, "artist").await;
        let saved = admin
            .update_settings(&SettingsPatch { contact_email: Some("booking@example.com".into()), ..SettingsPatch::default() })
            .await
            .unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change, RowChange::Update(saved));
    }
}

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc::UnboundedSender};
use tracing::warn;
use uuid::Uuid;

use encore_types::api::SendMessageRequest;
use encore_types::events::{FeedEvent, RowChange};
use encore_types::models::{ChatMessage, Video};

use crate::error::{ClientError, Result};
use crate::feed::{Subscription, forward};
use crate::store::{ChatStore, VideoStore};

/// In-process store for tests and offline use. Mutations are echoed to
/// subscribers the way the real change feed echoes them.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    feed: broadcast::Sender<FeedEvent>,
}

struct MemoryInner {
    sender_id: String,
    sender_name: String,
    messages: Vec<ChatMessage>,
    videos: Vec<Video>,
    fail_next: bool,
}

impl MemoryStore {
    /// Messages sent through this store are attributed to `sender_id`.
    pub fn new(sender_id: &str, sender_name: &str) -> Self {
        let (feed, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                sender_id: sender_id.to_string(),
                sender_name: sender_name.to_string(),
                messages: Vec::new(),
                videos: Vec::new(),
                fail_next: false,
            })),
            feed,
        }
    }

    pub fn with_messages(self, messages: Vec<ChatMessage>) -> Self {
        self.lock().messages = messages;
        self
    }

    pub fn with_videos(self, videos: Vec<Video>) -> Self {
        self.lock().videos = videos;
        self
    }

    /// Make the next store call fail with a 500.
    pub fn fail_next_call(&self) {
        self.lock().fail_next = true;
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    pub fn videos(&self) -> Vec<Video> {
        self.lock().videos.clone()
    }

    /// Publish a change as if another client had written it.
    pub fn push_remote(&self, event: FeedEvent) {
        let _ = self.feed.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn begin(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        let mut inner = self.lock();
        if std::mem::take(&mut inner.fail_next) {
            return Err(ClientError::Status {
                status: 500,
                message: "simulated failure".into(),
            });
        }
        Ok(inner)
    }

    fn echo(&self, event: std::result::Result<FeedEvent, serde_json::Error>) {
        match event {
            Ok(event) => {
                let _ = self.feed.send(event);
            }
            Err(e) => warn!("Failed to encode memory store event: {}", e),
        }
    }
}

impl ChatStore for MemoryStore {
    async fn load_messages(&self) -> Result<Vec<ChatMessage>> {
        let inner = self.begin()?;
        let mut messages = inner.messages.clone();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn send_message(&self, req: SendMessageRequest) -> Result<ChatMessage> {
        let message = {
            let mut inner = self.begin()?;
            let message = ChatMessage {
                id: Uuid::new_v4(),
                sender_id: inner.sender_id.clone(),
                sender_name: inner.sender_name.clone(),
                body: req.body.trim().to_string(),
                created_at: chrono::Utc::now(),
                video_id: req.video_id,
                edited: false,
            };
            inner.messages.push(message.clone());
            message
        };
        self.echo(FeedEvent::insert(&message));
        Ok(message)
    }

    async fn edit_message(&self, id: Uuid, body: &str) -> Result<ChatMessage> {
        let message = {
            let mut inner = self.begin()?;
            let message = inner
                .messages
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(ClientError::NotFound("message"))?;
            message.body = body.trim().to_string();
            message.edited = true;
            message.created_at = chrono::Utc::now();
            message.clone()
        };
        self.echo(FeedEvent::update(&message));
        Ok(message)
    }

    async fn delete_message(&self, id: Uuid) -> Result<()> {
        {
            let mut inner = self.begin()?;
            let before = inner.messages.len();
            inner.messages.retain(|m| m.id != id);
            if inner.messages.len() == before {
                return Err(ClientError::NotFound("message"));
            }
        }
        self.echo(FeedEvent::delete::<ChatMessage>(&id));
        Ok(())
    }

    async fn subscribe_messages(
        &self,
        tx: UnboundedSender<RowChange<ChatMessage>>,
    ) -> Result<Subscription> {
        let mut rx = self.feed.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if !forward(&event, &tx) {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Memory feed lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription::new(encore_types::events::Table::ChatMessages, task))
    }
}

impl VideoStore for MemoryStore {
    async fn load_videos(&self) -> Result<Vec<Video>> {
        let inner = self.begin()?;
        let mut videos = inner.videos.clone();
        videos.sort_by_key(|v| v.order_index);
        Ok(videos)
    }

    async fn save_order(&self, ids: Vec<Uuid>) -> Result<Vec<Video>> {
        let videos = {
            let mut inner = self.begin()?;

            let requested: HashSet<Uuid> = ids.iter().copied().collect();
            let current: HashSet<Uuid> = inner.videos.iter().map(|v| v.id).collect();
            if requested.len() != ids.len() || requested != current {
                return Err(ClientError::Status {
                    status: 409,
                    message: "order must list every video exactly once".into(),
                });
            }

            for video in inner.videos.iter_mut() {
                if let Some(index) = ids.iter().position(|id| *id == video.id) {
                    video.order_index = index as i64;
                }
            }
            inner.videos.sort_by_key(|v| v.order_index);
            inner.videos.clone()
        };

        for video in &videos {
            self.echo(FeedEvent::update(video));
        }
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn mutations_are_echoed_to_subscribers() {
        let store = MemoryStore::new("artist", "Artist");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = store.subscribe_messages(tx).await.unwrap();

        let sent = store
            .send_message(SendMessageRequest { body: "hey".into(), video_id: None })
            .await
            .unwrap();
        store.delete_message(sent.id).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), RowChange::Insert(sent.clone()));
        assert_eq!(rx.recv().await.unwrap(), RowChange::Delete(sent.id));
    }

    #[tokio::test]
    async fn fail_next_call_fails_once() {
        let store = MemoryStore::new("artist", "Artist");
        store.fail_next_call();

        assert_eq!(store.load_messages().await.unwrap_err().status(), Some(500));
        assert!(store.load_messages().await.is_ok());
    }

    #[tokio::test]
    async fn save_order_requires_the_full_set() {
        let store = MemoryStore::new("editor", "Editor");
        assert!(store.save_order(vec![Uuid::new_v4()]).await.is_err());
        assert!(store.save_order(vec![]).await.unwrap().is_empty());
    }
}

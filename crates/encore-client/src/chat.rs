use tracing::{debug, error, warn};
use uuid::Uuid;

use encore_types::api::SendMessageRequest;
use encore_types::events::RowChange;
use encore_types::models::ChatMessage;

use crate::error::{ClientError, Result};
use crate::feed::Subscription;
use crate::notify::{Alerts, Notifier};
use crate::reconciler::{Applied, MessageReconciler};
use crate::store::ChatStore;
use crate::unread::UnreadCounter;

/// The admin chat panel: a reconciled message list plus the actions an
/// admin can take on it.
pub struct ChatWidget<S, N, A> {
    store: S,
    notifier: N,
    alerts: A,
    reconciler: MessageReconciler,
    subscription: Option<Subscription>,
}

impl<S: ChatStore, N: Notifier, A: Alerts> ChatWidget<S, N, A> {
    pub fn new(store: S, viewer_id: impl Into<String>, notifier: N, alerts: A) -> Self {
        Self {
            store,
            notifier,
            alerts,
            reconciler: MessageReconciler::new(viewer_id),
            subscription: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.reconciler.messages()
    }

    pub fn unread(&self) -> &UnreadCounter {
        self.reconciler.unread()
    }

    pub fn is_open(&self) -> bool {
        self.reconciler.is_open()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Start following changes, then load the history. Changes committed
    /// while the snapshot is taken stay queued and are applied on top of it;
    /// echoes of rows already in the snapshot are absorbed.
    pub async fn mount(&mut self) -> Result<()> {
        if self.subscription.is_none() {
            match self.store.subscribe_messages(self.reconciler.sender()).await {
                Ok(sub) => self.subscription = Some(sub),
                Err(e) => {
                    error!("Failed to subscribe to chat: {}", e);
                    self.alerts.alert("Live chat updates are unavailable.");
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.load().await {
            self.unmount();
            return Err(e);
        }
        self.drain_pending();
        Ok(())
    }

    /// Stop following changes.
    pub fn unmount(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }

    /// Replace local state with the store's snapshot. On failure the
    /// previous state is kept.
    pub async fn load(&mut self) -> Result<()> {
        match self.store.load_messages().await {
            Ok(messages) => {
                self.reconciler.replace_all(messages);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load chat messages: {}", e);
                self.alerts.alert("Could not load messages.");
                Err(e)
            }
        }
    }

    /// Returns the id of the newest message to scroll to.
    pub fn open(&mut self) -> Option<Uuid> {
        self.reconciler.open()
    }

    pub fn close(&mut self) {
        self.reconciler.close();
    }

    /// Wait for the next feed event and apply it.
    pub async fn process_next(&mut self) -> Option<Applied> {
        let (applied, change) = self.reconciler.process_next().await?;
        self.after_apply(applied, &change);
        Some(applied)
    }

    /// Apply every queued feed event without waiting.
    pub fn drain_pending(&mut self) -> usize {
        let outcomes = self.reconciler.drain_pending();
        for (applied, change) in &outcomes {
            self.after_apply(*applied, change);
        }
        outcomes.len()
    }

    fn after_apply(&self, applied: Applied, change: &RowChange<ChatMessage>) {
        if let (Applied::Inserted { notify: true }, RowChange::Insert(message)) = (applied, change) {
            self.notifier.notify(message);
        }
    }

    /// Send a message with text, a video reference, or both. The stored
    /// row is appended right away; the feed echo is then absorbed.
    pub async fn send(&mut self, body: &str, video_id: Option<Uuid>) -> Result<ChatMessage> {
        let req = SendMessageRequest {
            body: body.trim().to_string(),
            video_id,
        };
        if !req.has_content() {
            debug!("Ignoring empty chat message");
            return Err(ClientError::Validation("message needs text or a video".into()));
        }

        match self.store.send_message(req).await {
            Ok(message) => {
                self.reconciler.apply(RowChange::Insert(message.clone()));
                Ok(message)
            }
            Err(e) => {
                error!("Failed to send chat message: {}", e);
                self.alerts.alert("Could not send the message.");
                Err(e)
            }
        }
    }

    /// Edit one of the viewer's own messages.
    pub async fn edit(&mut self, id: Uuid, body: &str) -> Result<ChatMessage> {
        let Some(existing) = self.reconciler.get(id) else {
            return Err(ClientError::NotFound("message"));
        };
        if existing.sender_id != self.reconciler.viewer_id() {
            warn!("Refusing to edit message {} sent by {}", id, existing.sender_id);
            return Err(ClientError::NotSender);
        }
        if body.trim().is_empty() {
            return Err(ClientError::Validation("message body is required".into()));
        }

        match self.store.edit_message(id, body).await {
            Ok(message) => {
                self.reconciler.apply(RowChange::Update(message.clone()));
                Ok(message)
            }
            Err(e) => {
                error!("Failed to edit chat message {}: {}", id, e);
                self.alerts.alert("Could not edit the message.");
                Err(e)
            }
        }
    }

    /// Delete after confirmation. Returns `false` if the user declined.
    /// The message leaves the local list when the feed echoes the delete.
    pub async fn delete(&mut self, id: Uuid) -> Result<bool> {
        if !self.alerts.confirm("Delete this message?") {
            return Ok(false);
        }

        match self.store.delete_message(id).await {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("Failed to delete chat message {}: {}", id, e);
                self.alerts.alert("Could not delete the message.");
                Err(e)
            }
        }
    }
}

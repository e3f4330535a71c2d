//! Local mirror of the chat table.
//!
//! The mirror starts from a snapshot (`replace_all`) and is kept current by
//! change events. Events are queued on an mpsc channel by the feed task and
//! applied here strictly in arrival order; nothing else mutates the list.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};
use uuid::Uuid;

use encore_types::events::RowChange;
use encore_types::models::ChatMessage;

use crate::unread::UnreadCounter;

/// What applying one change did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Appended. `notify` is set for messages from someone else that
    /// arrived while the widget was closed.
    Inserted { notify: bool },
    Updated,
    Deleted,
    /// Duplicate insert, or update/delete of an unknown id.
    Ignored,
}

pub struct MessageReconciler {
    viewer_id: String,
    messages: Vec<ChatMessage>,
    open: bool,
    unread: UnreadCounter,
    queue_tx: UnboundedSender<RowChange<ChatMessage>>,
    queue_rx: UnboundedReceiver<RowChange<ChatMessage>>,
}

impl MessageReconciler {
    pub fn new(viewer_id: impl Into<String>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            viewer_id: viewer_id.into(),
            messages: Vec::new(),
            open: false,
            unread: UnreadCounter::new(),
            queue_tx,
            queue_rx,
        }
    }

    /// Sender half of the inbound queue, handed to the feed subscription.
    pub fn sender(&self) -> UnboundedSender<RowChange<ChatMessage>> {
        self.queue_tx.clone()
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn unread(&self) -> &UnreadCounter {
        &self.unread
    }

    /// Replace the mirror with a fresh snapshot, sorted oldest first.
    pub fn replace_all(&mut self, mut messages: Vec<ChatMessage>) {
        messages.sort_by_key(|m| m.created_at);
        debug!("Loaded {} chat messages", messages.len());
        self.messages = messages;
    }

    pub fn apply(&mut self, change: RowChange<ChatMessage>) -> Applied {
        match change {
            RowChange::Insert(message) => {
                if self.get(message.id).is_some() {
                    trace!("Ignoring duplicate insert {}", message.id);
                    return Applied::Ignored;
                }
                let notify = !self.open && message.sender_id != self.viewer_id;
                if notify {
                    self.unread.increment();
                }
                // Arrival order; no re-sort.
                self.messages.push(message);
                Applied::Inserted { notify }
            }
            RowChange::Update(message) => {
                match self.messages.iter_mut().find(|m| m.id == message.id) {
                    Some(slot) => {
                        *slot = message;
                        Applied::Updated
                    }
                    None => Applied::Ignored,
                }
            }
            RowChange::Delete(id) => {
                let before = self.messages.len();
                self.messages.retain(|m| m.id != id);
                if self.messages.len() < before {
                    Applied::Deleted
                } else {
                    Applied::Ignored
                }
            }
        }
    }

    /// Show the widget. Clears the unread count and returns the newest
    /// message id to scroll to.
    pub fn open(&mut self) -> Option<Uuid> {
        self.open = true;
        self.unread.reset();
        self.messages.last().map(|m| m.id)
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Wait for the next queued change and apply it. `None` when every
    /// sender is gone, which cannot happen while `self` holds one.
    pub async fn process_next(&mut self) -> Option<(Applied, RowChange<ChatMessage>)> {
        let change = self.queue_rx.recv().await?;
        Some((self.apply(change.clone()), change))
    }

    /// Apply everything already queued without waiting. Returns the outcome
    /// of each change in arrival order.
    pub fn drain_pending(&mut self) -> Vec<(Applied, RowChange<ChatMessage>)> {
        let mut outcomes = Vec::new();
        while let Ok(change) = self.queue_rx.try_recv() {
            outcomes.push((self.apply(change.clone()), change));
        }
        outcomes
    }
}

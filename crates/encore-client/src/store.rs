//! Transport seams for the chat widget and the video reorder list.

use std::future::Future;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use encore_types::api::SendMessageRequest;
use encore_types::events::RowChange;
use encore_types::models::{ChatMessage, Video};

use crate::error::Result;
use crate::feed::Subscription;

pub trait ChatStore: Send + Sync {
    /// All messages, oldest first.
    fn load_messages(&self) -> impl Future<Output = Result<Vec<ChatMessage>>> + Send;

    /// Returns the canonical stored row.
    fn send_message(
        &self,
        req: SendMessageRequest,
    ) -> impl Future<Output = Result<ChatMessage>> + Send;

    fn edit_message(&self, id: Uuid, body: &str) -> impl Future<Output = Result<ChatMessage>> + Send;

    fn delete_message(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    /// Forward chat changes into `tx` until the subscription is dropped.
    fn subscribe_messages(
        &self,
        tx: UnboundedSender<RowChange<ChatMessage>>,
    ) -> impl Future<Output = Result<Subscription>> + Send;
}

pub trait VideoStore: Send + Sync {
    /// Videos in display order.
    fn load_videos(&self) -> impl Future<Output = Result<Vec<Video>>> + Send;

    /// Persist the full order in one batch. Returns the renumbered list.
    fn save_order(&self, ids: Vec<Uuid>) -> impl Future<Output = Result<Vec<Video>>> + Send;
}

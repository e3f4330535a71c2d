use tracing::{debug, error};
use uuid::Uuid;

use encore_types::models::Video;

use crate::error::Result;
use crate::notify::Alerts;
use crate::store::VideoStore;

/// Drag-and-drop ordering of the admin video list. Moves are applied
/// locally as the pointer travels and persisted once on drop.
pub struct VideoReorderList<S, A> {
    store: S,
    alerts: A,
    videos: Vec<Video>,
    dragging: Option<Uuid>,
}

impl<S: VideoStore, A: Alerts> VideoReorderList<S, A> {
    pub fn new(store: S, alerts: A) -> Self {
        Self {
            store,
            alerts,
            videos: Vec::new(),
            dragging: None,
        }
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn dragging(&self) -> Option<Uuid> {
        self.dragging
    }

    /// Replace the local list with the store's canonical order. On failure
    /// the current list is kept.
    pub async fn load(&mut self) -> Result<()> {
        match self.store.load_videos().await {
            Ok(videos) => {
                self.videos = videos;
                Ok(())
            }
            Err(e) => {
                error!("Failed to load videos: {}", e);
                self.alerts.alert("Could not load videos.");
                Err(e)
            }
        }
    }

    pub fn drag_start(&mut self, id: Uuid) {
        self.dragging = Some(id);
    }

    /// Move the dragged video into `target`'s slot and renumber. Returns
    /// whether anything moved.
    pub fn drag_over(&mut self, target: Uuid) -> bool {
        let Some(dragged) = self.dragging else {
            return false;
        };
        if dragged == target {
            return false;
        }

        let from = self.videos.iter().position(|v| v.id == dragged);
        let to = self.videos.iter().position(|v| v.id == target);
        let (Some(from), Some(to)) = (from, to) else {
            return false;
        };

        let video = self.videos.remove(from);
        self.videos.insert(to, video);
        renumber(&mut self.videos);
        true
    }

    /// Persist the current order in one batch. On failure the canonical
    /// order is reloaded from the store.
    pub async fn drag_end(&mut self) -> Result<()> {
        if self.dragging.take().is_none() {
            return Ok(());
        }

        let ids: Vec<Uuid> = self.videos.iter().map(|v| v.id).collect();
        match self.store.save_order(ids).await {
            Ok(saved) => {
                debug!("Saved order of {} videos", saved.len());
                Ok(())
            }
            Err(e) => {
                error!("Failed to save video order: {}", e);
                self.alerts.alert("Could not save the new order.");
                // A failed reload has already alerted; report the save error.
                let _ = self.load().await;
                Err(e)
            }
        }
    }
}

/// `order_index` becomes each video's position.
fn renumber(videos: &mut [Video]) {
    for (index, video) in videos.iter_mut().enumerate() {
        video.order_index = index as i64;
    }
}

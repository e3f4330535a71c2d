use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{error, trace};
use uuid::Uuid;

use encore_types::events::{FeedEvent, Row, Table};

const BROADCAST_CAPACITY: usize = 1024;

/// Fans change events out to every connected feed client.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// All connections receive all events and filter by their own subscriptions
    broadcast_tx: broadcast::Sender<FeedEvent>,

    /// connection_id -> tables the connection follows
    connections: RwLock<HashMap<Uuid, HashSet<Table>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to change events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish a change event. Having no listeners is not an error.
    pub fn publish(&self, event: FeedEvent) {
        trace!("publish {} change on {}", change_name(&event), event.table);
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub fn publish_insert<T: Row>(&self, row: &T) {
        match FeedEvent::insert(row) {
            Ok(event) => self.publish(event),
            Err(e) => error!("Failed to encode insert on {}: {}", T::TABLE, e),
        }
    }

    pub fn publish_update<T: Row>(&self, row: &T) {
        match FeedEvent::update(row) {
            Ok(event) => self.publish(event),
            Err(e) => error!("Failed to encode update on {}: {}", T::TABLE, e),
        }
    }

    pub fn publish_delete<T: Row>(&self, id: &T::Id) {
        match FeedEvent::delete::<T>(id) {
            Ok(event) => self.publish(event),
            Err(e) => error!("Failed to encode delete on {}: {}", T::TABLE, e),
        }
    }

    /// Track a new feed connection. Returns its id.
    pub async fn register_connection(&self) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner
            .connections
            .write()
            .await
            .insert(conn_id, HashSet::new());
        conn_id
    }

    pub async fn unregister_connection(&self, conn_id: Uuid) {
        self.inner.connections.write().await.remove(&conn_id);
    }

    /// Record that a connection follows (or stopped following) a table.
    pub async fn set_subscription(&self, conn_id: Uuid, table: Table, subscribed: bool) {
        let mut connections = self.inner.connections.write().await;
        if let Some(tables) = connections.get_mut(&conn_id) {
            if subscribed {
                tables.insert(table);
            } else {
                tables.remove(&table);
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }

    /// Number of connections following `table`.
    pub async fn subscriber_count(&self, table: Table) -> usize {
        self.inner
            .connections
            .read()
            .await
            .values()
            .filter(|tables| tables.contains(&table))
            .count()
    }
}

fn change_name(event: &FeedEvent) -> &'static str {
    match event.change {
        encore_types::events::Change::Insert { .. } => "insert",
        encore_types::events::Change::Update { .. } => "update",
        encore_types::events::Change::Delete { .. } => "delete",
    }
}

//! Change-feed subscriptions over the gateway WebSocket.
//!
//! A subscription follows one table and forwards typed changes into an
//! mpsc sender. The receiving side decides when to apply them; the feed
//! task never touches client state directly.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use encore_types::events::{FeedEvent, GatewayCommand, GatewayEvent, Row, RowChange, Table};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a running feed task. Dropping it stops the feed.
#[derive(Debug)]
pub struct Subscription {
    table: Table,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(table: Table, task: JoinHandle<()>) -> Self {
        Self { table, task }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn unsubscribe(self) {
        debug!("Unsubscribing from {}", self.table);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Decode `event` for `T` and hand it to `tx`. Returns `false` once the
/// receiver is gone.
pub(crate) fn forward<T: Row>(event: &FeedEvent, tx: &UnboundedSender<RowChange<T>>) -> bool {
    match event.decode::<T>() {
        Ok(Some(change)) => tx.send(change).is_ok(),
        Ok(None) => true,
        Err(e) => {
            warn!("Dropping undecodable {} event: {}", event.table, e);
            true
        }
    }
}

/// Open a gateway connection following `T`'s table. Resolves once the
/// server has acknowledged the subscription.
pub async fn subscribe<T: Row>(
    config: &ClientConfig,
    token: Option<&str>,
    tx: UnboundedSender<RowChange<T>>,
) -> Result<Subscription> {
    let mut url = config.gateway_url.clone();
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }

    let (ws, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = ws.split();

    let command = serde_json::to_string(&GatewayCommand::Subscribe { table: T::TABLE })?;
    sink.send(Message::Text(command.into())).await?;

    // Wait for the ack so no change is missed between connect and return.
    let ack = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
        while let Some(msg) = stream.next().await {
            let Message::Text(text) = msg? else { continue };
            match serde_json::from_str::<GatewayEvent>(&text)? {
                GatewayEvent::Subscribed { table } if table == T::TABLE => return Ok(()),
                GatewayEvent::Error { message } => return Err(ClientError::Feed(message)),
                _ => {}
            }
        }
        Err::<(), _>(ClientError::Feed("gateway closed during handshake".into()))
    })
    .await
    .map_err(|_| ClientError::Feed("gateway handshake timed out".into()))?;
    ack?;

    info!("Following {} changes", T::TABLE);

    let task = tokio::spawn(async move {
        // Keep the write half alive; tungstenite answers pings through it.
        let _sink = sink;
        while let Some(msg) = stream.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("{} feed error: {}", T::TABLE, e);
                    break;
                }
            };

            match serde_json::from_str::<GatewayEvent>(&text) {
                Ok(GatewayEvent::Change(event)) => {
                    if !forward(&event, &tx) {
                        break;
                    }
                }
                Ok(GatewayEvent::Error { message }) => warn!("Gateway error: {}", message),
                Ok(_) => {}
                Err(e) => warn!("Unreadable gateway frame: {}", e),
            }
        }
        debug!("{} feed closed", T::TABLE);
    });

    Ok(Subscription::new(T::TABLE, task))
}

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use encore_types::events::{FeedEvent, GatewayCommand, GatewayEvent, Table};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

type Subscriptions = Arc<std::sync::RwLock<HashSet<Table>>>;

/// Serve one change-feed WebSocket. Auth was decided at the HTTP upgrade;
/// `authenticated` only gates which tables may be followed.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, authenticated: bool) {
    let (mut sender, mut receiver) = socket.split();

    let conn_id = dispatcher.register_connection().await;
    info!("Feed connection {} opened (authenticated: {})", conn_id, authenticated);

    let ready = GatewayEvent::Ready {
        connection_id: conn_id,
        authenticated,
    };
    if send_event(&mut sender, &ready).await.is_err() {
        dispatcher.unregister_connection(conn_id).await;
        return;
    }

    let mut broadcast_rx = dispatcher.subscribe();

    // Per-connection table subscriptions (shared between send and recv tasks).
    let subscriptions: Subscriptions = Arc::new(std::sync::RwLock::new(HashSet::new()));
    let send_subscriptions = subscriptions.clone();

    // Replies to commands go through the send task so frames never interleave.
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Feed connection {} lagged by {} events", conn_id, n);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };

                    if !should_forward(&event, &send_subscriptions) {
                        continue;
                    }

                    if send_event(&mut sender, &GatewayEvent::Change(event)).await.is_err() {
                        break;
                    }
                }
                reply = reply_rx.recv() => {
                    let Some(reply) = reply else { break };
                    if send_event(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= MAX_MISSED_PONGS {
                            warn!("Feed connection {} missed {} pongs, dropping", conn_id, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let dispatcher_recv = dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        let (reply, change) = {
                            let mut subs = match subscriptions.write() {
                                Ok(subs) => subs,
                                Err(poisoned) => poisoned.into_inner(),
                            };
                            apply_command(cmd, authenticated, &mut subs)
                        };
                        if let Some((table, subscribed)) = change {
                            dispatcher_recv.set_subscription(conn_id, table, subscribed).await;
                        }
                        if reply_tx.send(reply).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Feed connection {} bad command: {} -- raw: {}",
                            conn_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                        let reply = GatewayEvent::Error {
                            message: format!("unrecognized command: {}", e),
                        };
                        if reply_tx.send(reply).is_err() {
                            break;
                        }
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_connection(conn_id).await;
    info!("Feed connection {} closed", conn_id);
}

async fn send_event<S>(sender: &mut S, event: &GatewayEvent) -> Result<(), ()>
where
    S: futures_util::Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

fn should_forward(event: &FeedEvent, subscriptions: &Subscriptions) -> bool {
    match subscriptions.read() {
        Ok(subs) => subs.contains(&event.table),
        Err(poisoned) => poisoned.into_inner().contains(&event.table),
    }
}

/// Apply a client command to the connection's subscription set. Returns the
/// reply to send and, when the set changed, the `(table, subscribed)` pair.
fn apply_command(
    cmd: GatewayCommand,
    authenticated: bool,
    subscriptions: &mut HashSet<Table>,
) -> (GatewayEvent, Option<(Table, bool)>) {
    match cmd {
        GatewayCommand::Subscribe { table } => {
            if !table.is_public() && !authenticated {
                debug!("Rejected anonymous subscribe to {}", table);
                return (
                    GatewayEvent::Error {
                        message: format!("sign in to follow {}", table),
                    },
                    None,
                );
            }
            let changed = subscriptions.insert(table).then_some((table, true));
            (GatewayEvent::Subscribed { table }, changed)
        }
        GatewayCommand::Unsubscribe { table } => {
            let changed = subscriptions.remove(&table).then_some((table, false));
            (GatewayEvent::Unsubscribed { table }, changed)
        }
    }
}

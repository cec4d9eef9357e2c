//! One WebSocket connection from open to close.

use crate::{
    RelayState,
    board::{BoardSnapshot, BoardState},
    connection::Connection,
    dispatch::DispatchContext,
    error::RelayError,
    topic::{Frame, Subscription, TopicHub, WHITEBOARD_TOPIC},
};
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, StreamExt};
use inkboard_core::{
    message_type,
    protocol::{self, BoardSync, ChatSync},
};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A connection already subscribed to the whiteboard that has not read the
/// board yet. The snapshot can only be taken from here, so every stroke is
/// either in the snapshot or still queued on the subscription (or both).
pub struct Subscribed {
    subscription: Subscription,
}

impl Subscribed {
    pub fn subscribe(hub: &TopicHub, connection: &mut Connection) -> Self {
        Self {
            subscription: hub.subscribe(WHITEBOARD_TOPIC, connection),
        }
    }

    pub fn snapshot(self, board: &BoardState) -> (Subscription, BoardSnapshot) {
        let snapshot = board.snapshot();
        (self.subscription, snapshot)
    }
}

/// Subscribe, then snapshot.
pub fn bootstrap(
    hub: &TopicHub,
    board: &BoardState,
    connection: &mut Connection,
) -> (Subscription, BoardSnapshot) {
    Subscribed::subscribe(hub, connection).snapshot(board)
}

/// Send the late-joiner bootstrap: `board:sync` followed by `chat:sync`, both
/// built from a single snapshot.
async fn send_initial_sync<S>(sender: &mut S, snapshot: BoardSnapshot) -> Result<(), RelayError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let board_sync = protocol::encode(
        message_type::BOARD_SYNC,
        &BoardSync {
            strokes: snapshot.strokes,
            users: Vec::new(),
        },
    )?;
    let chat_sync = protocol::encode(
        message_type::CHAT_SYNC,
        &ChatSync {
            chat_history: snapshot.chat_history,
        },
    )?;

    sender.send(Message::Text(board_sync.into())).await?;
    sender.send(Message::Text(chat_sync.into())).await?;
    Ok(())
}

/// Drive a connection: subscribe, bootstrap, then relay until close or idle
/// expiry.
pub async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let mut connection = Connection::new();
    let id = connection.id();
    info!("New connection: {}", id);

    let (mut sender, mut receiver) = socket.split();

    let (mut subscription, snapshot) = bootstrap(&state.hub, &state.board, &mut connection);
    if let Err(e) = send_initial_sync(&mut sender, snapshot).await {
        warn!("Initial sync for {} failed: {}", id, e);
        state.hub.unsubscribe_all(&mut connection);
        return;
    }

    let idle_timeout = state.config.idle_timeout;
    let ping_every = state.config.ping_interval();
    let mut ping = tokio::time::interval_at(Instant::now() + ping_every, ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // Inbound frames from the client
            msg = receiver.next() => {
                let frame = match msg {
                    Some(Ok(message)) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        match message {
                            Message::Text(text) => Frame::Text(text),
                            Message::Binary(data) => Frame::Binary(data),
                            Message::Close(_) => break,
                            // Pongs only refresh the idle deadline
                            _ => continue,
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", id, e);
                        break;
                    }
                    None => break,
                };
                let ctx = DispatchContext {
                    connection: id,
                    board: &state.board,
                    hub: &state.hub,
                    frame: &frame,
                };
                state.dispatcher.dispatch_frame(&ctx);
            }

            // Frames published on the whiteboard topic
            frame = subscription.recv() => {
                let Some(frame) = frame else { break };
                if sender.send(frame.into_message()).await.is_err() {
                    break;
                }
            }

            _ = ping.tick() => {
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }

            () = &mut idle => {
                info!("Connection {} idle for {:?}, closing", id, idle_timeout);
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    if subscription.dropped() > 0 {
        debug!("Connection {} lost {} frames to backpressure", id, subscription.dropped());
    }
    state.hub.unsubscribe_all(&mut connection);
    info!("Connection closed: {}", id);
}

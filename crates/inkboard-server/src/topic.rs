//! Topic-based publish/subscribe over bounded broadcast channels.
//!
//! Every topic owns one `tokio::sync::broadcast` channel. A subscriber that
//! falls more than `capacity` frames behind loses its oldest pending frames;
//! the loss is logged and counted on its [`Subscription`] and never slows the
//! publisher or other subscribers.

use crate::connection::{Connection, ConnectionId};
use axum::extract::ws::{Message, Utf8Bytes};
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

/// The topic every connection joins on open.
pub const WHITEBOARD_TOPIC: &str = "whiteboard";

/// A raw inbound frame, republished byte for byte with its original opcode.
#[derive(Debug, Clone)]
pub enum Frame {
    Text(Utf8Bytes),
    Binary(Bytes),
}

impl Frame {
    pub fn text(text: impl Into<Utf8Bytes>) -> Self {
        Frame::Text(text.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_str().as_bytes(),
            Frame::Binary(data) => data,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }

    pub fn into_message(self) -> Message {
        match self {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        }
    }
}

struct Topic {
    tx: broadcast::Sender<Frame>,
    subscribers: HashSet<ConnectionId>,
}

impl Topic {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            subscribers: HashSet::new(),
        }
    }
}

/// Registry of live topics.
pub struct TopicHub {
    topics: DashMap<String, Topic>,
    capacity: usize,
}

impl TopicHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe a connection, creating the topic on first use. Frames
    /// published from this point on are delivered to the returned handle.
    pub fn subscribe(&self, topic: &str, connection: &mut Connection) -> Subscription {
        let mut entry = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(self.capacity));
        entry.subscribers.insert(connection.id());
        connection.join(topic);
        debug!(
            "Connection {} subscribed to {} ({} subscribers)",
            connection.id(),
            topic,
            entry.subscribers.len()
        );
        Subscription {
            topic: topic.to_string(),
            rx: entry.tx.subscribe(),
            dropped: 0,
        }
    }

    /// Remove a connection from every topic it joined. Empty topics are dropped.
    pub fn unsubscribe_all(&self, connection: &mut Connection) {
        for topic in connection.leave_all() {
            if let Some(mut entry) = self.topics.get_mut(&topic) {
                entry.subscribers.remove(&connection.id());
                if entry.subscribers.is_empty() {
                    drop(entry);
                    self.topics.remove_if(&topic, |_, t| t.subscribers.is_empty());
                }
            }
        }
    }

    /// Deliver a frame to every current subscriber, the publisher included.
    /// Returns the number of receivers it was queued for.
    pub fn publish(&self, topic: &str, frame: Frame) -> usize {
        match self.topics.get(topic) {
            Some(entry) => entry.tx.send(frame).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map_or(0, |entry| entry.subscribers.len())
    }
}

/// Receiving end of one topic subscription.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Frame>,
    dropped: u64,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Frames lost to backpressure so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn record_lag(&mut self, skipped: u64) {
        self.dropped += skipped;
        warn!(
            "Subscriber on {} lagged, dropped {} oldest frames ({} total)",
            self.topic, skipped, self.dropped
        );
    }

    /// Wait for the next frame. `None` once the topic is gone. Cancel safe.
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<Frame> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => return Some(frame),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

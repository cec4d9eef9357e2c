//! Per-connection identity and topic membership.

use std::{collections::HashSet, fmt};
use uuid::Uuid;

/// Opaque identifier for one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected peer.
#[derive(Debug, Default)]
pub struct Connection {
    id: ConnectionId,
    topics: HashSet<String>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Topics this connection is subscribed to.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    pub(crate) fn join(&mut self, topic: &str) -> bool {
        self.topics.insert(topic.to_string())
    }

    pub(crate) fn leave_all(&mut self) -> Vec<String> {
        self.topics.drain().collect()
    }
}

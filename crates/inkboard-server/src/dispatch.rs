//! Routes inbound envelopes to handlers by their `type` tag.

use crate::{
    board::BoardState,
    connection::ConnectionId,
    error::RelayError,
    topic::{Frame, TopicHub, WHITEBOARD_TOPIC},
};
use inkboard_core::{Envelope, message_type};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Everything a handler may touch while processing one frame.
pub struct DispatchContext<'a> {
    pub connection: ConnectionId,
    pub board: &'a BoardState,
    pub hub: &'a TopicHub,
    /// The frame as received, republished unchanged.
    pub frame: &'a Frame,
}

impl DispatchContext<'_> {
    /// Republish the original frame to the whiteboard topic.
    pub fn broadcast(&self) -> usize {
        let delivered = self.hub.publish(WHITEBOARD_TOPIC, self.frame.clone());
        debug!("Frame from {} delivered to {} subscribers", self.connection, delivered);
        delivered
    }
}

/// A message handler.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &DispatchContext<'_>, envelope: &Envelope) -> Result<(), RelayError>;
}

impl<F> Handler for F
where
    F: Fn(&DispatchContext<'_>, &Envelope) -> Result<(), RelayError> + Send + Sync,
{
    fn handle(&self, ctx: &DispatchContext<'_>, envelope: &Envelope) -> Result<(), RelayError> {
        self(ctx, envelope)
    }
}

/// Relay the frame to every subscriber without touching the board.
pub fn broadcast(ctx: &DispatchContext<'_>, _envelope: &Envelope) -> Result<(), RelayError> {
    ctx.broadcast();
    Ok(())
}

/// Append `payload.stroke` to the board, then relay.
pub fn persist_stroke(ctx: &DispatchContext<'_>, envelope: &Envelope) -> Result<(), RelayError> {
    let stroke = envelope
        .payload
        .get("stroke")
        .filter(|stroke| stroke.is_object())
        .ok_or_else(|| RelayError::invalid_payload(&envelope.kind, "expected a stroke object"))?;
    ctx.board.append_stroke(stroke.clone());
    ctx.broadcast();
    Ok(())
}

/// Append the chat payload to the history, then relay.
pub fn persist_chat(ctx: &DispatchContext<'_>, envelope: &Envelope) -> Result<(), RelayError> {
    if !envelope.payload.get("message").is_some_and(Value::is_string) {
        return Err(RelayError::invalid_payload(
            &envelope.kind,
            "expected an object with a string message",
        ));
    }
    ctx.board.append_chat(envelope.payload.clone());
    ctx.broadcast();
    Ok(())
}

/// What became of one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Handled,
    /// No handler for the tag.
    Unknown,
    /// The handler refused the payload.
    Rejected,
    /// Not a valid envelope.
    Malformed,
}

/// Tag to handler map.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whiteboard protocol: strokes and chat are persisted, everything
    /// else known is relayed as is.
    pub fn whiteboard() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.on(message_type::STROKE_ADD, persist_stroke);
        dispatcher.on(message_type::CHAT_MESSAGE, persist_chat);
        for tag in [
            message_type::ROOM_JOIN,
            message_type::STROKE_START,
            message_type::STROKE_POINT,
            message_type::STROKE_FINISH,
            message_type::STROKE_ERASE,
            message_type::CHAT_TYPING,
            message_type::USER_JOIN,
        ] {
            dispatcher.on(tag, broadcast);
        }
        dispatcher
    }

    /// Register a handler, replacing any previous one for the tag.
    pub fn on(&mut self, tag: &str, handler: impl Handler + 'static) -> &mut Self {
        self.handlers.insert(tag.to_string(), Box::new(handler));
        self
    }

    pub fn handles(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    pub fn dispatch(&self, ctx: &DispatchContext<'_>, envelope: &Envelope) -> Dispatched {
        let Some(handler) = self.handlers.get(&envelope.kind) else {
            debug!("Dropping unknown message type {:?} from {}", envelope.kind, ctx.connection);
            return Dispatched::Unknown;
        };
        match handler.handle(ctx, envelope) {
            Ok(()) => Dispatched::Handled,
            Err(e) => {
                warn!("Rejected message from {}: {}", ctx.connection, e);
                Dispatched::Rejected
            }
        }
    }

    /// Parse the context's frame and dispatch it.
    pub fn dispatch_frame(&self, ctx: &DispatchContext<'_>) -> Dispatched {
        match Envelope::parse(ctx.frame.as_bytes()) {
            Ok(envelope) => self.dispatch(ctx, &envelope),
            Err(e) => {
                warn!("Malformed message from {}: {}", ctx.connection, e);
                Dispatched::Malformed
            }
        }
    }
}

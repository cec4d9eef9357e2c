//! Append-only board shared by every connection.
//!
//! Strokes and chat entries are stored as the JSON values clients sent; the
//! relay never interprets them beyond payload validation in the dispatcher.

use serde::Serialize;
use serde_json::Value;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Immutable copy of the board taken under one read lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub strokes: Vec<Value>,
    pub chat_history: Vec<Value>,
}

#[derive(Debug, Default)]
struct Board {
    strokes: Vec<Value>,
    chat_history: Vec<Value>,
}

/// Reader-writer guarded board: parallel snapshots, exclusive appends.
#[derive(Debug, Default)]
pub struct BoardState {
    inner: RwLock<Board>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer can only have completed or skipped a push, so the
    // data behind a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Board> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Board> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append_stroke(&self, stroke: Value) {
        self.write().strokes.push(stroke);
    }

    pub fn append_chat(&self, entry: Value) {
        self.write().chat_history.push(entry);
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let board = self.read();
        BoardSnapshot {
            strokes: board.strokes.clone(),
            chat_history: board.chat_history.clone(),
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.read().strokes.len()
    }

    pub fn chat_count(&self) -> usize {
        self.read().chat_history.len()
    }
}

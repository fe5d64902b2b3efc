//! Push notification channel: the server-side feed of board changes made by
//! any client (including this one — delivery is at-least-once).
//!
//! The channel is an injected trait rather than a process-wide singleton, so
//! the reconciliation loop can be driven by a test double. Events fan out
//! through a `tokio::sync::broadcast` channel; [`ChannelMessage::Reconnected`]
//! marks a gap in delivery and obliges the consumer to refetch the whole
//! board, because missed notifications cannot otherwise be recovered.

mod ws;

pub use ws::WsPushChannel;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::model::{Column, ColumnId, Task, TaskId};

/// A decoded board change notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum BoardEvent {
    #[serde(rename = "task:created")]
    TaskCreated(Task),
    #[serde(rename = "task:updated")]
    TaskUpdated(Task),
    #[serde(rename = "task:deleted", rename_all = "camelCase")]
    TaskDeleted {
        task_id: TaskId,
        column_id: ColumnId,
    },
    /// Full post-move task record.
    #[serde(rename = "task:moved")]
    TaskMoved(Task),
    #[serde(rename = "column:updated")]
    ColumnUpdated(Column),
}

/// What subscribers receive from a push channel.
#[derive(Debug, Clone)]
pub enum ChannelMessage {
    Event(BoardEvent),
    /// The connection dropped and was re-established. Notifications emitted
    /// during the gap are lost for good — full refetch required.
    Reconnected,
}

/// A reliable, auto-reconnecting push channel. Lifecycle is owned by whoever
/// constructs the board session.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Establish the connection and start delivering messages to subscribers.
    async fn connect(&self) -> Result<()>;

    /// Subscribe to channel messages. May be called before or after
    /// `connect`; each receiver sees every message from subscription onward.
    fn subscribe(&self) -> broadcast::Receiver<ChannelMessage>;

    /// Tear the connection down. No messages are delivered afterwards.
    async fn disconnect(&self);
}

/// Decode one wire frame (`{"event": "...", "payload": {...}}`).
pub fn decode_event(text: &str) -> Result<BoardEvent> {
    Ok(serde_json::from_str(text)?)
}

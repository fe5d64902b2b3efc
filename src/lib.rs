//! boardsync — client-side kanban board engine.
//!
//! Drag a task somewhere and the board reflects it immediately; the move is
//! then persisted through the authoritative server and reconciled against
//! the push channel's change notifications from other clients. The crate is
//! transport-complete (reqwest REST client, tokio-tungstenite push channel)
//! but both transports sit behind traits so the whole engine runs against
//! in-memory doubles in tests.

pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod ordering;
pub mod push;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod state;

pub use commands::CommandExecutor;
pub use config::BoardConfig;
pub use error::{BoardError, Result};
pub use model::{Column, ColumnId, Task, TaskId};
pub use ordering::InsertPosition;
pub use push::{BoardEvent, ChannelMessage, PushChannel, WsPushChannel};
pub use remote::{BoardApi, HttpBoardApi};
pub use session::BoardSession;
pub use state::BoardState;

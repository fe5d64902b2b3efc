//! Board session: owns the state, the executor, and the reconcile loop.
//!
//! Construction connects the push channel, performs the initial full load,
//! and spawns a background task that feeds every channel message through the
//! reconciliation engine. Both mutation paths — user commands through the
//! executor and remote notifications through the engine — converge on the
//! one shared `BoardState` behind the session's lock.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::commands::CommandExecutor;
use crate::error::Result;
use crate::push::{ChannelMessage, PushChannel};
use crate::reconcile::ReconciliationEngine;
use crate::remote::BoardApi;
use crate::state::BoardState;

pub struct BoardSession {
    state: Arc<RwLock<BoardState>>,
    executor: Arc<CommandExecutor>,
    channel: Arc<dyn PushChannel>,
    reconcile_task: Mutex<Option<JoinHandle<()>>>,
}

impl BoardSession {
    /// Connect the push channel, load the board, and start reconciling.
    ///
    /// The channel is subscribed before the initial load so nothing emitted
    /// in between is lost.
    pub async fn start(api: Arc<dyn BoardApi>, channel: Arc<dyn PushChannel>) -> Result<Self> {
        let state = Arc::new(RwLock::new(BoardState::new()));
        let executor = Arc::new(CommandExecutor::new(state.clone(), api));

        channel.connect().await?;
        let rx = channel.subscribe();
        executor.refresh().await?;

        let engine = ReconciliationEngine::new(state.clone());
        let reconcile_task = tokio::spawn(reconcile_loop(rx, engine, executor.clone()));
        info!("board session started");

        Ok(Self {
            state,
            executor,
            channel,
            reconcile_task: Mutex::new(Some(reconcile_task)),
        })
    }

    /// The command surface for user-initiated mutations.
    pub fn executor(&self) -> &CommandExecutor {
        self.executor.as_ref()
    }

    /// A point-in-time copy of the board for rendering.
    pub async fn snapshot(&self) -> BoardState {
        self.state.read().await.clone()
    }

    /// Stop reconciling and tear the channel down.
    pub async fn shutdown(&self) {
        if let Some(task) = self.reconcile_task.lock().await.take() {
            task.abort();
        }
        self.channel.disconnect().await;
        info!("board session stopped");
    }
}

async fn reconcile_loop(
    mut rx: broadcast::Receiver<ChannelMessage>,
    engine: ReconciliationEngine,
    executor: Arc<CommandExecutor>,
) {
    loop {
        match rx.recv().await {
            Ok(ChannelMessage::Event(event)) => engine.apply(event).await,
            Ok(ChannelMessage::Reconnected) => {
                // Notifications emitted during the gap are unrecoverable — a
                // full refetch is a correctness requirement here.
                info!("push channel reconnected — refetching board");
                if let Err(e) = executor.refresh().await {
                    warn!("refetch after reconnect failed: {e}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Same situation as a reconnect gap: events were dropped.
                warn!(skipped, "reconcile loop lagged — refetching board");
                if let Err(e) = executor.refresh().await {
                    warn!("refetch after lag failed: {e}");
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

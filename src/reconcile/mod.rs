//! Reconciliation of push notifications into [`BoardState`].
//!
//! Notifications arrive from any client, including this one's own confirmed
//! actions, with at-least-once delivery and no ordering guarantee relative to
//! this client's pending command outcomes. Every application here is
//! therefore idempotent, and the column a notification names is never
//! trusted blindly: the board is searched for the column actually containing
//! the task first (a local optimistic move may already be ahead of the
//! notification), falling back to the stated column only when the task is
//! unknown.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::model::{Column, ColumnId, Task, TaskId};
use crate::push::BoardEvent;
use crate::state::BoardState;

pub struct ReconciliationEngine {
    state: Arc<RwLock<BoardState>>,
}

impl ReconciliationEngine {
    pub fn new(state: Arc<RwLock<BoardState>>) -> Self {
        Self { state }
    }

    /// Apply one decoded notification. Never fails: a notification that does
    /// not fit the current board (already applied, task gone) is a no-op.
    pub async fn apply(&self, event: BoardEvent) {
        let mut state = self.state.write().await;
        match event {
            BoardEvent::TaskCreated(task) => Self::task_created(&mut state, task),
            BoardEvent::TaskUpdated(task) => Self::task_updated(&mut state, task),
            BoardEvent::TaskDeleted { task_id, column_id } => {
                Self::task_deleted(&mut state, task_id, column_id)
            }
            BoardEvent::TaskMoved(task) => Self::task_moved(&mut state, task),
            BoardEvent::ColumnUpdated(column) => Self::column_updated(&mut state, column),
        }
    }

    fn task_created(state: &mut BoardState, task: Task) {
        // At-least-once delivery: the id may already be on the board, either
        // from a previous delivery or from our own confirmed create.
        if state.contains_task(&task.id) {
            debug!(task = %task.id, "task:created already on board — skipped");
            return;
        }
        state.insert_task(task);
    }

    fn task_updated(state: &mut BoardState, task: Task) {
        match state.find_task_column(&task.id).cloned() {
            // The locally containing column is the column of record, even if
            // the notification disagrees.
            Some(column) => state.replace_task_in(&column, task),
            None => state.insert_task(task),
        }
    }

    fn task_deleted(state: &mut BoardState, task_id: TaskId, column_id: ColumnId) {
        let column = state
            .find_task_column(&task_id)
            .cloned()
            .unwrap_or(column_id);
        if state.remove_task_from(&column, &task_id).is_none() {
            debug!(task = %task_id, "task:deleted for unknown task — skipped");
        }
    }

    fn task_moved(state: &mut BoardState, task: Task) {
        let target = task.column_id.clone();
        // Idempotency: already in the target column at the claimed order
        // means this delivery was already applied.
        if let Some(existing) = state.task(&task.id) {
            if existing.column_id == target && existing.order == task.order {
                debug!(task = %task.id, "task:moved already applied — skipped");
                return;
            }
        }
        state.remove_task(&task.id);
        state.insert_task(task);
    }

    fn column_updated(state: &mut BoardState, column: Column) {
        state.replace_column(column);
    }
}

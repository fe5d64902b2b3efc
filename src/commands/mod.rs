//! Optimistic command executor.
//!
//! Every user-initiated mutation is applied to [`BoardState`] synchronously,
//! before the remote command is issued — the UI reflects it immediately. The
//! remote outcome then either confirms the mutation (the server's canonical
//! record replaces the optimistic one; the server is authoritative for the
//! final stored order) or rolls it back from a snapshot captured by value at
//! issue time.
//!
//! Overlapping moves of the same task follow a last-issued-wins policy: each
//! command carries a sequence number, a per-task map records the latest
//! pending move, and an older command whose seq no longer matches discards
//! both its confirmation and its rollback. Validation failures are rejected
//! before any optimistic mutation and therefore never roll back.
//!
//! A renumber pass triggered by an optimistic move rewrites the order keys
//! of the target column's other tasks locally only; the move command carries
//! just the moved task's key, so the rewritten keys are never persisted and
//! the next full refetch replaces them with whatever the server holds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BoardError, Result};
use crate::model::{Column, ColumnId, Task, TaskId};
use crate::ordering::{self, Allocation, InsertPosition};
use crate::remote::{BoardApi, CreateTask, UpdateTask};
use crate::state::BoardState;

/// Everything needed to reverse an optimistic move exactly. Captured under
/// the same write lock that applied the move — never recomputed at rollback
/// time, because push notifications may rewrite the board while the command
/// is in flight.
#[derive(Debug, Clone)]
struct PendingMove {
    task_id: TaskId,
    target_column: ColumnId,
    /// The task exactly as it was before the move (source column and order
    /// included).
    previous: Task,
    /// The target column's order keys before a renumber pass rewrote them,
    /// if the optimistic apply triggered one.
    renumbered_from: Option<Vec<(TaskId, f64)>>,
    seq: u64,
}

pub struct CommandExecutor {
    state: Arc<RwLock<BoardState>>,
    api: Arc<dyn BoardApi>,
    seq: AtomicU64,
    /// Seq of the latest pending move per task. Last issued command wins;
    /// an entry overwritten by a newer move orphans the older command.
    pending_moves: Mutex<HashMap<TaskId, u64>>,
}

impl CommandExecutor {
    pub fn new(state: Arc<RwLock<BoardState>>, api: Arc<dyn BoardApi>) -> Self {
        Self {
            state,
            api,
            seq: AtomicU64::new(0),
            pending_moves: Mutex::new(HashMap::new()),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Remove the pending entry if this command still owns it. Returns false
    /// when a later move for the same task superseded this one, in which
    /// case the caller must not touch the board.
    fn take_pending(&self, pending: &PendingMove) -> bool {
        let mut map = self.pending_moves.lock().expect("pending map poisoned");
        if map.get(&pending.task_id) == Some(&pending.seq) {
            map.remove(&pending.task_id);
            true
        } else {
            false
        }
    }

    /// Full board load: columns, then every column's tasks. Replaces the
    /// state wholesale. Also the mandatory recovery path after a push
    /// channel reconnect.
    pub async fn refresh(&self) -> Result<()> {
        let columns = self.api.list_columns().await?;
        let mut tasks = HashMap::new();
        for column in &columns {
            tasks.insert(column.id.clone(), self.api.list_tasks(&column.id).await?);
        }
        info!(columns = columns.len(), "board refreshed from server");
        self.state.write().await.replace_all(columns, tasks);
        Ok(())
    }

    /// Move a task to `position` within `target`, optimistically.
    pub async fn move_task(
        &self,
        id: &TaskId,
        target: &ColumnId,
        position: InsertPosition,
    ) -> Result<Task> {
        let seq = self.next_seq();

        let (pending, order) = {
            let mut state = self.state.write().await;
            if state.column(target).is_none() {
                return Err(BoardError::ColumnNotFound { id: target.clone() });
            }
            let previous = state
                .task(id)
                .cloned()
                .ok_or_else(|| BoardError::TaskNotFound { id: id.clone() })?;

            // Pull the task out first so the target keys describe the list it
            // is actually joining (source and target may be the same column).
            let mut task = state.remove_task(id).expect("task located above");
            let alloc = ordering::allocate(&state.order_keys(target), position);
            let renumbered_from = if let Allocation::Renumbered { keys, .. } = &alloc {
                let prior = state
                    .tasks_in(target)
                    .iter()
                    .map(|t| (t.id.clone(), t.order))
                    .collect();
                debug!(column = %target, "adjacent order keys converged — renumbering column");
                state.apply_renumber(target, keys);
                Some(prior)
            } else {
                None
            };
            let order = alloc.key();
            task.column_id = target.clone();
            task.order = order;
            task.updated_at = Utc::now();
            state.insert_task(task);

            // Registered under the apply lock so registration order matches
            // apply order for overlapping moves of the same task.
            self.pending_moves
                .lock()
                .expect("pending map poisoned")
                .insert(id.clone(), seq);

            (
                PendingMove {
                    task_id: id.clone(),
                    target_column: target.clone(),
                    previous,
                    renumbered_from,
                    seq,
                },
                order,
            )
        };

        match self.api.move_task(id, target, order).await {
            Ok(canonical) => {
                if !self.take_pending(&pending) {
                    debug!(task = %id, seq, "move superseded — confirmation ignored");
                    return Ok(canonical);
                }
                self.state.write().await.replace_task(canonical.clone());
                Ok(canonical)
            }
            Err(e) => {
                if !self.take_pending(&pending) {
                    debug!(task = %id, seq, "move superseded — rollback skipped");
                    return Err(e);
                }
                let mut state = self.state.write().await;
                // Only restore if our optimistic copy is still where we put
                // it; otherwise a notification has since taken over the task.
                if state.remove_task_from(&pending.target_column, id).is_some() {
                    if let Some(keys) = &pending.renumbered_from {
                        state.restore_order_keys(&pending.target_column, keys);
                    }
                    state.insert_task(pending.previous.clone());
                }
                Err(e)
            }
        }
    }

    /// Create a task at the tail of `column`. A tentative record with a
    /// synthetic id and a local-origin tag is shown until the server assigns
    /// the real id; confirmation matches on the tag, not the id.
    pub async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
        column: &ColumnId,
    ) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let seq = self.next_seq();

        {
            let mut state = self.state.write().await;
            if state.column(column).is_none() {
                return Err(BoardError::ColumnNotFound { id: column.clone() });
            }
            let alloc = ordering::allocate(&state.order_keys(column), InsertPosition::Tail);
            if let Allocation::Renumbered { keys, .. } = &alloc {
                state.apply_renumber(column, keys);
            }
            let now = Utc::now();
            state.insert_task(Task {
                id: TaskId::new(format!("local-{}", Uuid::new_v4())),
                title: title.to_string(),
                description: description.map(str::to_string),
                column_id: column.clone(),
                order: alloc.key(),
                created_at: now,
                updated_at: now,
                local_ref: Some(seq),
            });
        }

        let req = CreateTask {
            title: title.to_string(),
            description: description.map(str::to_string),
            column_id: column.clone(),
        };
        match self.api.create_task(&req).await {
            Ok(canonical) => {
                let mut state = self.state.write().await;
                if !state.confirm_created(seq, canonical.clone()) {
                    // Tentative record already gone; the canonical one still
                    // belongs on the board.
                    state.replace_task(canonical.clone());
                }
                Ok(canonical)
            }
            Err(e) => {
                self.state.write().await.discard_created(seq);
                Err(e)
            }
        }
    }

    /// Edit a task's title/description in place.
    pub async fn update_task(
        &self,
        id: &TaskId,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(BoardError::EmptyTitle);
        }

        let snapshot = {
            let mut state = self.state.write().await;
            let column = state
                .find_task_column(id)
                .cloned()
                .ok_or_else(|| BoardError::TaskNotFound { id: id.clone() })?;
            let snapshot = state.task(id).cloned().expect("column holds the task");
            let mut edited = snapshot.clone();
            edited.title = title.to_string();
            edited.description = description.map(str::to_string);
            edited.updated_at = Utc::now();
            state.replace_task_in(&column, edited);
            snapshot
        };

        let req = UpdateTask {
            title: title.to_string(),
            description: description.map(str::to_string),
        };
        match self.api.update_task(id, &req).await {
            Ok(canonical) => {
                let mut state = self.state.write().await;
                // Keep the task in whichever column holds it locally — a
                // concurrent move may be ahead of this response.
                match state.find_task_column(id).cloned() {
                    Some(column) => state.replace_task_in(&column, canonical.clone()),
                    None => state.replace_task(canonical.clone()),
                }
                Ok(canonical)
            }
            Err(e) => {
                let mut state = self.state.write().await;
                // Revert only the edited fields; a move confirmed while this
                // command was in flight keeps its column and order.
                if let Some(column) = state.find_task_column(id).cloned() {
                    let mut restored = state.task(id).cloned().expect("column holds the task");
                    restored.title = snapshot.title;
                    restored.description = snapshot.description;
                    restored.updated_at = snapshot.updated_at;
                    state.replace_task_in(&column, restored);
                }
                Err(e)
            }
        }
    }

    /// Delete a task, optimistically.
    pub async fn delete_task(&self, id: &TaskId) -> Result<()> {
        let snapshot = {
            let mut state = self.state.write().await;
            state
                .remove_task(id)
                .ok_or_else(|| BoardError::TaskNotFound { id: id.clone() })?
        };

        match self.api.delete_task(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state.write().await.insert_task(snapshot);
                Err(e)
            }
        }
    }

    /// Create a column at the end of the board.
    pub async fn create_column(&self, title: &str) -> Result<Column> {
        if title.trim().is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let tentative_id = ColumnId::new(format!("local-{}", Uuid::new_v4()));

        let order = {
            let mut state = self.state.write().await;
            let keys: Vec<f64> = state.columns().iter().map(|c| c.order).collect();
            let order = ordering::allocate(&keys, InsertPosition::Tail).key();
            let now = Utc::now();
            state.insert_column(Column {
                id: tentative_id.clone(),
                title: title.to_string(),
                order,
                task_count: 0,
                created_at: now,
                updated_at: now,
            });
            order
        };

        match self.api.create_column(title, order).await {
            Ok(canonical) => {
                let mut state = self.state.write().await;
                state.remove_column(&tentative_id);
                state.replace_column(canonical.clone());
                Ok(canonical)
            }
            Err(e) => {
                self.state.write().await.remove_column(&tentative_id);
                Err(e)
            }
        }
    }

    /// Rename a column.
    pub async fn update_column(&self, id: &ColumnId, title: &str) -> Result<Column> {
        if title.trim().is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let snapshot = {
            let mut state = self.state.write().await;
            let snapshot = state
                .column(id)
                .cloned()
                .ok_or_else(|| BoardError::ColumnNotFound { id: id.clone() })?;
            let mut edited = snapshot.clone();
            edited.title = title.to_string();
            edited.updated_at = Utc::now();
            state.replace_column(edited);
            snapshot
        };

        match self.api.update_column(id, title).await {
            Ok(canonical) => {
                self.state.write().await.replace_column(canonical.clone());
                Ok(canonical)
            }
            Err(e) => {
                self.state.write().await.replace_column(snapshot);
                Err(e)
            }
        }
    }

    /// Delete a column and everything in it, optimistically.
    pub async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        let (column, tasks) = {
            let mut state = self.state.write().await;
            state
                .remove_column(id)
                .ok_or_else(|| BoardError::ColumnNotFound { id: id.clone() })?
        };

        match self.api.delete_column(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state.write().await.restore_column(column, tasks);
                Err(e)
            }
        }
    }
}

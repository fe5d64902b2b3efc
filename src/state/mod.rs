//! In-memory board snapshot: the column list plus one ordered task list per
//! column.
//!
//! All mutation goes through either the optimistic command executor or the
//! reconciliation engine — never read-modify-write from anywhere else. Lists
//! are kept sorted by `order` ascending; every mutating method re-sorts the
//! lists it touched, because neither remote responses nor push notifications
//! guarantee sort order. Cached `task_count` on columns is maintained here.

use std::collections::HashMap;

use crate::model::{Column, ColumnId, Task, TaskId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    columns: Vec<Column>,
    tasks: HashMap<ColumnId, Vec<Task>>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole board, e.g. after the initial load or a reconnect
    /// refetch. Sorts everything and rebuilds cached task counts.
    pub fn replace_all(&mut self, columns: Vec<Column>, tasks: HashMap<ColumnId, Vec<Task>>) {
        self.columns = columns;
        self.tasks = tasks;
        for column in &self.columns {
            self.tasks.entry(column.id.clone()).or_default();
        }
        sort_columns(&mut self.columns);
        for list in self.tasks.values_mut() {
            sort_tasks(list);
        }
        self.sync_task_counts();
    }

    /// Columns sorted by order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// The column's tasks sorted by order; empty for unknown columns.
    pub fn tasks_in(&self, column: &ColumnId) -> &[Task] {
        self.tasks.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Order keys of the column's tasks, ascending.
    pub fn order_keys(&self, column: &ColumnId) -> Vec<f64> {
        self.tasks_in(column).iter().map(|t| t.order).collect()
    }

    /// The column actually containing the task right now, regardless of what
    /// any record or notification claims.
    pub fn find_task_column(&self, id: &TaskId) -> Option<&ColumnId> {
        self.tasks
            .iter()
            .find(|(_, list)| list.iter().any(|t| &t.id == id))
            .map(|(col, _)| col)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.values().flatten().find(|t| &t.id == id)
    }

    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.task(id).is_some()
    }

    /// Insert a task into the column named on the record and re-sort.
    pub fn insert_task(&mut self, task: Task) {
        let column = task.column_id.clone();
        let list = self.tasks.entry(column.clone()).or_default();
        list.push(task);
        sort_tasks(list);
        self.sync_task_count(&column);
    }

    /// Remove a task from whichever column holds it.
    pub fn remove_task(&mut self, id: &TaskId) -> Option<Task> {
        let column = self.find_task_column(id)?.clone();
        self.remove_task_from(&column, id)
    }

    /// Remove a task from one specific column.
    pub fn remove_task_from(&mut self, column: &ColumnId, id: &TaskId) -> Option<Task> {
        let list = self.tasks.get_mut(column)?;
        let index = list.iter().position(|t| &t.id == id)?;
        let task = list.remove(index);
        self.sync_task_count(column);
        Some(task)
    }

    /// Replace a task by id wherever it currently lives, inserting into the
    /// column named on the new record. Inserts outright if the id is unknown.
    pub fn replace_task(&mut self, task: Task) {
        self.remove_task(&task.id);
        self.insert_task(task);
    }

    /// Replace a task by id but keep it in `column`, overriding whatever
    /// column the record names. Used by reconciliation when the local board
    /// is ahead of the notification.
    pub fn replace_task_in(&mut self, column: &ColumnId, mut task: Task) {
        task.column_id = column.clone();
        self.remove_task(&task.id);
        self.insert_task(task);
    }

    /// Swap a tentative locally-created task (matched by its local-origin
    /// tag, not its synthetic id) for the canonical server record. Returns
    /// false if no tentative task carries the tag.
    pub fn confirm_created(&mut self, local_ref: u64, canonical: Task) -> bool {
        let Some(column) = self
            .tasks
            .iter()
            .find(|(_, list)| list.iter().any(|t| t.local_ref == Some(local_ref)))
            .map(|(col, _)| col.clone())
        else {
            return false;
        };
        let list = self.tasks.get_mut(&column).expect("column just found");
        list.retain(|t| t.local_ref != Some(local_ref));
        self.sync_task_count(&column);
        // A racing task:created notification may already have delivered the
        // canonical id; replace rather than duplicate.
        self.replace_task(canonical);
        true
    }

    /// Drop a tentative task by its local-origin tag (rollback of an
    /// optimistic create).
    pub fn discard_created(&mut self, local_ref: u64) {
        let columns: Vec<ColumnId> = self.tasks.keys().cloned().collect();
        for column in columns {
            let list = self.tasks.get_mut(&column).expect("known key");
            let before = list.len();
            list.retain(|t| t.local_ref != Some(local_ref));
            if list.len() != before {
                self.sync_task_count(&column);
            }
        }
    }

    /// Assign fresh order keys to a column's tasks positionally (renumber
    /// pass). `keys` must match the column's current length.
    pub fn apply_renumber(&mut self, column: &ColumnId, keys: &[f64]) {
        if let Some(list) = self.tasks.get_mut(column) {
            debug_assert_eq!(list.len(), keys.len());
            for (task, key) in list.iter_mut().zip(keys) {
                task.order = *key;
            }
        }
    }

    /// Put back the order keys a renumber pass replaced, by task id. Tasks
    /// that have left the column since are skipped; the list is re-sorted.
    pub fn restore_order_keys(&mut self, column: &ColumnId, keys: &[(TaskId, f64)]) {
        if let Some(list) = self.tasks.get_mut(column) {
            for task in list.iter_mut() {
                if let Some((_, key)) = keys.iter().find(|(id, _)| id == &task.id) {
                    task.order = *key;
                }
            }
            sort_tasks(list);
        }
    }

    pub fn insert_column(&mut self, column: Column) {
        self.tasks.entry(column.id.clone()).or_default();
        self.columns.push(column);
        sort_columns(&mut self.columns);
    }

    /// Replace a column record by id, keeping its local task list. The cached
    /// task count is recomputed from the local list rather than trusted from
    /// the record. Inserts outright if the id is unknown.
    pub fn replace_column(&mut self, column: Column) {
        let id = column.id.clone();
        self.columns.retain(|c| c.id != id);
        self.insert_column(column);
        self.sync_task_count(&id);
    }

    /// Remove a column and its task list.
    pub fn remove_column(&mut self, id: &ColumnId) -> Option<(Column, Vec<Task>)> {
        let index = self.columns.iter().position(|c| &c.id == id)?;
        let column = self.columns.remove(index);
        let tasks = self.tasks.remove(id).unwrap_or_default();
        Some((column, tasks))
    }

    /// Restore a previously removed column together with its tasks.
    pub fn restore_column(&mut self, column: Column, tasks: Vec<Task>) {
        let id = column.id.clone();
        self.insert_column(column);
        let list = self.tasks.entry(id.clone()).or_default();
        *list = tasks;
        sort_tasks(list);
        self.sync_task_count(&id);
    }

    fn sync_task_count(&mut self, column: &ColumnId) {
        let count = self.tasks.get(column).map(Vec::len).unwrap_or(0);
        if let Some(col) = self.columns.iter_mut().find(|c| &c.id == column) {
            col.task_count = count;
        }
    }

    fn sync_task_counts(&mut self) {
        for column in &mut self.columns {
            column.task_count = self.tasks.get(&column.id).map(Vec::len).unwrap_or(0);
        }
    }
}

fn sort_tasks(list: &mut [Task]) {
    // Stable: transient ties keep their current relative order.
    list.sort_by(|a, b| a.order.total_cmp(&b.order));
}

fn sort_columns(list: &mut [Column]) {
    list.sort_by(|a, b| a.order.total_cmp(&b.order));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_column(id: &str, order: f64) -> Column {
        Column {
            id: ColumnId::from(id),
            title: id.to_string(),
            order,
            task_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_task(id: &str, column: &str, order: f64) -> Task {
        Task {
            id: TaskId::from(id),
            title: id.to_string(),
            description: None,
            column_id: ColumnId::from(column),
            order,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            local_ref: None,
        }
    }

    fn board() -> BoardState {
        let mut state = BoardState::new();
        state.replace_all(
            vec![make_column("todo", 0.0), make_column("done", 1000.0)],
            HashMap::from([(
                ColumnId::from("todo"),
                vec![make_task("t2", "todo", 20.0), make_task("t1", "todo", 10.0)],
            )]),
        );
        state
    }

    #[test]
    fn replace_all_sorts_and_counts() {
        let state = board();
        let ids: Vec<&str> = state
            .tasks_in(&ColumnId::from("todo"))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["t1", "t2"]);
        assert_eq!(state.column(&ColumnId::from("todo")).unwrap().task_count, 2);
        assert_eq!(state.column(&ColumnId::from("done")).unwrap().task_count, 0);
    }

    #[test]
    fn find_task_column_searches_every_list() {
        let state = board();
        assert_eq!(
            state.find_task_column(&TaskId::from("t2")),
            Some(&ColumnId::from("todo"))
        );
        assert_eq!(state.find_task_column(&TaskId::from("missing")), None);
    }

    #[test]
    fn insert_keeps_list_sorted_and_count_cached() {
        let mut state = board();
        state.insert_task(make_task("t3", "todo", 15.0));
        let ids: Vec<&str> = state
            .tasks_in(&ColumnId::from("todo"))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["t1", "t3", "t2"]);
        assert_eq!(state.column(&ColumnId::from("todo")).unwrap().task_count, 3);
    }

    #[test]
    fn confirm_created_matches_by_local_ref_not_id() {
        let mut state = board();
        let mut tentative = make_task("local-abc", "done", 0.0);
        tentative.local_ref = Some(7);
        state.insert_task(tentative);

        let canonical = make_task("srv-1", "done", 0.0);
        assert!(state.confirm_created(7, canonical));
        assert!(!state.contains_task(&TaskId::from("local-abc")));
        assert!(state.contains_task(&TaskId::from("srv-1")));
        assert_eq!(state.column(&ColumnId::from("done")).unwrap().task_count, 1);
    }

    #[test]
    fn apply_renumber_is_positional() {
        let mut state = board();
        state.apply_renumber(&ColumnId::from("todo"), &[1000.0, 2000.0]);
        let keys = state.order_keys(&ColumnId::from("todo"));
        assert_eq!(keys, vec![1000.0, 2000.0]);
    }

    #[test]
    fn restore_order_keys_skips_departed_tasks() {
        let mut state = board();
        state.apply_renumber(&ColumnId::from("todo"), &[1000.0, 2000.0]);
        state.remove_task(&TaskId::from("t2"));
        state.restore_order_keys(
            &ColumnId::from("todo"),
            &[(TaskId::from("t1"), 10.0), (TaskId::from("t2"), 20.0)],
        );
        assert_eq!(state.order_keys(&ColumnId::from("todo")), vec![10.0]);
    }

    #[test]
    fn remove_column_returns_tasks_and_restore_reverses() {
        let mut state = board();
        let before = state.clone();
        let (column, tasks) = state.remove_column(&ColumnId::from("todo")).unwrap();
        assert_eq!(tasks.len(), 2);
        state.restore_column(column, tasks);
        assert_eq!(state, before);
    }
}

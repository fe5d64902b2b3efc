//! The remote command surface: everything the engine asks the authoritative
//! server to do. Abstract behind [`BoardApi`] so the executor can be driven
//! by test doubles; the production implementation is [`HttpBoardApi`].

mod http;

pub use http::HttpBoardApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Column, ColumnId, Task, TaskId};

/// Request body for task creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub column_id: ColumnId,
}

/// Request body for task edits. Does not carry position — moves go through
/// `move_task`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Paginated list envelope returned by the server's list endpoints. The
/// pagination block is ignored; the engine always loads full columns.
#[derive(Debug, Deserialize)]
pub(crate) struct Paginated<T> {
    pub data: Vec<T>,
}

/// Commands accepted by the authoritative board server. Every call returns
/// the canonical record as stored — the server may adjust what the client
/// proposed (e.g. the final order of a racing move).
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn list_columns(&self) -> Result<Vec<Column>>;
    async fn list_tasks(&self, column: &ColumnId) -> Result<Vec<Task>>;

    async fn create_task(&self, req: &CreateTask) -> Result<Task>;
    async fn update_task(&self, id: &TaskId, req: &UpdateTask) -> Result<Task>;
    async fn delete_task(&self, id: &TaskId) -> Result<()>;
    async fn move_task(&self, id: &TaskId, target: &ColumnId, order: f64) -> Result<Task>;

    async fn create_column(&self, title: &str, order: f64) -> Result<Column>;
    async fn update_column(&self, id: &ColumnId, title: &str) -> Result<Column>;
    async fn delete_column(&self, id: &ColumnId) -> Result<()>;
}

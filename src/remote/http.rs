//! reqwest-backed [`BoardApi`] implementation speaking the board REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{BoardApi, CreateTask, Paginated, UpdateTask};
use crate::config::BoardConfig;
use crate::error::{BoardError, Result};
use crate::model::{Column, ColumnId, Task, TaskId};

/// Error body shape used by the board API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct HttpBoardApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBoardApi {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into `BoardError::Remote`, preferring the
    /// server's error message over the bare status line.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };
        debug!(%status, %message, "board api rejected request");
        Err(BoardError::remote(message))
    }

    async fn get_list<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Vec<T>> {
        let resp = self.client.get(self.url(path)).send().await?;
        let page: Paginated<T> = Self::check(resp).await?.json().await?;
        Ok(page.data)
    }

    async fn send_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        req: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<T> {
        let resp = req.json(body).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn list_columns(&self) -> Result<Vec<Column>> {
        self.get_list("/api/columns").await
    }

    async fn list_tasks(&self, column: &ColumnId) -> Result<Vec<Task>> {
        self.get_list(&format!("/api/tasks/column/{column}")).await
    }

    async fn create_task(&self, req: &CreateTask) -> Result<Task> {
        self.send_json(self.client.post(self.url("/api/tasks")), req)
            .await
    }

    async fn update_task(&self, id: &TaskId, req: &UpdateTask) -> Result<Task> {
        let url = format!("{}?id={id}", self.url("/api/tasks"));
        self.send_json(self.client.put(url), req).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<()> {
        let url = format!("{}?id={id}", self.url("/api/tasks"));
        let resp = self.client.delete(url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn move_task(&self, id: &TaskId, target: &ColumnId, order: f64) -> Result<Task> {
        let url = self.url(&format!("/api/tasks/{id}/move"));
        self.send_json(
            self.client.put(url),
            &json!({ "targetColumnId": target, "order": order }),
        )
        .await
    }

    async fn create_column(&self, title: &str, order: f64) -> Result<Column> {
        self.send_json(
            self.client.post(self.url("/api/columns")),
            &json!({ "title": title, "order": order }),
        )
        .await
    }

    async fn update_column(&self, id: &ColumnId, title: &str) -> Result<Column> {
        let url = format!("{}?id={id}", self.url("/api/columns"));
        self.send_json(self.client.put(url), &json!({ "title": title }))
            .await
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        let url = format!("{}?id={id}", self.url("/api/columns"));
        let resp = self.client.delete(url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

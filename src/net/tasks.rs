//! Task endpoints: `/tasks/` and `/tasks/{id}/`.

use std::sync::Arc;

use super::client::{ApiClient, Query};
use super::types::{Task, TaskCreate, TaskPatch, TaskStatus};
use crate::error::ApiError;

/// Filters for `GET /tasks/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListParams {
    pub status: Option<TaskStatus>,
    pub assignee: Option<i64>,
    /// Matched against title and description.
    pub search: Option<String>,
    /// One of `created_at`, `updated_at`, `deadline`, `title`, optionally
    /// prefixed with `-` for descending.
    pub ordering: Option<String>,
}

impl TaskListParams {
    #[must_use]
    pub fn to_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_owned()));
        }
        if let Some(assignee) = self.assignee {
            query.push(("assignee", assignee.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search", search.to_owned()));
        }
        if let Some(ordering) = self.ordering.as_deref().filter(|s| !s.is_empty()) {
            query.push(("ordering", ordering.to_owned()));
        }
        query
    }
}

fn task_path(id: i64) -> String {
    format!("/tasks/{id}/")
}

#[derive(Clone)]
pub struct TasksApi {
    client: Arc<ApiClient>,
}

impl TasksApi {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn list(&self, params: &TaskListParams) -> Result<Vec<Task>, ApiError> {
        self.client.get_json("/tasks/", &params.to_query()).await
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn get(&self, id: i64) -> Result<Task, ApiError> {
        self.client.get_json(&task_path(id), &[]).await
    }

    /// Managers and admins only; the server answers 403 otherwise.
    ///
    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn create(&self, task: &TaskCreate) -> Result<Task, ApiError> {
        self.client.post_json("/tasks/", task).await
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn update(&self, id: i64, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.client.patch_json(&task_path(id), patch).await
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&task_path(id)).await
    }
}

#[cfg(test)]
#[path = "tasks_test.rs"]
mod tests;

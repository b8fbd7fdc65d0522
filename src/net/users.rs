//! User administration endpoints (Admin only) and the assignee picker list.

use std::sync::Arc;

use super::client::{ApiClient, Query};
use super::types::{Page, User, UserChoice, UserCreate, UserPatch};
use crate::error::ApiError;

/// Largest page the server will return.
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl UserListParams {
    #[must_use]
    pub fn to_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(page) = self.page {
            query.push(("page", page.max(1).to_string()));
        }
        if let Some(size) = self.page_size {
            query.push(("page_size", size.clamp(1, MAX_PAGE_SIZE).to_string()));
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

fn user_path(id: i64) -> String {
    format!("/users/{id}/")
}

#[derive(Clone)]
pub struct UsersApi {
    client: Arc<ApiClient>,
}

impl UsersApi {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn list(&self, params: &UserListParams) -> Result<Page<User>, ApiError> {
        self.client.get_json("/users/", &params.to_query()).await
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn get(&self, id: i64) -> Result<User, ApiError> {
        self.client.get_json(&user_path(id), &[]).await
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn create(&self, user: &UserCreate) -> Result<User, ApiError> {
        self.client.post_json("/users/", user).await
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn update(&self, id: i64, patch: &UserPatch) -> Result<User, ApiError> {
        self.client.patch_json(&user_path(id), patch).await
    }

    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&user_path(id)).await
    }

    /// Active users that tasks can be assigned to (Admin/Manager).
    ///
    /// # Errors
    ///
    /// Propagates API errors from the HTTP client.
    pub async fn choices(&self) -> Result<Vec<UserChoice>, ApiError> {
        self.client.get_json("/users/choices/", &[]).await
    }
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;

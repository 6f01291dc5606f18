//! PostgREST client implementing [`TableBackend`].

use crate::query::{render_filters, render_query};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};
use todolist_core::{BackendError, Filter, Select, TableBackend};

/// Code attached to failures that never reached the database.
pub const FETCH_ERROR: &str = "FETCH_ERROR";

/// Table backend over `<base>/rest/v1`.
///
/// Every request carries the anon key as `apikey`. The bearer token is the
/// anon key too, unless a user access token was attached with
/// [`with_access_token`](Self::with_access_token).
#[derive(Clone)]
pub struct PostgrestBackend {
    client: Client,
    rest_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for PostgrestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestBackend")
            .field("rest_url", &self.rest_url)
            .field("authenticated", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl PostgrestBackend {
    /// Backend for the project at `base_url`.
    #[must_use]
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    /// Backend reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    /// Copy of this backend acting as the user owning `token`.
    #[must_use]
    pub fn with_access_token(&self, token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..self.clone()
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, format!("{}/{table}", self.rest_url))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn execute(&self, table: &str, request: RequestBuilder) -> Result<Vec<Value>, BackendError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(table, error = %e, "Database request failed");
            BackendError::new(e.to_string()).with_code(FETCH_ERROR)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error = read_error(response).await;
            tracing::debug!(table, status = status.as_u16(), code = ?error.code, "Database rejected request");
            return Err(error);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::new(e.to_string()).with_code(FETCH_ERROR))?;
        if body.is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_slice(&body) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(row) => Ok(vec![row]),
            Err(e) => Err(BackendError::new(format!("Invalid response body: {e}"))),
        }
    }
}

async fn read_error(response: Response) -> BackendError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();

    serde_json::from_slice::<BackendError>(&body).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&body).trim().to_string();
        let message = if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Database request failed")
                .to_string()
        } else {
            text
        };
        BackendError::new(message).with_code(status.as_u16().to_string())
    })
}

impl TableBackend for PostgrestBackend {
    async fn select(&self, table: &str, select: Select) -> Result<Vec<Value>, BackendError> {
        let request = self.request(Method::GET, table).query(&render_query(&select));
        self.execute(table, request).await
    }

    async fn insert(
        &self,
        table: &str,
        row: Map<String, Value>,
    ) -> Result<Option<Value>, BackendError> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row);
        Ok(self.execute(table, request).await?.into_iter().next())
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, BackendError> {
        let request = self
            .request(Method::PATCH, table)
            .query(&render_filters(&filters))
            .header("Prefer", "return=representation")
            .json(&patch);
        Ok(self.execute(table, request).await?.into_iter().next())
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<(), BackendError> {
        let request = self
            .request(Method::DELETE, table)
            .query(&render_filters(&filters))
            .header("Prefer", "return=minimal");
        self.execute(table, request).await.map(drop)
    }
}

//! HTTP client for the board API.
//!
//! [`HttpTaskStore`] lets the drag engine run outside the server (a desktop or
//! terminal front end) and persist through the same endpoints a browser uses.

use std::time::Duration;

use async_trait::async_trait;
use db::models::{
    board::{Board, BoardWithLists},
    list::ListWithTasks,
    task::TaskRecord,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{
    auth::{LoginRequest, LoginResponse},
    board::{BulkUpsertResponse, MoveResponse},
    drag::DragEvent,
    task_store::{TaskStore, TaskStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum BoardClientError {
    #[error("Request timed out")]
    Timeout,
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Server returned error: HTTP {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BoardClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct HttpTaskStore {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTaskStore")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<secret>"))
            .finish()
    }
}

impl HttpTaskStore {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// `base_url` is the server origin, e.g. `http://127.0.0.1:3001`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BoardClientError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("taskflow-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Sign in and keep the session token for later calls.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, BoardClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let login: LoginResponse =
            send(self.http.post(self.url("/api/auth/login")).json(&body)).await?;
        self.token = Some(login.token.clone());
        Ok(login)
    }

    pub async fn list_boards(&self) -> Result<Vec<Board>, BoardClientError> {
        send(self.authed(self.http.get(self.url("/api/boards")))?).await
    }

    pub async fn get_board(&self, board_id: Uuid) -> Result<BoardWithLists, BoardClientError> {
        send(self.authed(self.http.get(self.url(&format!("/api/boards/{board_id}"))))?).await
    }

    pub async fn bulk_upsert(&self, records: &[TaskRecord]) -> Result<u64, BoardClientError> {
        let response: BulkUpsertResponse = send(
            self.authed(self.http.put(self.url("/api/tasks/bulk")))?
                .json(records),
        )
        .await?;
        Ok(response.upserted)
    }

    /// Let the server resolve and persist a drag end.
    pub async fn submit_move(
        &self,
        board_id: Uuid,
        event: &DragEvent,
    ) -> Result<MoveResponse, BoardClientError> {
        send(
            self.authed(
                self.http
                    .post(self.url(&format!("/api/boards/{board_id}/moves"))),
            )?
            .json(event),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder, BoardClientError> {
        let token = self
            .token
            .as_ref()
            .ok_or(BoardClientError::NotAuthenticated)?;
        Ok(request.bearer_auth(token))
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BoardClientError> {
    let response = request.header("Accept", "application/json").send().await?;
    let status = response.status();
    let body = response.text().await?;
    decode_envelope(status, &body)
}

/// Turn a response into the envelope's data. The status is checked before the
/// body is parsed so proxies and framework rejections that answer in plain
/// text still surface as [`BoardClientError::Api`].
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, BoardClientError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(BoardClientError::NotAuthenticated);
    }

    if !status.is_success() {
        return Err(BoardClientError::Api {
            status: status.as_u16(),
            message: error_message(status, body),
        });
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| BoardClientError::Parse(e.to_string()))?;

    if !envelope.is_success() {
        return Err(BoardClientError::Api {
            status: status.as_u16(),
            message: envelope.message().unwrap_or("unknown error").to_string(),
        });
    }

    envelope
        .into_data()
        .ok_or_else(|| BoardClientError::Parse("response carried no data".to_string()))
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        && let Some(message) = envelope.message()
    {
        return message.to_string();
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    async fn upsert_tasks(&self, records: &[TaskRecord]) -> Result<u64, TaskStoreError> {
        Ok(self.bulk_upsert(records).await?)
    }

    async fn load_lists(&self, board_id: Uuid) -> Result<Vec<ListWithTasks>, TaskStoreError> {
        Ok(self.get_board(board_id).await?.lists)
    }
}

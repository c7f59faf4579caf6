use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use common::types::{LoginRequest, LoginResponse, SyncOutcome, VisitorRecord, VisitorStatus, VisitorSubmission};

use crate::errors::ClientError;

/// One page of `GET /api/visitors`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorPage {
    pub items: Vec<VisitorRecord>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// HTTP client for the gate terminal. Holds the base URL and, after login, the bearer token.
#[derive(Clone)]
pub struct GateClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl GateClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent("gatelog-gate")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), token: None })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NoSession)?;
        Ok(req.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await.map_err(ClientError::from_send)?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        let bytes = resp.bytes().await?;
        let message = match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(ErrorBody { error, details: Some(d) }) => format!("{error}: {d}"),
            Ok(ErrorBody { error, details: None }) => error,
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        Err(ClientError::Api { status, message })
    }

    /// Log in and keep the returned token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest { email: email.to_string(), password: password.to_string() };
        let out: LoginResponse = Self::send(self.http.post(self.url("/auth/login")).json(&body)).await?;
        debug!(user_id = %out.user_id, role = %out.role, "logged in");
        self.token = Some(out.token.clone());
        Ok(out)
    }

    pub async fn add_visitor(&self, visitor: &VisitorSubmission) -> Result<VisitorRecord, ClientError> {
        let req = self.authed(self.http.post(self.url("/api/visitors")))?.json(visitor);
        Self::send(req).await
    }

    /// Replays a batch; the server reports one outcome per entry, in order.
    pub async fn sync_visitors(&self, batch: &[VisitorSubmission]) -> Result<Vec<SyncOutcome>, ClientError> {
        let req = self.authed(self.http.post(self.url("/api/visitors/sync")))?.json(batch);
        Self::send(req).await
    }

    pub async fn list_visitors(
        &self,
        status: Option<VisitorStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<VisitorPage, ClientError> {
        let mut query = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(s) = status {
            query.push(("status", s.as_str().to_string()));
        }
        let req = self.authed(self.http.get(self.url("/api/visitors")))?.query(&query);
        Self::send(req).await
    }
}

// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Remote API client
//
// Every backend call is "send request with fields X, receive
// { success, message?, data? }". The endpoint catalogue lives here; the
// feature services build the request bodies.

use crate::session::SessionStore;
use crate::types::AppError;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Backend endpoints known to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    SendOtp,
    VerifyOtp,
    DriverStatus,
    ListContacts,
    CreateContact,
    UpdateContact { id: String },
    DeleteContact { id: String },
    ListTransactions,
    CreateManualTransaction,
    Balance,
    TopUp,
    ConfirmTopUp { id: String },
    Withdraw,
    Transfer,
    ListLiveOrders,
    LiveOrder { id: String },
    ApproveLiveOrder { id: String },
    RejectLiveOrder { id: String },
    RegisterDeviceToken,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Self::ListContacts
            | Self::ListTransactions
            | Self::Balance
            | Self::ListLiveOrders
            | Self::LiveOrder { .. } => Method::GET,
            Self::UpdateContact { .. } => Method::PUT,
            Self::DeleteContact { .. } => Method::DELETE,
            _ => Method::POST,
        }
    }

    /// Path segments relative to the API base URL; ids are single
    /// unescaped segments
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::SendOtp => vec!["auth", "send-otp"],
            Self::VerifyOtp => vec!["auth", "verify-otp"],
            Self::DriverStatus => vec!["driver", "status"],
            Self::ListContacts | Self::CreateContact => vec!["contacts"],
            Self::UpdateContact { id } | Self::DeleteContact { id } => {
                vec!["contacts", id.as_str()]
            }
            Self::ListTransactions => vec!["transactions"],
            Self::CreateManualTransaction => vec!["transactions", "manual"],
            Self::Balance => vec!["saldo"],
            Self::TopUp => vec!["saldo", "top-up"],
            Self::ConfirmTopUp { id } => vec!["saldo", "top-up", id.as_str(), "confirm"],
            Self::Withdraw => vec!["saldo", "withdraw"],
            Self::Transfer => vec!["saldo", "transfer"],
            Self::ListLiveOrders => vec!["live-orders"],
            Self::LiveOrder { id } => vec!["live-orders", id.as_str()],
            Self::ApproveLiveOrder { id } => vec!["live-orders", id.as_str(), "approve"],
            Self::RejectLiveOrder { id } => vec!["live-orders", id.as_str(), "reject"],
            Self::RegisterDeviceToken => vec!["device", "token"],
        }
    }

    /// Unescaped path, for logs
    pub fn path(&self) -> String {
        self.segments().join("/")
    }
}

/// One outgoing call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    /// Session token, sent as a bearer credential
    pub token: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            token: None,
            body: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Uniform response envelope of the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Payload of a successful response, `AppError::Api` otherwise
    pub fn into_data(self) -> Result<Option<Value>, AppError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(AppError::Api(self.message.unwrap_or_default()))
        }
    }

    /// Decode the payload of a successful response
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let data = self.into_data()?.unwrap_or(Value::Null);
        serde_json::from_value(data)
            .map_err(|e| AppError::Serialization(format!("Unexpected response data: {}", e)))
    }
}

/// Transport to the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError>;
}

/// reqwest-backed client
pub struct HttpApiClient {
    http_client: Client,
    base_url: Url,
}

impl HttpApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| AppError::InvalidConfig(format!("Invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::InvalidConfig(format!(
                "API base URL cannot carry a path: {}",
                base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Endpoint URL under the base path, each segment percent-encoded
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url, AppError> {
        let segments = endpoint.segments();
        if let Some(bad) = segments.iter().copied().find(|s| matches!(*s, "" | "." | "..")) {
            return Err(AppError::InvalidInput(format!("ID tidak valid: {:?}", bad)));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidConfig("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
        let url = self.url_for(&request.endpoint)?;
        let method = request.endpoint.method();
        tracing::debug!("{} {}", method, url);

        let mut builder = self
            .http_client
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = if method == Method::GET {
                builder.query(&flatten_query(body))
            } else {
                builder.json(body)
            };
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Network("Request timed out".to_string())
            } else if e.is_connect() {
                AppError::Network(format!("Cannot connect to server: {}", e))
            } else {
                AppError::Network(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read response: {}", e)))?;

        match serde_json::from_str::<ApiResponse>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if status == StatusCode::UNAUTHORIZED => {
                Ok(ApiResponse::failure("Sesi tidak valid"))
            }
            Err(_) if !status.is_success() => Err(AppError::Network(format!(
                "Server returned status {}",
                status
            ))),
            Err(e) => Err(AppError::Serialization(format!(
                "Malformed response envelope: {}",
                e
            ))),
        }
    }
}

/// API access on behalf of the current session
#[derive(Clone)]
pub struct Backend {
    api: Arc<dyn ApiClient>,
    sessions: SessionStore,
}

impl Backend {
    pub fn new(api: Arc<dyn ApiClient>, sessions: SessionStore) -> Self {
        Self { api, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Call without credentials (login flow)
    pub async fn call_public(
        &self,
        endpoint: Endpoint,
        body: Value,
    ) -> Result<Option<Value>, AppError> {
        self.api
            .send(ApiRequest::new(endpoint).with_body(body))
            .await?
            .into_data()
    }

    /// Call with the session token; fails with `NotAuthenticated` when
    /// there is no session
    pub async fn call(
        &self,
        endpoint: Endpoint,
        body: Option<Value>,
    ) -> Result<ApiResponse, AppError> {
        let token = self.sessions.require_token()?;
        let mut request = ApiRequest::new(endpoint).with_token(token);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        let response = self.api.send(request).await?;
        if !response.success {
            tracing::warn!(
                "API call rejected: {}",
                response.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(response)
    }
}

/// Scalar fields of a JSON object as query pairs
fn flatten_query(body: &Value) -> Vec<(String, String)> {
    let Some(object) = body.as_object() else {
        return Vec::new();
    };

    object
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key.clone(), s.clone())),
            Value::Number(n) => Some((key.clone(), n.to_string())),
            Value::Bool(b) => Some((key.clone(), b.to_string())),
            _ => None,
        })
        .collect()
}

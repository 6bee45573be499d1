//! Typed HTTP client for the dealership API.
//!
//! Used by the form controller and the `login-probe` binary.

pub mod login_probe;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::{
    entities::{car, customer},
    errors::ErrorResponse,
    services::{LoginRequest, LoginResponse},
    validation::{CarInput, Violation},
};

pub use login_probe::{run_login_probe, LoginAttempt, ProbeOutcome, StopHandle};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Server rejected {} field(s)", .0.len())]
    Validation(Vec<Violation>),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Unexpected status {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// The calls the car form needs from the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarApi: Send + Sync {
    async fn list_customers(&self) -> Result<Vec<customer::Model>, ClientError>;
    async fn get_car(&self, id: i32) -> Result<car::Model, ClientError>;
    /// Returns the new car's id when the server reports it.
    async fn create_car(&self, input: &CarInput) -> Result<Option<i32>, ClientError>;
    async fn update_car(&self, id: i32, input: &CarInput) -> Result<(), ClientError>;
}

#[derive(Clone)]
pub struct DealershipClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl DealershipClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
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

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Logs in and keeps the issued token for later calls.
    #[instrument(skip(self, password))]
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        let response = self.send_login(username, password).await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    async fn send_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.url("/users/login"))
            .json(&body)
            .send()
            .await?;
        decode(check(response).await?).await
    }
}

#[async_trait]
impl CarApi for DealershipClient {
    #[instrument(skip(self))]
    async fn list_customers(&self) -> Result<Vec<customer::Model>, ClientError> {
        let response = self
            .authorized(self.http.get(self.url("/customers")))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    #[instrument(skip(self))]
    async fn get_car(&self, id: i32) -> Result<car::Model, ClientError> {
        let response = self
            .authorized(self.http.get(self.url(&format!("/cars/{id}"))))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    #[instrument(skip(self, input))]
    async fn create_car(&self, input: &CarInput) -> Result<Option<i32>, ClientError> {
        let response = self
            .authorized(self.http.post(self.url("/cars")))
            .json(input)
            .send()
            .await?;
        let response = check(response).await?;

        let id = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| location.rsplit('/').next())
            .and_then(|id| id.parse().ok());
        debug!(?id, "car created");
        Ok(id)
    }

    #[instrument(skip(self, input))]
    async fn update_car(&self, id: i32, input: &CarInput) -> Result<(), ClientError> {
        let response = self
            .authorized(self.http.put(self.url(&format!("/cars/{id}"))))
            .json(input)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Turns every non-2xx response into a [`ClientError`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: Option<ErrorResponse> = serde_json::from_str(&body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| body.clone());

    Err(match status {
        StatusCode::BAD_REQUEST => match parsed.and_then(|e| e.validation_errors) {
            Some(violations) => ClientError::Validation(violations),
            None => ClientError::Status { status, message },
        },
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        _ => {
            warn!(%status, "request failed");
            ClientError::Status { status, message }
        }
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl LoginAttempt for DealershipClient {
    async fn try_login(&self, username: &str, password: &str) -> Result<bool, ClientError> {
        match self.send_login(username, password).await {
            Ok(_) => Ok(true),
            Err(ClientError::Unauthorized(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = DealershipClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/cars"), "http://localhost:3000/cars");
        assert!(client.token().is_none());
    }

    #[test]
    fn token_is_kept() {
        let client = DealershipClient::new("http://localhost:3000")
            .unwrap()
            .with_token("abc");
        assert_eq!(client.token(), Some("abc"));
    }
}

//! HTTP client for the catalog REST API.
//!
//! Every request passes through the same two stages. On the way out the
//! session's bearer token is attached. On the way back the outcome is
//! timed and logged, and failures are turned into a [`Notification`] for the
//! configured [`Notifier`]. A `401` also ends the session.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use web_time::Instant;

use crate::auth::Session;
use crate::config::Config;
use crate::error::{ApiError, ConfigError};
use crate::notify::{
    Notification, Notifier, TracingNotifier, network_error, notification_for_status,
    unexpected_error,
};

/// Shared client for the catalog API. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    session: Session,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client from configuration. Notifications are logged until
    /// another notifier is set.
    pub fn new(config: &Config, session: Session) -> Result<Self, ConfigError> {
        let base_url = config.api_url()?;
        Self::with_base_url(base_url.as_str(), config.timeout(), session)
    }

    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        session: Session,
    ) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid {
                field: "api_url",
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            session,
            notifier: Arc::new(TracingNotifier),
        })
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Forward a notification to the configured notifier.
    pub fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, path, |req| req).await?;
        decode(response).await
    }

    /// GET with query parameters.
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &(impl Serialize + ?Sized),
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::GET, path, |req| req.query(query))
            .await?;
        decode(response).await
    }

    /// GET a binary body, e.g. a spreadsheet export.
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes, ApiError> {
        let response = self.execute(Method::GET, path, |req| req).await?;
        let url = response.url().to_string();
        response
            .bytes()
            .await
            .map_err(|source| ApiError::Network { url, source })
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::POST, path, |req| req.json(body))
            .await?;
        decode(response).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::PUT, path, |req| req.json(body))
            .await?;
        decode(response).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized),
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::PATCH, path, |req| req.json(body))
            .await?;
        decode(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::DELETE, path, |req| req).await?;
        decode(response).await
    }

    /// POST a multipart form.
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, ApiError> {
        let response = self
            .execute(Method::POST, path, |req| req.multipart(form))
            .await?;
        decode(response).await
    }

    /// Send a request through the interceptor pipeline.
    ///
    /// Returns the response only if its status is a success.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.session.token().await {
            request = request.bearer_auth(token);
        }
        let request = build(request);

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) if err.is_builder() => {
                self.notify(unexpected_error(Some(&err.to_string())));
                return Err(ApiError::Request {
                    message: err.to_string(),
                });
            }
            Err(source) => {
                tracing::warn!(%method, %url, error = %source, "request failed");
                self.notify(network_error());
                return Err(ApiError::Network { url, source });
            }
        };

        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status.is_success() {
            tracing::debug!("{method} {url} - {} ({elapsed_ms}ms)", status.as_u16());
            return Ok(response);
        }

        tracing::debug!(%method, %url, status = status.as_u16(), elapsed_ms, "request rejected");
        Err(self.reject(status, response).await)
    }

    async fn reject(&self, status: StatusCode, response: Response) -> ApiError {
        let body = response.text().await.unwrap_or_default();
        let server_message = server_message(&body);
        let notification = notification_for_status(status.as_u16(), server_message.as_deref());
        self.notify(notification.clone());

        if status == StatusCode::UNAUTHORIZED {
            if let Err(err) = self.session.teardown().await {
                tracing::warn!(error = %err, "failed to clear session after 401");
            }
            return ApiError::Unauthorized;
        }

        ApiError::Status {
            status: status.as_u16(),
            message: notification.description,
        }
    }
}

/// The `message` field of an error body, if it has one.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let url = response.url().to_string();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|v| v.contains("json"));
    let body = response
        .bytes()
        .await
        .map_err(|source| ApiError::Network {
            url: url.clone(),
            source,
        })?;

    // Empty bodies (204, bare deletes) decode as JSON null.
    let body: &[u8] = if body.is_empty() { b"null" } else { &body };
    serde_json::from_slice(body).map_err(|e| {
        let message = if is_json {
            e.to_string()
        } else {
            format!("expected JSON body: {e}")
        };
        ApiError::Decode { url, message }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::with_base_url(
            "http://localhost:3000/api/",
            Duration::from_secs(10),
            Session::in_memory(),
        )
        .unwrap();
        assert_eq!(client.url("/products"), "http://localhost:3000/api/products");
        assert_eq!(client.url("products/1"), "http://localhost:3000/api/products/1");
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(
            server_message(r#"{"message":"title is required"}"#).as_deref(),
            Some("title is required")
        );
        assert_eq!(
            server_message(r#"{"error":"No file provided"}"#).as_deref(),
            Some("No file provided")
        );
        assert_eq!(server_message("<html>"), None);
        assert_eq!(server_message(r#"{"message": 3}"#), None);
    }
}

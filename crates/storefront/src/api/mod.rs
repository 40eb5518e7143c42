//! Typed client for the AllBlackery REST API.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS with `reqwest`; every response body is wrapped in
//!   the backend's `{success, message, data}` envelope
//! - The backend is source of truth - no local sync, direct API calls
//! - In-memory caching via `moka` for catalog reads (5 minute TTL); cart,
//!   order, auth, and payment calls are never cached (mutable state)
//! - Bearer token installed at login and cleared at logout; the client is
//!   clone-cheap (`Arc` inner) so workflows can share one instance
//!
//! # Endpoint groups
//!
//! - [`auth`] - registration, login, Google sign-in, password reset, OTP
//! - [`catalog`] - products and suggestions
//! - [`cart`] - cart line management
//! - [`orders`] - order creation and history
//! - [`payments`] - payment intent creation
//! - [`wishlist`] - saved products
//! - [`notifications`] - in-app notification feed

pub mod auth;
mod cache;
pub mod cart;
pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod types;
pub mod wishlist;

pub use auth::AuthSession;
pub use types::*;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::StorefrontConfig;

use cache::CacheValue;

/// How long catalog responses stay cached.
const CATALOG_CACHE_TTL: Duration = Duration::from_secs(300);
/// Maximum number of cached catalog entries.
const CATALOG_CACHE_CAPACITY: u64 = 1000;

/// Errors that can occur when talking to the AllBlackery API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed. The operation never completed server-side and
    /// is safe to retry.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// JSON decoding failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The server processed the request and said no (`success: false`).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Missing or expired credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Unexpected HTTP status with no decodable envelope.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },

    /// The server reported success but omitted the payload.
    #[error("Response envelope has no data")]
    MissingData,
}

impl ApiError {
    /// Whether this is a transport-level failure (nothing reached the
    /// server; retrying is safe).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// The backend's bare error body for non-envelope failures.
#[derive(Debug, serde::Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// The backend's response wrapper: `{success, message, data}`.
#[derive(Debug, serde::Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the envelope into its payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when `success` is false and
    /// `ApiError::MissingData` when a successful envelope has no `data`.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(self.message));
        }
        self.data.ok_or(ApiError::MissingData)
    }

    /// Unwrap an envelope whose payload is optional by design
    /// (acknowledgement-style endpoints).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when `success` is false.
    pub fn into_ack(self) -> Result<String, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(self.message));
        }
        Ok(self.message)
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the AllBlackery REST API.
///
/// Cheap to clone; all clones share the same connection pool, bearer token,
/// and catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    bearer: RwLock<Option<SecretString>>,
    catalog_cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .build()?;

        let catalog_cache = Cache::builder()
            .max_capacity(CATALOG_CACHE_CAPACITY)
            .time_to_live(CATALOG_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
                bearer: RwLock::new(None),
                catalog_cache,
            }),
        })
    }

    /// Install the bearer token used on subsequent requests.
    pub fn set_bearer_token(&self, token: SecretString) {
        if let Ok(mut guard) = self.inner.bearer.write() {
            *guard = Some(token);
        }
    }

    /// Clear the bearer token (logout).
    pub fn clear_bearer_token(&self) {
        if let Ok(mut guard) = self.inner.bearer.write() {
            *guard = None;
        }
    }

    /// Whether a bearer token is currently installed.
    #[must_use]
    pub fn has_bearer_token(&self) -> bool {
        self.inner
            .bearer
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    fn apply_bearer(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.inner.bearer.read() {
            Ok(guard) => match guard.as_ref() {
                Some(token) => request.bearer_auth(token.expose_secret()),
                None => request,
            },
            Err(_) => request,
        }
    }

    /// Execute a request and decode the response envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let response = self.apply_bearer(request).send().await?;
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound(status.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                return Err(ApiError::RateLimited(retry_after));
            }
            _ => {}
        }

        // Read the body as text first for better error diagnostics; the
        // backend also wraps business-rule failures in the envelope with a
        // non-2xx status, so try to decode it either way.
        let body = response.text().await?;
        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                Err(ApiError::Parse(e))
            }
            Err(_) => Err(ApiError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            }),
        }
    }

    /// POST a body and decode the response as `T` directly, without the
    /// `{success, message, data}` envelope. The OTP endpoints respond with
    /// flat bodies (`expiresIn` lives next to `success`).
    pub(crate) async fn post_json_flat<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let response = self
            .apply_bearer(self.inner.client.post(url).json(body))
            .send()
            .await?;
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                return Err(ApiError::RateLimited(retry_after));
            }
            _ => {}
        }

        let body = response.text().await?;
        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                // Business-rule failures come back as `{"detail": ...}` with
                // a 4xx status; surface the server's message.
                if let Ok(detail) = serde_json::from_str::<ErrorDetail>(&body) {
                    return Err(ApiError::Rejected(detail.detail));
                }
                if status.is_success() {
                    Err(ApiError::Parse(e))
                } else {
                    Err(ApiError::Status {
                        status: status.as_u16(),
                        message: body.chars().take(200).collect(),
                    })
                }
            }
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let url = self.url(path)?;
        self.execute(self.inner.client.get(url)).await
    }

    pub(crate) async fn get_json_query<Q: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let url = self.url(path)?;
        self.execute(self.inner.client.get(url).query(query)).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let url = self.url(path)?;
        self.execute(self.inner.client.post(url).json(body)).await
    }

    pub(crate) async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let url = self.url(path)?;
        self.execute(self.inner.client.put(url).json(body)).await
    }

    pub(crate) async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let url = self.url(path)?;
        self.execute(self.inner.client.delete(url)).await
    }

    pub(crate) fn catalog_cache(&self) -> &Cache<String, CacheValue> {
        &self.inner.catalog_cache
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success_with_data() {
        let envelope: ApiEnvelope<u32> =
            serde_json::from_str(r#"{"success": true, "message": "ok", "data": 7}"#).unwrap();
        assert_eq!(envelope.into_result().unwrap(), 7);
    }

    #[test]
    fn test_envelope_rejected_carries_message() {
        let envelope: ApiEnvelope<u32> =
            serde_json::from_str(r#"{"success": false, "message": "Invalid OTP"}"#).unwrap();
        match envelope.into_result() {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Invalid OTP"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_success_without_data() {
        let envelope: ApiEnvelope<u32> =
            serde_json::from_str(r#"{"success": true, "message": "done"}"#).unwrap();
        assert!(matches!(
            serde_json::from_str::<ApiEnvelope<u32>>(r#"{"success": true, "message": "done"}"#)
                .unwrap()
                .into_result(),
            Err(ApiError::MissingData)
        ));
        assert_eq!(envelope.into_ack().unwrap(), "done");
    }

    #[test]
    fn test_transport_classification() {
        assert!(!ApiError::Rejected("card declined".to_string()).is_transport());
        assert!(!ApiError::Unauthorized.is_transport());
    }
}

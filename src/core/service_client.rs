// src/core/service_client.rs
//! HTTP client for the marketplace API.
//!
//! Every authorized request carries the session's bearer token. A 401 triggers
//! exactly one refresh-and-retry; if that does not help the session is cleared
//! and the caller gets [`ErrorKind::Unauthorized`]. No other retries happen here.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::session::SessionContext;
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::types::response::{LoginRequest, RefreshRequest, RefreshResponse};
use crate::types::TokenPair;

pub const LOGIN_ENDPOINT: &str = "/auth/login/";
pub const REFRESH_ENDPOINT: &str = "/auth/token/refresh/";

const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired, please sign in again.";

pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionContext>,
    refresh_lock: Mutex<()>,
}

impl ServiceClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout_seconds: u64,
        session: Arc<SessionContext>,
    ) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                ApiError::new(
                    ErrorKind::Network,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a token pair and store it in the session.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<()> {
        let tokens: TokenPair = self
            .post_anonymous(LOGIN_ENDPOINT, &LoginRequest { email, password })
            .await?;

        self.session.set_tokens(tokens).await.map_err(|e| {
            ApiError::new(ErrorKind::Server, format!("Failed to store session: {}", e))
        })?;

        info!("Signed in as {}", email);
        Ok(())
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.session.clear().await.map_err(|e| {
            ApiError::new(ErrorKind::Server, format!("Failed to clear session: {}", e))
        })
    }

    /// Generic authorized GET
    pub async fn get<R>(&self, endpoint: &str) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let body = self.send_authorized(Method::GET, endpoint, None).await?;
        decode_body(&body)
    }

    /// GET where a 404 or a `null` body means "nothing there".
    pub async fn get_optional<R>(&self, endpoint: &str) -> ApiResult<Option<R>>
    where
        R: DeserializeOwned,
    {
        match self.send_authorized(Method::GET, endpoint, None).await {
            Ok(body) if body.trim().is_empty() => Ok(None),
            Ok(body) => decode_body(&body),
            Err(e) if e.kind == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Generic authorized POST with a JSON body
    pub async fn post_json<T, R>(&self, endpoint: &str, payload: &T) -> ApiResult<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = encode_payload(payload)?;
        let body = self
            .send_authorized(Method::POST, endpoint, Some(payload))
            .await?;
        decode_body(&body)
    }

    /// Authorized POST without a request body
    pub async fn post_empty<R>(&self, endpoint: &str) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let body = self.send_authorized(Method::POST, endpoint, None).await?;
        decode_body(&body)
    }

    /// POST without bearer token and without refresh handling.
    pub async fn post_anonymous<T, R>(&self, endpoint: &str, payload: &T) -> ApiResult<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = encode_payload(payload)?;
        let url = self.url(endpoint);
        let response = self
            .dispatch(&Method::POST, &url, Some(&payload), None)
            .await?;
        let body = read_body(&url, response).await?;
        decode_body(&body)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send_authorized(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> ApiResult<String> {
        let url = self.url(endpoint);
        let token = self.session.access_token();

        let response = self
            .dispatch(&method, &url, payload.as_ref(), token.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_body(&url, response).await;
        }

        warn!("{} {} returned 401, refreshing access token", method, url);
        if !self.refresh_access(token.as_deref()).await {
            return Err(self.expire_session().await);
        }

        let token = self.session.access_token();
        let retry = self
            .dispatch(&method, &url, payload.as_ref(), token.as_deref())
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!("{} {} still unauthorized after refresh", method, url);
            return Err(self.expire_session().await);
        }

        read_body(&url, retry).await
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &str,
        payload: Option<&Value>,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let request_id = Uuid::new_v4().to_string();
        debug!("{} {} (request {})", method, url, request_id);

        let mut request = self
            .client
            .request(method.clone(), url)
            .header("X-Request-ID", &request_id);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        request.send().await.map_err(|e| {
            error!("{} {} failed (request {}): {}", method, url, request_id, e);
            ApiError::from(e)
        })
    }

    /// Refresh the access token. Concurrent callers that saw the same stale
    /// token share a single refresh.
    async fn refresh_access(&self, stale_access: Option<&str>) -> bool {
        let _guard = self.refresh_lock.lock().await;

        let current = self.session.access_token();
        if current.is_some() && current.as_deref() != stale_access {
            debug!("Access token already refreshed by another request");
            return true;
        }

        let Some(refresh) = self.session.refresh_token() else {
            warn!("No refresh token available");
            return false;
        };

        let refreshed: ApiResult<RefreshResponse> = self
            .post_anonymous(REFRESH_ENDPOINT, &RefreshRequest { refresh: &refresh })
            .await;

        match refreshed {
            Ok(response) => match self
                .session
                .update_access(response.access, response.refresh)
                .await
            {
                Ok(()) => {
                    info!("Access token refreshed");
                    true
                }
                Err(e) => {
                    error!("Failed to store refreshed token: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                false
            }
        }
    }

    async fn expire_session(&self) -> ApiError {
        if let Err(e) = self.session.clear().await {
            error!("Failed to clear expired session: {}", e);
        }
        ApiError::unauthorized(SESSION_EXPIRED_MESSAGE)
    }
}

async fn read_body(url: &str, response: reqwest::Response) -> ApiResult<String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| {
        error!("Reading response body from {} failed: {}", url, e);
        let mut error = ApiError::new(
            ErrorKind::Network,
            "Network error, check your connection and try again.",
        );
        error.status = Some(status.as_u16());
        error
    })?;

    if status.is_success() {
        Ok(body)
    } else {
        let error = ApiError::from_response(status.as_u16(), &body);
        warn!("{} returned {}: {}", url, status, error.message);
        Err(error)
    }
}

fn encode_payload<T>(payload: &T) -> ApiResult<Value>
where
    T: Serialize + ?Sized,
{
    serde_json::to_value(payload)
        .map_err(|e| ApiError::decode(format!("Failed to encode request: {}", e)))
}

/// Decode a success body. Empty bodies decode as `null`, then as `{}`, so
/// both `()` and all-default structs accept them.
fn decode_body<R>(body: &str) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return serde_json::from_str::<R>("null")
            .or_else(|_| serde_json::from_str::<R>("{}"))
            .map_err(ApiError::from);
    }

    serde_json::from_str::<R>(trimmed).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::response::TransitionResponse;

    #[test]
    fn test_decode_empty_bodies() {
        decode_body::<()>("").unwrap();

        let transition: TransitionResponse = decode_body("  ").unwrap();
        assert!(transition.reported_status().is_none());
    }

    #[test]
    fn test_decode_invalid_body_is_decode_error() {
        let err = decode_body::<TransitionResponse>("<html>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
    }
}

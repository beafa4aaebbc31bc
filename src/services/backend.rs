// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the backend OIDC agent (`/web/*` endpoints).
//!
//! Handles:
//! - The login-start / login-end handshake
//! - Session refresh and revoke
//! - Who-am-i and the lightweight auth probe
//!
//! Every request carries the session cookie and a per-request timeout.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{AuthError, Result};
use crate::models::{
    LoginEndRequest, LoginEndResponse, LoginStartResponse, LogoutResponse, RefreshTokenRequest,
    RefreshTokenResponse, UserInfo,
};

/// The backend calls the session core depends on.
///
/// HTTP 401 from any endpoint surfaces as `AuthError::Unauthorized`.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn login_start(&self) -> Result<LoginStartResponse>;
    async fn login_end(&self, request: &LoginEndRequest) -> Result<LoginEndResponse>;
    /// Revoke the server-side session.
    async fn logout(&self) -> Result<LogoutResponse>;
    async fn user_info(&self) -> Result<UserInfo>;
    /// Renew the session. Empty pair on 204.
    async fn refresh(&self, request: &RefreshTokenRequest) -> Result<RefreshTokenResponse>;
    /// `true` on 200, `false` on 401.
    async fn check_auth(&self) -> Result<bool>;
}

/// reqwest implementation of [`SessionBackend`].
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    identity_path: String,
}

impl HttpBackend {
    /// Build a backend with its own cookie jar and the configured timeout.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("failed building HTTP client: {}", e)))?;

        Ok(Self::with_client(
            http,
            &config.api_url,
            &config.identity_path,
        ))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, identity_path: &str) -> Self {
        let identity_path = if identity_path.starts_with('/') {
            identity_path.to_string()
        } else {
            format!("/{}", identity_path)
        };

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity_path,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Http { status, body })
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = self.check_response(response).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(AuthError::Protocol("empty response body".to_string()));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Protocol(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn login_start(&self) -> Result<LoginStartResponse> {
        let response = self.http.post(self.url("/web/login/start")).send().await?;
        self.check_response_json(response).await
    }

    async fn login_end(&self, request: &LoginEndRequest) -> Result<LoginEndResponse> {
        let response = self
            .http
            .post(self.url("/web/login/end"))
            .json(request)
            .send()
            .await?;
        self.check_response_json(response).await
    }

    async fn logout(&self) -> Result<LogoutResponse> {
        let response = self.http.post(self.url("/web/logout")).send().await?;
        let response = self.check_response(response).await?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(LogoutResponse::default());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Protocol(format!("JSON parse error: {}", e)))
    }

    async fn user_info(&self) -> Result<UserInfo> {
        let response = self.http.get(self.url(&self.identity_path)).send().await?;
        self.check_response_json(response).await
    }

    async fn refresh(&self, request: &RefreshTokenRequest) -> Result<RefreshTokenResponse> {
        let response = self
            .http
            .post(self.url("/web/refresh"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("application/json"));
            let body = response.text().await.unwrap_or_default();

            if is_json {
                match serde_json::from_str::<serde_json::Value>(&body) {
                    Ok(error_body) => tracing::error!(
                        status = %status,
                        error_body = %error_body,
                        "Refresh rejected by server"
                    ),
                    Err(_) => tracing::error!(status = %status, "Refresh rejected by server"),
                }
            } else {
                tracing::error!(status = %status, "Refresh rejected by server");
            }

            return Err(match status {
                StatusCode::UNAUTHORIZED => AuthError::Unauthorized,
                _ => AuthError::Http { status, body },
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(RefreshTokenResponse::default());
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(RefreshTokenResponse::default());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Protocol(format!("JSON parse error: {}", e)))
    }

    async fn check_auth(&self) -> Result<bool> {
        let response = self.http.get(self.url("/web/check_auth")).send().await?;
        match self.check_response(response).await {
            Ok(_) => Ok(true),
            Err(AuthError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

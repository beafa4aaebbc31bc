// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request and response bodies of the backend `/web/*` endpoints.

use serde::{Deserialize, Serialize};

use super::TokenPair;

/// `POST /web/login/start`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginStartResponse {
    pub authorization_request_url: String,
}

/// `POST /web/login/end` request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginEndRequest {
    /// Full return URL, including the provider's `code` and `state`
    pub request_url: String,
}

/// `POST /web/login/end` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginEndResponse {
    #[serde(default)]
    pub handled: bool,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

impl LoginEndResponse {
    /// The handshake only counts when the agent handled the callback and
    /// reports a live session.
    pub fn is_complete(&self) -> bool {
        self.handled && self.logged_in
    }
}

/// `POST /web/logout`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub logout_url: Option<String>,
}

/// `POST /web/refresh` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// `POST /web/refresh` response body (empty on 204).
pub type RefreshTokenResponse = TokenPair;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session error types shared by the authenticator and the refresh scheduler.

use reqwest::StatusCode;

/// Error type returned by every session operation.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AuthError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            AuthError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error means the session is gone (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(StatusCode::UNAUTHORIZED) => AuthError::Unauthorized,
            Some(status) => AuthError::Http {
                status,
                body: err.to_string(),
            },
            None if err.is_decode() => AuthError::Protocol(err.to_string()),
            None => AuthError::Transport(err.to_string()),
        }
    }
}

/// Anything that may carry an HTTP-like status, as handed to `check_error`.
pub trait HttpStatus {
    fn http_status(&self) -> Option<StatusCode>;
}

impl HttpStatus for AuthError {
    fn http_status(&self) -> Option<StatusCode> {
        self.status()
    }
}

impl HttpStatus for StatusCode {
    fn http_status(&self) -> Option<StatusCode> {
        Some(*self)
    }
}

impl HttpStatus for u16 {
    fn http_status(&self) -> Option<StatusCode> {
        StatusCode::from_u16(*self).ok()
    }
}

impl HttpStatus for reqwest::Error {
    fn http_status(&self) -> Option<StatusCode> {
        self.status()
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AuthError>;

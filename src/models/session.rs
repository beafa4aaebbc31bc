// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session credentials and lifecycle state.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::time_utils::from_unix_secs;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "AccessToken";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "RefreshToken";

/// Access/refresh token pair as issued by login-end or refresh.
///
/// Either half may be missing: the backend only returns tokens when it
/// hands them to the client, and relies on its session cookie otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// The only claim we care about client-side.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Read the `exp` claim of a signed token without verifying its signature.
///
/// Only used to log when a token will expire. Authorization decisions are
/// always made by the backend. Returns `None` for opaque (non-JWT) tokens.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    from_unix_secs(data.claims.exp)
}

/// Where the session is in the login lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    /// Redirected to the issuer, waiting for the callback with `code`/`state`.
    AwaitingCallback,
    Authenticated,
}

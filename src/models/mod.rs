// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the session core.

pub mod api;
pub mod identity;
pub mod session;

pub use api::{
    LoginEndRequest, LoginEndResponse, LoginStartResponse, LogoutResponse, RefreshTokenRequest,
    RefreshTokenResponse,
};
pub use identity::{Identity, UserInfo};
pub use session::{
    token_expiry, SessionState, TokenClaims, TokenPair, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};

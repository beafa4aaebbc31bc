// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Console-Session: login and session lifecycle for the network console
//!
//! This crate drives the OIDC authorization-code handshake against the
//! backend agent and keeps the session alive with a background refresh
//! timer until logout or refresh failure.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

pub use config::{Config, RefreshFailurePolicy};
pub use error::{AuthError, HttpStatus, Result};
pub use models::{Identity, SessionState, TokenPair};
pub use services::{
    Authenticator, LoginOutcome, LoginParams, LogoutOutcome, PageLocation, RefreshScheduler,
};

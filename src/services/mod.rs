// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session logic and its collaborators.

pub mod authenticator;
pub mod backend;
pub mod location;
pub mod refresh;
pub mod token_store;

pub use authenticator::{Authenticator, LoginOutcome, LoginParams, LogoutOutcome};
pub use backend::{HttpBackend, SessionBackend};
pub use location::PageLocation;
pub use refresh::RefreshScheduler;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

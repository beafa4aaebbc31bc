// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The console page's current URL.
//!
//! The session core never navigates by itself: redirects are returned to the
//! host as values. The only in-place change it makes is the history rewrite
//! that strips transient callback parameters, so a reload cannot replay a
//! spent authorization code.

use reqwest::Url;
use std::sync::RwLock;

use crate::error::{AuthError, Result};

/// Query parameters the issuer appends to the callback URL.
pub const CALLBACK_PARAMS: &[&str] = &["code", "state", "session_state", "iss"];

/// Current page location, shared between the host and the authenticator.
#[derive(Debug)]
pub struct PageLocation {
    current: RwLock<Url>,
}

impl PageLocation {
    pub fn new(url: Url) -> Self {
        Self {
            current: RwLock::new(url),
        }
    }

    pub fn parse(url: &str) -> Result<Self> {
        Ok(Self::new(parse_url(url)?))
    }

    /// Full current URL (`window.location.href`).
    pub fn href(&self) -> Url {
        match self.current.read() {
            Ok(url) => url.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Host-side navigation, e.g. after the issuer redirected back.
    pub fn set(&self, url: Url) {
        match self.current.write() {
            Ok(mut current) => *current = url,
            Err(poisoned) => *poisoned.into_inner() = url,
        }
    }

    /// `history.replaceState` with the callback parameters removed.
    pub fn strip_callback_params(&self) {
        let stripped = without_callback_params(&self.href());
        tracing::debug!(url = %stripped, "Rewrote page URL without callback parameters");
        self.set(stripped);
    }

    /// Where to come back to after logout: no fragment, no callback params.
    pub fn return_url(&self) -> Url {
        let mut url = without_callback_params(&self.href());
        url.set_fragment(None);
        url
    }

    /// The callback URL reported to login-end: the current URL with `code`
    /// and `state` set to the given values.
    pub fn callback_url(&self, code: &str, state: &str) -> Url {
        let mut url = self.href();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !matches!(&**k, "code" | "state"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("code", code)
            .append_pair("state", state);
        url
    }
}

pub(crate) fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| AuthError::Protocol(format!("invalid URL '{}': {}", raw, e)))
}

fn is_callback_param(key: &str) -> bool {
    CALLBACK_PARAMS.contains(&key)
}

fn without_callback_params(url: &Url) -> Url {
    let mut url = url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_callback_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url
}

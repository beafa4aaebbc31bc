// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authenticator: the auth contract consumed by the console shell.
//!
//! Drives the two-leg redirect handshake, gates protected navigation through
//! `check_auth`, and tears the session down on logout. Navigation away from
//! the page is never performed here; it is returned to the host as a
//! [`LoginOutcome`] or [`LogoutOutcome`].

use reqwest::{StatusCode, Url};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::config::Config;
use crate::error::{AuthError, HttpStatus, Result};
use crate::models::{Identity, LoginEndRequest, SessionState, TokenPair};
use crate::services::backend::{HttpBackend, SessionBackend};
use crate::services::location::{parse_url, PageLocation};
use crate::services::refresh::RefreshScheduler;
use crate::services::token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Parameters handed to `login` by the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

impl LoginParams {
    pub fn callback(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            state: Some(state.into()),
        }
    }

    /// Pick `code` and `state` out of a callback URL's query.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match &*key {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Both halves present and non-empty means we are on the end leg.
    fn callback_pair(&self) -> Option<(&str, &str)> {
        match (self.code.as_deref(), self.state.as_deref()) {
            (Some(code), Some(state)) if !code.is_empty() && !state.is_empty() => {
                Some((code, state))
            }
            _ => None,
        }
    }
}

/// What the host should do after `login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Replace the page location with the issuer's authorization URL.
    Redirect(Url),
    /// Handshake finished; the session is live.
    Completed,
}

/// What the host should do after `logout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// There was no session to end.
    AlreadyAnonymous,
    /// Navigate to the issuer's end-session URL, or back into the console.
    Redirect(Url),
}

/// Session authenticator.
pub struct Authenticator {
    backend: Arc<dyn SessionBackend>,
    store: Arc<dyn TokenStore>,
    location: Arc<PageLocation>,
    scheduler: RefreshScheduler,
    session: Arc<watch::Sender<SessionState>>,
    /// Bumped whenever a session ends; a login or auth check that started in
    /// an older epoch must not re-arm the timer.
    epoch: Mutex<u64>,
}

impl Authenticator {
    pub fn new(
        config: &Config,
        backend: Arc<dyn SessionBackend>,
        store: Arc<dyn TokenStore>,
        location: Arc<PageLocation>,
    ) -> Self {
        let session = Arc::new(watch::Sender::new(SessionState::Anonymous));
        let scheduler = RefreshScheduler::new(
            backend.clone(),
            store.clone(),
            session.clone(),
            config.refresh_interval,
            config.refresh_failure_policy,
        );

        Self {
            backend,
            store,
            location,
            scheduler,
            session,
            epoch: Mutex::new(0),
        }
    }

    /// Wire up the HTTP backend, the configured token store and a page
    /// location starting at `app_url`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Arc::new(HttpBackend::new(config)?);
        let store: Arc<dyn TokenStore> = match &config.token_store_path {
            Some(path) => Arc::new(FileTokenStore::open(path)?),
            None => Arc::new(MemoryTokenStore::new()),
        };
        let location = Arc::new(PageLocation::parse(&config.app_url)?);

        tracing::info!(
            api_url = %config.api_url,
            refresh_secs = config.refresh_interval.as_secs(),
            policy = ?config.refresh_failure_policy,
            "Session authenticator initialized"
        );

        Ok(Self::new(config, backend, store, location))
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn location(&self) -> &Arc<PageLocation> {
        &self.location
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        *self.session.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_epoch(&self) -> u64 {
        *self.lock_epoch()
    }

    /// Invalidate in-flight logins and auth checks, then stop refreshing.
    fn end_session(&self) {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        self.scheduler.stop_refreshing();
    }

    /// Store `tokens`, arm the timer and mark the session live, unless the
    /// session was ended after `started` was read.
    fn resume_session(&self, started: u64, tokens: Option<&TokenPair>) -> Result<()> {
        let epoch = self.lock_epoch();
        if *epoch != started {
            tracing::debug!(
                started,
                current = *epoch,
                "Session ended while request was in flight"
            );
            return Err(AuthError::Unauthorized);
        }
        if let Some(tokens) = tokens.filter(|t| !t.is_empty()) {
            self.store.save(tokens)?;
        }
        self.scheduler.start_refreshing();
        self.set_state(SessionState::Authenticated);
        Ok(())
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.session.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "Session state changed");
        }
    }

    // ─── Login ───────────────────────────────────────────────────────────────

    /// Start or finish the login handshake.
    ///
    /// Without `code`/`state` this asks the agent for the issuer's
    /// authorization URL and returns it as a redirect. With them, it
    /// completes the handshake and arms the refresh timer.
    pub async fn login(&self, params: LoginParams) -> Result<LoginOutcome> {
        match params.callback_pair() {
            None => self.login_start().await,
            Some((code, state)) => self.login_end(code, state).await,
        }
    }

    async fn login_start(&self) -> Result<LoginOutcome> {
        tracing::info!("Starting login, requesting authorization URL");

        let response = self.backend.login_start().await.map_err(|e| {
            tracing::error!(error = %e, "Login start failed");
            e
        })?;
        let url = parse_url(&response.authorization_request_url)?;

        self.set_state(SessionState::AwaitingCallback);
        tracing::info!(
            issuer = %url.origin().ascii_serialization(),
            "Redirecting to issuer for authentication"
        );
        Ok(LoginOutcome::Redirect(url))
    }

    async fn login_end(&self, code: &str, state: &str) -> Result<LoginOutcome> {
        tracing::info!("Handling return from issuer");

        let request = LoginEndRequest {
            request_url: self.location.callback_url(code, state).to_string(),
        };

        match self.complete_login(&request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!(error = %e, "Login end failed");
                // Never leave a spent code in the URL for a reload to replay.
                self.cleanup();
                self.set_state(SessionState::Anonymous);
                Err(e)
            }
        }
    }

    async fn complete_login(&self, request: &LoginEndRequest) -> Result<LoginOutcome> {
        let started = self.current_epoch();
        let response = self.backend.login_end(request).await?;

        if !response.is_complete() {
            return Err(AuthError::Protocol(format!(
                "login not completed (handled={}, logged_in={})",
                response.handled, response.logged_in
            )));
        }

        self.resume_session(started, Some(&response.tokens))?;
        self.location.strip_callback_params();

        tracing::info!("Login complete");
        Ok(LoginOutcome::Completed)
    }

    // ─── Logout ──────────────────────────────────────────────────────────────

    /// End the session.
    ///
    /// If the agent already considers us anonymous, nothing is revoked.
    pub async fn logout(&self) -> Result<LogoutOutcome> {
        match self.backend.user_info().await {
            Ok(_) => {}
            Err(AuthError::Unauthorized) => {
                tracing::debug!("Logout requested while already anonymous");
                self.end_session();
                self.forget_tokens();
                self.set_state(SessionState::Anonymous);
                return Ok(LogoutOutcome::AlreadyAnonymous);
            }
            Err(e) => {
                tracing::error!(error = %e, "Identity check before logout failed");
                self.cleanup();
                return Err(e);
            }
        }

        tracing::info!("Logging out");
        self.end_session();

        let revoked = match self.backend.logout().await {
            Ok(response) => Some(response),
            // Session vanished between the probe and the revoke
            Err(AuthError::Unauthorized) => None,
            Err(e) => {
                tracing::error!(error = %e, "Logout failed");
                self.cleanup();
                return Err(e);
            }
        };

        self.forget_tokens();
        self.cleanup();
        self.set_state(SessionState::Anonymous);

        let Some(response) = revoked else {
            return Ok(LogoutOutcome::AlreadyAnonymous);
        };

        let target = match response.logout_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => parse_url(url)?,
            _ => self.location.return_url(),
        };

        tracing::info!(target = %target, "Logged out, redirecting");
        Ok(LogoutOutcome::Redirect(target))
    }

    /// Stop refreshing and strip callback params from the page URL.
    fn cleanup(&self) {
        self.end_session();
        self.location.strip_callback_params();
    }

    fn forget_tokens(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored tokens");
        }
    }

    // ─── Shell contract ──────────────────────────────────────────────────────

    /// Gate for protected navigation: confirm the session with the agent and
    /// keep the refresh timer armed while it holds.
    pub async fn check_auth(&self) -> Result<()> {
        let started = self.current_epoch();
        match self.backend.user_info().await {
            Ok(_) => self.resume_session(started, None),
            Err(e) => {
                tracing::debug!(error = %e, "Not authenticated");
                self.end_session();
                self.forget_tokens();
                self.set_state(SessionState::Anonymous);
                Err(e)
            }
        }
    }

    /// Fail (forcing the shell to log out) only for HTTP 401.
    pub async fn check_error<E: HttpStatus + ?Sized>(&self, error: &E) -> Result<()> {
        match error.http_status() {
            Some(StatusCode::UNAUTHORIZED) => {
                tracing::debug!("Backend returned 401, session is gone");
                Err(AuthError::Unauthorized)
            }
            _ => Ok(()),
        }
    }

    /// Fetch the current user's identity. Never cached.
    pub async fn get_identity(&self) -> Result<Identity> {
        let info = self.backend.user_info().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to fetch identity");
            e
        })?;
        Identity::try_from(info)
    }

    /// Permissions are not decoded client-side.
    pub async fn get_permissions(&self) -> Result<()> {
        Ok(())
    }

    /// Lightweight probe against `/web/check_auth`.
    pub async fn probe(&self) -> Result<bool> {
        self.backend.check_auth().await
    }

    /// Refresh the session right now, outside the timer.
    pub async fn refresh_now(&self) -> Result<TokenPair> {
        self.scheduler.refresh_once().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to refresh the session");
            e
        })
    }
}

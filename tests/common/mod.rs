// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use console_session::config::{Config, RefreshFailurePolicy};
use console_session::error::{AuthError, Result};
use console_session::models::{
    LoginEndRequest, LoginEndResponse, LoginStartResponse, LogoutResponse, RefreshTokenRequest,
    RefreshTokenResponse, TokenPair, UserInfo,
};
use console_session::services::{MemoryTokenStore, PageLocation, SessionBackend};
use console_session::Authenticator;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[allow(dead_code)]
pub const REFRESH_PERIOD: Duration = Duration::from_secs(90);

/// In-memory stand-in for the OIDC agent.
///
/// Records every call by endpoint name so tests can count network traffic.
pub struct FakeBackend {
    pub authenticated: AtomicBool,
    pub authorization_url: Mutex<String>,
    pub login_end_response: Mutex<LoginEndResponse>,
    /// When set, login-end fails with this status.
    pub login_end_status: Mutex<Option<StatusCode>>,
    /// `None` makes the revoke call answer 401.
    pub logout_response: Mutex<Option<LogoutResponse>>,
    /// When set, the revoke call fails with this status.
    pub logout_status: Mutex<Option<StatusCode>>,
    /// When set, refresh fails with this status.
    pub refresh_status: Mutex<Option<StatusCode>>,
    pub refresh_tokens: Mutex<TokenPair>,
    /// When set, user-info fails with this status.
    pub user_info_status: Mutex<Option<StatusCode>>,
    /// Parks the next user-info call until notified.
    pub user_info_hold: Mutex<Option<Arc<Notify>>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub login_end_requests: Mutex<Vec<LoginEndRequest>>,
    pub refresh_requests: Mutex<Vec<RefreshTokenRequest>>,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            authenticated: AtomicBool::new(false),
            authorization_url: Mutex::new("https://issuer.example/auth?x=1".to_string()),
            login_end_response: Mutex::new(LoginEndResponse {
                handled: true,
                logged_in: true,
                tokens: TokenPair {
                    access_token: Some("t1".to_string()),
                    refresh_token: Some("r1".to_string()),
                },
            }),
            login_end_status: Mutex::new(None),
            logout_response: Mutex::new(Some(LogoutResponse {
                logout_url: Some("https://issuer.example/logout".to_string()),
            })),
            logout_status: Mutex::new(None),
            refresh_status: Mutex::new(None),
            refresh_tokens: Mutex::new(TokenPair::default()),
            user_info_status: Mutex::new(None),
            user_info_hold: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            login_end_requests: Mutex::new(Vec::new()),
            refresh_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn logged_in() -> Arc<Self> {
        let backend = Self::new();
        backend.set_authenticated(true);
        backend
    }

    pub fn set_authenticated(&self, value: bool) {
        self.authenticated.store(value, Ordering::SeqCst);
    }

    pub fn fail_refresh(&self, status: Option<StatusCode>) {
        *self.refresh_status.lock().unwrap() = status;
    }

    pub fn fail_user_info(&self, status: Option<StatusCode>) {
        *self.user_info_status.lock().unwrap() = status;
    }

    /// Hold the next user-info call open. Its answer is decided when the
    /// call arrives, not when it is released.
    pub fn hold_next_user_info(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.user_info_hold.lock().unwrap() = Some(release.clone());
        release
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == endpoint)
            .count()
    }

    fn record(&self, endpoint: &'static str) {
        self.calls.lock().unwrap().push(endpoint);
    }

    fn status_error(status: StatusCode) -> AuthError {
        if status == StatusCode::UNAUTHORIZED {
            AuthError::Unauthorized
        } else {
            AuthError::Http {
                status,
                body: String::new(),
            }
        }
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn login_start(&self) -> Result<LoginStartResponse> {
        self.record("login_start");
        Ok(LoginStartResponse {
            authorization_request_url: self.authorization_url.lock().unwrap().clone(),
        })
    }

    async fn login_end(&self, request: &LoginEndRequest) -> Result<LoginEndResponse> {
        self.record("login_end");
        self.login_end_requests.lock().unwrap().push(request.clone());
        if let Some(status) = *self.login_end_status.lock().unwrap() {
            return Err(Self::status_error(status));
        }
        let response = self.login_end_response.lock().unwrap().clone();
        if response.logged_in {
            self.set_authenticated(true);
        }
        Ok(response)
    }

    async fn logout(&self) -> Result<LogoutResponse> {
        self.record("logout");
        if let Some(status) = *self.logout_status.lock().unwrap() {
            return Err(Self::status_error(status));
        }
        let response = self.logout_response.lock().unwrap().clone();
        self.set_authenticated(false);
        response.ok_or(AuthError::Unauthorized)
    }

    async fn user_info(&self) -> Result<UserInfo> {
        self.record("user_info");
        let authenticated = self.authenticated.load(Ordering::SeqCst);
        let failure = *self.user_info_status.lock().unwrap();
        let hold = self.user_info_hold.lock().unwrap().take();

        if let Some(release) = hold {
            release.notified().await;
        }
        if let Some(status) = failure {
            return Err(Self::status_error(status));
        }
        if !authenticated {
            return Err(AuthError::Unauthorized);
        }
        Ok(UserInfo {
            id: Some("user-1".to_string()),
            full_name: Some("Alice Admin".to_string()),
            avatar: Some("https://img.example/alice.png".to_string()),
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        })
    }

    async fn refresh(&self, request: &RefreshTokenRequest) -> Result<RefreshTokenResponse> {
        self.record("refresh");
        self.refresh_requests.lock().unwrap().push(request.clone());
        if let Some(status) = *self.refresh_status.lock().unwrap() {
            return Err(Self::status_error(status));
        }
        Ok(self.refresh_tokens.lock().unwrap().clone())
    }

    async fn check_auth(&self) -> Result<bool> {
        self.record("check_auth");
        Ok(self.authenticated.load(Ordering::SeqCst))
    }
}

/// Test config with the given refresh failure policy.
#[allow(dead_code)]
pub fn test_config(policy: RefreshFailurePolicy) -> Config {
    Config {
        refresh_interval: REFRESH_PERIOD,
        refresh_failure_policy: policy,
        ..Config::default()
    }
}

/// Build an authenticator over a fake backend and an in-memory store.
#[allow(dead_code)]
pub fn create_test_auth(
    backend: Arc<FakeBackend>,
    page_url: &str,
) -> (Authenticator, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let location = Arc::new(PageLocation::parse(page_url).expect("valid page URL"));
    let auth = Authenticator::new(
        &test_config(RefreshFailurePolicy::StopOnFailure),
        backend,
        store.clone(),
        location,
    );
    (auth, store)
}

/// Let spawned tasks run until they block again.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock one refresh period at a time.
#[allow(dead_code)]
pub async fn advance_periods(n: u32) {
    for _ in 0..n {
        tokio::time::advance(REFRESH_PERIOD).await;
        settle().await;
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background session refresh.
//!
//! At most one recurring refresh task exists per scheduler. Starting is
//! idempotent and stopping always cancels whatever was armed last, so the
//! many call sites (login, every `check_auth`, logout) can call freely
//! without stacking timers or leaving orphans behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::RefreshFailurePolicy;
use crate::error::Result;
use crate::models::{RefreshTokenRequest, SessionState, TokenPair, REFRESH_TOKEN_KEY};
use crate::services::backend::SessionBackend;
use crate::services::token_store::TokenStore;

/// Handle of the currently armed refresh task.
struct ArmedTimer {
    /// Distinguishes re-armed timers so a stale task never disarms its successor.
    generation: u64,
    handle: JoinHandle<()>,
}

struct Shared {
    backend: Arc<dyn SessionBackend>,
    store: Arc<dyn TokenStore>,
    session: Arc<watch::Sender<SessionState>>,
    period: Duration,
    policy: RefreshFailurePolicy,
    timer: Mutex<Option<ArmedTimer>>,
    generation: AtomicU64,
}

/// Keeps the backend session alive by refreshing it on a fixed period.
#[derive(Clone)]
pub struct RefreshScheduler {
    shared: Arc<Shared>,
}

impl RefreshScheduler {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        store: Arc<dyn TokenStore>,
        session: Arc<watch::Sender<SessionState>>,
        period: Duration,
        policy: RefreshFailurePolicy,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                store,
                session,
                period,
                policy,
                timer: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    pub fn policy(&self) -> RefreshFailurePolicy {
        self.shared.policy
    }

    /// Arm the refresh timer unless one is already running.
    ///
    /// Returns `true` if a new timer was armed. The first refresh fires one
    /// full period from now. Must be called from within a tokio runtime.
    pub fn start_refreshing(&self) -> bool {
        let mut slot = self.shared.lock_timer();

        if let Some(armed) = slot.as_ref() {
            if !armed.handle.is_finished() {
                tracing::trace!(generation = armed.generation, "Refresh timer already armed");
                return false;
            }
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let first_tick = Instant::now() + self.shared.period;
        let handle = tokio::spawn(run_timer(
            Arc::downgrade(&self.shared),
            generation,
            first_tick,
            self.shared.period,
        ));
        *slot = Some(ArmedTimer { generation, handle });

        tracing::info!(
            generation,
            period_secs = self.shared.period.as_secs(),
            "Armed session refresh timer"
        );
        true
    }

    /// Cancel the refresh timer. No-op when nothing is armed.
    ///
    /// Returns `true` if a timer was cancelled.
    pub fn stop_refreshing(&self) -> bool {
        let armed = self.shared.lock_timer().take();
        match armed {
            Some(armed) => {
                armed.handle.abort();
                tracing::info!(generation = armed.generation, "Cleared session refresh timer");
                true
            }
            None => false,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.shared
            .lock_timer()
            .as_ref()
            .is_some_and(|armed| !armed.handle.is_finished())
    }

    /// One-shot refresh: POST the stored refresh token and store whatever
    /// tokens come back. Does not touch the timer.
    pub async fn refresh_once(&self) -> Result<TokenPair> {
        self.shared.refresh_once().await
    }
}

impl Shared {
    fn lock_timer(&self) -> MutexGuard<'_, Option<ArmedTimer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh_once(&self) -> Result<TokenPair> {
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY)?;
        let tokens = self
            .backend
            .refresh(&RefreshTokenRequest { refresh_token })
            .await?;

        if tokens.is_empty() {
            tracing::debug!("Session refreshed");
        } else {
            self.store.save(&tokens)?;
            tracing::debug!("Session refreshed, new tokens stored");
        }
        Ok(tokens)
    }

    /// Drop the armed timer if it is still the one from `generation`.
    fn disarm(&self, generation: u64) -> bool {
        let mut slot = self.lock_timer();
        if slot.as_ref().is_some_and(|armed| armed.generation == generation) {
            // Detach rather than abort: this runs on the task being disarmed.
            slot.take();
            return true;
        }
        false
    }

    fn expire_session(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored tokens after refresh failure");
        }
        self.session.send_replace(SessionState::Anonymous);
    }
}

async fn run_timer(weak: Weak<Shared>, generation: u64, first_tick: Instant, period: Duration) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // Scheduler dropped: nothing left to keep alive.
        let Some(shared) = weak.upgrade() else {
            return;
        };

        let error = match shared.refresh_once().await {
            Ok(_) => continue,
            Err(e) => e,
        };

        match shared.policy {
            RefreshFailurePolicy::KeepArmed => {
                tracing::warn!(
                    generation,
                    error = %error,
                    "Session refresh failed, retrying on next tick"
                );
            }
            RefreshFailurePolicy::StopOnFailure => {
                tracing::warn!(
                    generation,
                    error = %error,
                    "Session refresh failed, clearing refresh timer"
                );
                if shared.disarm(generation) {
                    shared.expire_session();
                }
                return;
            }
        }
    }
}

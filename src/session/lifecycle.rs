//! Access-token lifecycle.
//!
//! `Session::check` is the single validity gate in front of every catalog
//! call. A token that has not expired is returned as is. An expired one is
//! exchanged for a new one, with at most one exchange in flight: concurrent
//! checkers wait for the running refresh and share its outcome.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use super::endpoint::{AuthError, TokenEndpoint};
use super::token::{SessionStatus, SessionView, TokenResponse, TokenState};
use crate::error::VisualizerError;

pub trait Clock {
    fn now_millis(&self) -> i64;
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

struct Inner {
    tokens: TokenState,
    refreshing: bool,
}

pub struct Session<E, C> {
    inner: Mutex<Inner>,
    refreshed: Condvar,
    endpoint: E,
    clock: C,
}

impl<E: TokenEndpoint, C: Clock> Session<E, C> {
    pub fn new(endpoint: E, clock: C) -> Self {
        Self::restore(TokenState::default(), endpoint, clock)
    }

    pub fn restore(tokens: TokenState, endpoint: E, clock: C) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tokens,
                refreshing: false,
            }),
            refreshed: Condvar::new(),
            endpoint,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a successful provider sign-in. Replaces any previous state,
    /// including a failed one.
    pub fn sign_in(&self, response: TokenResponse) {
        let mut inner = self.lock();
        inner.tokens = TokenState::from_sign_in(response, self.clock.now_millis());
        log::info!("Signed in; access token valid until {:?}", inner.tokens.access_token_expires_at);
    }

    /// Finish the authorization-code flow.
    pub fn sign_in_with_code(&self, code: &str, redirect_uri: &str) -> Result<(), AuthError> {
        let response = self.endpoint.exchange_code(code, redirect_uri)?;
        self.sign_in(response);
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        let inner = self.lock();
        if inner.refreshing {
            return SessionStatus::Refreshing;
        }
        inner.tokens.status(self.clock.now_millis())
    }

    pub fn tokens(&self) -> TokenState {
        self.lock().tokens.clone()
    }

    /// Validate the session, refreshing the access token when it has expired.
    pub fn check(&self) -> SessionView {
        let mut inner = self.lock();
        loop {
            if inner.refreshing {
                inner = self
                    .refreshed
                    .wait(inner)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                continue;
            }

            match inner.tokens.status(self.clock.now_millis()) {
                SessionStatus::Expired => {}
                _ => return inner.tokens.view(),
            }

            let Some(refresh_token) = inner.tokens.refresh_token.clone() else {
                log::error!("Access token expired and no refresh token is held");
                inner.tokens.mark_failed();
                return inner.tokens.view();
            };

            inner.refreshing = true;
            drop(inner);

            log::debug!("Access token expired; refreshing");
            let result = self.endpoint.refresh(&refresh_token);

            inner = self.lock();
            inner.refreshing = false;
            match result {
                Ok(response) => {
                    inner.tokens.apply_refresh(response, self.clock.now_millis());
                    log::info!("Access token refreshed");
                }
                Err(err) => {
                    log::error!("{}", VisualizerError::from(err));
                    inner.tokens.mark_failed();
                }
            }
            self.refreshed.notify_all();
            return inner.tokens.view();
        }
    }
}

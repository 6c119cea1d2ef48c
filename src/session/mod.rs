mod navigator;
mod storage;

pub use navigator::*;
pub use storage::*;

use crate::api::{ApiClient, LoginRequest, RegisterRequest, User};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delay before switching to the dashboard after a successful login
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(100);

type LogoutHook = Box<dyn Fn() + Send + Sync>;

/// The authoritative authentication state shared by the HTTP client and the
/// session operations.
///
/// The in-memory token is the source of truth; every change is written
/// through to the storage slot.
pub struct SessionState {
    token: RwLock<Option<String>>,
    user: RwLock<Option<User>>,
    storage: Box<dyn TokenStorage>,
    navigator: Arc<dyn Navigator>,
    /// Set once the session has been cleared; reset by the next sign-in
    logged_out: AtomicBool,
    logout_hooks: RwLock<Vec<LogoutHook>>,
}

impl SessionState {
    pub fn new(storage: Box<dyn TokenStorage>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            token: RwLock::new(None),
            user: RwLock::new(None),
            storage,
            navigator,
            logged_out: AtomicBool::new(false),
            logout_hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn stored_token(&self) -> Option<String> {
        self.storage.load()
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Register a callback run whenever the session is cleared.
    pub fn on_logout(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.logout_hooks.write().push(Box::new(hook));
    }

    pub(crate) fn establish(&self, token: String, user: Option<User>) {
        if let Err(e) = self.storage.save(&token) {
            tracing::warn!("Failed to persist session token: {}", e);
        }
        *self.token.write() = Some(token);
        *self.user.write() = user;
        self.logged_out.store(false, Ordering::Release);
    }

    /// Signs out locally. Also disarms [`force_logout`](Self::force_logout)
    /// until the next sign-in, so late 401s from requests issued before the
    /// logout do not start a second logout cycle.
    pub(crate) fn clear(&self) {
        self.logged_out.store(true, Ordering::Release);
        *self.token.write() = None;
        *self.user.write() = None;
        if let Err(e) = self.storage.clear() {
            tracing::warn!("Failed to clear stored session token: {}", e);
        }
        for hook in self.logout_hooks.read().iter() {
            hook();
        }
    }

    /// Purge the session and send the user to the login screen.
    ///
    /// Concurrent callers (several requests failing with 401 at once) produce
    /// a single logout; returns whether this call performed it.
    pub fn force_logout(&self) -> bool {
        if self
            .logged_out
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        tracing::info!("Session expired, logging out");
        self.clear();
        self.navigator.navigate(Route::Login);
        true
    }
}

/// Result of a login or registration attempt. Failures are reported here
/// rather than as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Login, registration and logout against the backend.
#[derive(Clone)]
pub struct Session {
    api: ApiClient,
    state: Arc<SessionState>,
    redirect_delay: Duration,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        let state = api.session().clone();
        Self {
            api,
            state,
            redirect_delay: LOGIN_REDIRECT_DELAY,
        }
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = match self.api.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", email, e);
                return AuthOutcome::failed(e.user_message());
            }
        };

        let Some(token) = response.access_token.filter(|t| !t.is_empty()) else {
            return AuthOutcome::failed("Login response did not include an access token");
        };

        // Older backends return only the token; the profile comes from verify
        let user = match response.user {
            Some(user) => Some(user),
            None => self.api.verify_token(&token).await.ok(),
        };

        self.state.establish(token, user);
        tracing::info!("Logged in as {}", email);

        let navigator = self.state.navigator().clone();
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(Route::Dashboard);
        });

        AuthOutcome::ok()
    }

    /// Create an account. Registration is gated by the super key; the caller
    /// decides where to go next.
    pub async fn register(&self, request: &RegisterRequest) -> AuthOutcome {
        match self.api.register(request).await {
            Ok(response) => {
                if let Some(token) = response.access_token.filter(|t| !t.is_empty()) {
                    self.state.establish(token, response.user);
                }
                tracing::info!("Registered {}", request.email);
                AuthOutcome::ok()
            }
            Err(e) => {
                tracing::warn!("Registration failed for {}: {}", request.email, e);
                AuthOutcome::failed(e.user_message())
            }
        }
    }

    /// Best-effort server-side logout, then an unconditional local one.
    pub async fn logout(&self) {
        if self.state.is_authenticated() {
            if let Err(e) = self.api.logout().await {
                tracing::warn!("Server logout failed, clearing local session anyway: {}", e);
            }
        }
        self.state.clear();
        self.state.navigator().navigate(Route::Login);
    }

    /// Check a token with the backend and adopt it on success. Any failure,
    /// expired token or network error alike, clears the session.
    pub async fn verify_token(&self, token: &str) -> bool {
        match self.api.verify_token(token).await {
            Ok(user) => {
                self.state.establish(token.to_string(), Some(user));
                true
            }
            Err(e) => {
                tracing::info!("Stored token rejected: {}", e);
                self.state.clear();
                false
            }
        }
    }

    /// Start-up check: verify the stored token, if any.
    pub async fn restore(&self) -> bool {
        match self.state.stored_token() {
            Some(token) => self.verify_token(&token).await,
            None => false,
        }
    }
}

//! Side-Effect Dispatcher.
//!
//! Classification is pure; this module performs the observable consequences
//! of a classified failure:
//!
//! - [`ErrorKind::Unauthorized`] clears the session and, unless the user is
//!   already on the login view, redirects there once with the current
//!   location as the return target.
//! - Unless the call opted out with `skip_error_handler`, the user is notified
//!   exactly once and the error is marked `handled`.
//!
//! The error is always handed back to the caller; dispatch never swallows it.
//!
//! ## Concurrency
//!
//! Several in-flight calls may fail with 401 at the same time. Each of them
//! clears the store before its caller sees the rejection, since clearing is
//! idempotent. Only the redirect is guarded: the first failure of a session
//! redirects, the others do not. The guard latches only when a redirect
//! actually fires and remembers the token it fired for. It re-arms on
//! [`SideEffectDispatcher::rearm`], or when a 401 arrives while the store
//! holds a different token (a session established through the store's own
//! setter).

use std::sync::{Arc, Mutex, PoisonError};

use pipeline::{ClassifiedError, CredentialStore, ErrorKind, Navigator, Notifier, RequestOptions};
use tracing::{debug, info, warn};

/// Query parameter carrying the return target on the login redirect.
pub const REDIRECT_PARAM: &str = "redirect";

/// Performs notification, session invalidation, and login redirect.
pub struct SideEffectDispatcher {
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    guard: Mutex<RedirectGuard>,
}

/// State of the login redirect.
#[derive(Debug, Default)]
struct RedirectGuard {
    latched: bool,
    /// Token held by the store when the latched redirect fired.
    token: Option<String>,
}

impl RedirectGuard {
    /// Decides whether a 401 seen with `token` in the store should redirect,
    /// latching if so.
    fn try_latch(&mut self, token: Option<String>) -> bool {
        let fresh_session = token.is_some() && token != self.token;
        if self.latched && !fresh_session {
            return false;
        }
        self.latched = true;
        self.token = token;
        true
    }
}

impl SideEffectDispatcher {
    /// Creates a dispatcher. `login_path` is the path of the login view
    /// (e.g. `"/login"`).
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            notifier,
            navigator,
            login_path: login_path.into(),
            guard: Mutex::new(RedirectGuard::default()),
        }
    }

    /// Applies the side effects of `error` and returns it, marked `handled`
    /// if a notification was shown.
    pub async fn dispatch(
        &self,
        mut error: ClassifiedError,
        options: &RequestOptions,
    ) -> ClassifiedError {
        if error.kind == ErrorKind::Unauthorized {
            self.invalidate_session().await;
        }

        if options.skip_error_handler {
            debug!(kind = %error.kind, "notification suppressed by caller");
        } else if !error.handled {
            self.notifier.notify(&error.message);
            error.handled = true;
        }

        error
    }

    /// Returns `true` while a login redirect is pending.
    pub fn is_redirecting(&self) -> bool {
        self.lock_guard().latched
    }

    /// Re-arms the redirect guard after a new session has been established.
    pub fn rearm(&self) {
        *self.lock_guard() = RedirectGuard::default();
    }

    fn lock_guard(&self) -> std::sync::MutexGuard<'_, RedirectGuard> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn invalidate_session(&self) {
        let token = self.credentials.session().await.token;
        if let Err(err) = self.credentials.clear().await {
            warn!(error = %err, "failed to clear credential store");
        }

        let current = self.navigator.current_location();
        if is_login_location(&current, &self.login_path) {
            debug!(location = %current, "already on the login view; not redirecting");
            return;
        }

        if !self.lock_guard().try_latch(token) {
            debug!("login redirect already issued for this session");
            return;
        }

        let target = login_redirect_target(&self.login_path, &current);
        info!(target = %target, "session invalidated; redirecting to login");
        self.navigator.redirect(&target);
    }
}

/// Returns `true` if `location` (path plus optional query) is the login view.
fn is_login_location(location: &str, login_path: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/') == login_path.trim_end_matches('/')
}

/// Builds `"{login_path}?redirect={encoded current}"`.
pub fn login_redirect_target(login_path: &str, current: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(current.as_bytes()).collect();
    format!("{login_path}?{REDIRECT_PARAM}={encoded}")
}

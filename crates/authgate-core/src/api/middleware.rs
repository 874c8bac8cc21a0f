//! Request and response interceptors run by `ApiClient` around every call.
//!
//! Request interceptors run in registration order before a request is sent
//! and may rewrite it; an error rejects the request before anything goes on
//! the wire. Response interceptors observe every failed exchange (error
//! status or transport failure) in registration order. They cannot swallow
//! the failure: the caller always receives the original error.

use std::sync::Arc;

use anyhow::Result;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use tracing::{debug, warn};

use crate::auth::SessionStore;

use super::ApiError;

pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, request: &mut Request) -> Result<()>;
}

pub trait ResponseInterceptor: Send + Sync {
    fn on_error(&self, error: &ApiError);
}

/// Sends the user to the login surface. Front-ends without one pass no
/// navigator and only the session is cleared.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Attaches `Authorization: Bearer <token>` from the session, if any.
///
/// A request that already carries an `Authorization` header is left alone,
/// so callers can present an explicit token (e.g. right after login).
pub struct BearerAuth {
    session: Arc<SessionStore>,
}

impl BearerAuth {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }
}

impl RequestInterceptor for BearerAuth {
    fn on_request(&self, request: &mut Request) -> Result<()> {
        if request.headers().contains_key(AUTHORIZATION) {
            return Ok(());
        }
        if let Some(token) = self.session.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(())
    }
}

/// On a 401, signs the session out and navigates to the login path.
pub struct UnauthorizedRedirect {
    session: Arc<SessionStore>,
    login_path: String,
    navigator: Option<Arc<dyn Navigator>>,
}

impl UnauthorizedRedirect {
    pub fn new(
        session: Arc<SessionStore>,
        login_path: impl Into<String>,
        navigator: Option<Arc<dyn Navigator>>,
    ) -> Self {
        Self {
            session,
            login_path: login_path.into(),
            navigator,
        }
    }
}

impl ResponseInterceptor for UnauthorizedRedirect {
    fn on_error(&self, error: &ApiError) {
        if !error.is_unauthorized() {
            return;
        }
        warn!("Server rejected the session token, signing out");
        if let Err(e) = self.session.clear_auth() {
            warn!(error = %e, "Failed to remove stored token");
        }
        match self.navigator {
            Some(ref navigator) => navigator.navigate(&self.login_path),
            None => debug!(path = %self.login_path, "No navigator attached, skipping redirect"),
        }
    }
}

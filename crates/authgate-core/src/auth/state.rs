use serde::{Deserialize, Serialize};

use crate::models::UserMe;

/// Observable authentication state.
///
/// Only `SessionStore` produces new values; front-ends read snapshots or
/// subscribe to changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthState {
    pub is_authenticated: bool,
    pub token: Option<String>,
    pub user: Option<UserMe>,
    /// An identity check is in flight.
    pub loading: bool,
    /// Startup has resolved; front-ends hold off rendering signed-out
    /// content until this is set.
    pub initialized: bool,
}

impl AuthState {
    pub(crate) fn authenticated(token: String, user: UserMe) -> Self {
        Self {
            is_authenticated: true,
            token: Some(token),
            user: Some(user),
            loading: false,
            initialized: true,
        }
    }

    pub(crate) fn cleared() -> Self {
        Self {
            initialized: true,
            ..Self::default()
        }
    }

    /// Short label for status lines
    pub fn status_label(&self) -> &'static str {
        match (self.initialized, self.loading, self.is_authenticated) {
            (_, true, _) => "checking",
            (false, false, _) => "uninitialized",
            (true, false, true) if self.user.is_some() => "signed in",
            (true, false, true) => "unverified",
            (true, false, false) => "signed out",
        }
    }
}

//! Authentication session management.
//!
//! This module provides:
//! - `SessionStore`: owner of the observable `AuthState`, with the
//!   `set_auth` / `clear_auth` / `set_loading` / `init_auth` operations
//! - `TokenStorage`: durable slot for the bearer token, backed by a JSON file,
//!   the OS keychain, or memory

pub mod credentials;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;

pub use credentials::KeyringTokenStorage;
pub use session::FileTokenStorage;
pub use state::AuthState;
pub use storage::{open_storage, MemoryTokenStorage, TokenStorage};
pub use store::{AuthApi, SessionStore, Subscription};

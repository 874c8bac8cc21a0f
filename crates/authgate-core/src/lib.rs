//! Client-side authentication sessions.
//!
//! A `SessionStore` owns the observable authentication state and mirrors the
//! bearer token into durable storage. An `ApiClient` built with
//! `ApiClient::for_session` attaches that token to every request and signs
//! the session out when the server answers 401.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authgate_core::api::ApiClient;
//! use authgate_core::auth::{open_storage, SessionStore};
//! use authgate_core::config::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let session = Arc::new(SessionStore::new(open_storage(&config)?, config.storage_key.clone()));
//! let client = ApiClient::for_session(&config, session.clone(), None)?;
//!
//! if session.init_auth(&client).await?.is_some() {
//!     println!("Signed in as {}", client.me().await?.email);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, Navigator, Queries};
pub use auth::{AuthApi, AuthState, SessionStore, Subscription, TokenStorage};
pub use config::Config;
pub use models::{AuthToken, UserMe};

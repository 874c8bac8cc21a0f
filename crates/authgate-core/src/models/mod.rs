//! Data models exchanged with the authentication API.
//!
//! - `UserMe`: profile returned by the identity endpoint
//! - `LoginRequest`, `AuthToken`: login request and issued token pair

pub mod user;

pub use user::{AuthToken, LoginRequest, UserMe};

//! HTTP client adapter for the authentication API.
//!
//! This module provides the `ApiClient` used for all outbound requests. The
//! client runs an interceptor chain around every call: `BearerAuth` attaches
//! the session token, `UnauthorizedRedirect` signs the session out and sends
//! the user to the login path when the server answers 401.
//!
//! `Queries` layers a short-lived result cache over the typed endpoints.

pub mod client;
pub mod error;
pub mod middleware;
pub mod queries;

pub use client::ApiClient;
pub use error::ApiError;
pub use middleware::{BearerAuth, Navigator, RequestInterceptor, ResponseInterceptor, UnauthorizedRedirect};
pub use queries::Queries;

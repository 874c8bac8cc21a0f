//! API client shared by all outbound application traffic.
//!
//! One `reqwest::Client` with a fixed base URL, timeout and JSON content
//! type, wrapped by the interceptor chain from `middleware`. Clone is cheap:
//! the connection pool and the interceptors are shared.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::{AuthApi, SessionStore};
use crate::config::Config;
use crate::models::{AuthToken, LoginRequest, UserMe};

use super::middleware::{BearerAuth, Navigator, RequestInterceptor, ResponseInterceptor, UnauthorizedRedirect};
use super::ApiError;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    me_path: String,
    login_endpoint: String,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl ApiClient {
    /// Create a client with no interceptors
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            me_path: config.me_path.clone(),
            login_endpoint: config.login_endpoint.clone(),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        })
    }

    /// Create a client bound to `session`: outgoing requests carry its token
    /// and a 401 signs it out and navigates to the configured login path.
    pub fn for_session(
        config: &Config,
        session: Arc<SessionStore>,
        navigator: Option<Arc<dyn Navigator>>,
    ) -> Result<Self> {
        Ok(Self::new(config)?
            .with_request_interceptor(BearerAuth::new(session.clone()))
            .with_response_interceptor(UnauthorizedRedirect::new(
                session,
                config.login_path.clone(),
                navigator,
            )))
    }

    pub fn with_request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn with_response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Start a request against `path` relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Run a request through the interceptor chain.
    ///
    /// Non-2xx responses and transport failures become `ApiError`s; the
    /// response interceptors see them before they are returned.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let mut request = builder.build().context("Failed to build request")?;
        for interceptor in &self.request_interceptors {
            interceptor.on_request(&mut request)?;
        }

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "Sending request");

        let error = match self.client.execute(request).await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                ApiError::from_status(status, &body)
            }
            Err(e) => ApiError::NetworkError(e),
        };

        debug!(%method, %url, status = ?error.status(), error = %error, "Request failed");
        for interceptor in &self.response_interceptors {
            interceptor.on_error(&error);
        }
        Err(error.into())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        Self::parse(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .execute(self.request(Method::POST, path).json(body))
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let url = response.url().clone();
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)).into())
    }

    /// Current user's profile
    pub async fn me(&self) -> Result<UserMe> {
        self.get_json(&self.me_path).await
    }

    /// Exchange credentials for a token pair
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthToken> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post_json(&self.login_endpoint, &body).await
    }
}

impl AuthApi for ApiClient {
    async fn fetch_me(&self) -> Result<UserMe> {
        self.me().await
    }

    async fn fetch_me_as(&self, token: &str) -> Result<UserMe> {
        let response = self
            .execute(self.request(Method::GET, &self.me_path).bearer_auth(token))
            .await?;
        Self::parse(response).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthToken> {
        self.authenticate(username, password).await
    }
}

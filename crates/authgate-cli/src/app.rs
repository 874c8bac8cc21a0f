//! Application state for the authgate CLI.
//!
//! `App` wires the session store, the API client and the cached queries
//! together and runs one command per process. Every command except `login`
//! and `logout` first restores the stored session with `init_auth`.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use authgate_core::api::{ApiClient, Navigator, Queries};
use authgate_core::auth::{open_storage, SessionStore, TokenStorage};
use authgate_core::config::Config;
use tracing::{debug, info, warn};

use crate::Command;

/// Stands in for the browser redirect: remembers that the server rejected
/// the session so the user can be told to sign in again.
#[derive(Debug, Default)]
pub struct CliNavigator {
    redirected: AtomicBool,
}

impl CliNavigator {
    pub fn redirected(&self) -> bool {
        self.redirected.load(Ordering::SeqCst)
    }
}

impl Navigator for CliNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Session rejected, login required");
        self.redirected.store(true, Ordering::SeqCst);
    }
}

pub struct App {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub client: ApiClient,
    pub queries: Queries,
    navigator: Arc<CliNavigator>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let storage = open_storage(&config)?;
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn TokenStorage>) -> Result<Self> {
        let session = Arc::new(SessionStore::new(storage, config.storage_key.clone()));
        let navigator = Arc::new(CliNavigator::default());
        let client = ApiClient::for_session(&config, session.clone(), Some(navigator.clone()))?;
        let queries = Queries::new(client.clone(), session.clone(), config.query_stale_time());

        Ok(Self {
            config,
            session,
            client,
            queries,
            navigator,
        })
    }

    /// True once any request was answered with 401 during this run
    pub fn login_required(&self) -> bool {
        self.navigator.redirected()
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        self.watch_session();

        match command {
            Command::Login { username } => self.login(username).await,
            Command::Logout => self.logout(),
            Command::Whoami => self.whoami().await,
            Command::Status => self.status().await,
            Command::Get { path } => self.get(&path).await,
        }
    }

    /// Trace every session transition while the command runs
    fn watch_session(&self) {
        let mut subscription = self.session.subscribe();
        tokio::spawn(async move {
            while let Some(state) = subscription.changed().await {
                debug!(status = state.status_label(), "Session state changed");
            }
        });
    }

    async fn bootstrap(&self) -> Result<Option<String>> {
        self.session
            .init_auth(&self.client)
            .await
            .context("Failed to restore session")
    }

    async fn require_session(&self) -> Result<()> {
        if self.bootstrap().await?.is_none() {
            anyhow::bail!("Not signed in. Run `authgate login` first.");
        }
        Ok(())
    }

    async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(name) if !name.trim().is_empty() => name,
            _ => Self::prompt_username()?,
        };
        let password = Self::prompt_password()?;

        if username.is_empty() || password.is_empty() {
            anyhow::bail!("Username and password required");
        }

        eprintln!("Authenticating...");
        let user = self
            .session
            .login(&self.client, &username, &password)
            .await
            .context("Login failed")?;

        if let Err(e) = Config::remember_username(&username) {
            warn!(error = %e, "Failed to save config");
        }
        self.config.last_username = Some(username);

        println!("Signed in as {}", user.email);
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        self.session.logout()?;
        println!("Signed out");
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        self.require_session().await?;
        if let Some(user) = self.session.snapshot().user {
            self.queries.prime_me(user);
        }
        let user = self.queries.me().await?;

        println!("{}", user.email);
        println!("  id:         {}", user.id);
        println!("  role:       {}", user.role_display());
        println!("  tenant:     {}", user.tenant);
        println!("  created:    {}", user.created_at.format("%Y-%m-%d %H:%M UTC"));
        if !user.components.is_empty() {
            println!("  components: {}", user.components.join(", "));
        }
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        self.bootstrap().await?;
        let state = self.session.snapshot();
        match state.user {
            Some(ref user) => println!("{} ({})", state.status_label(), user.email),
            None => println!("{}", state.status_label()),
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<()> {
        self.require_session().await?;
        let body: serde_json::Value = self.client.get_json(path).await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    }

    fn prompt_username() -> Result<String> {
        print!("Username: ");
        io::stdout().flush()?;

        let mut username = String::new();
        io::stdin().read_line(&mut username)?;
        Ok(username.trim().to_string())
    }

    fn prompt_password() -> Result<String> {
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }
}

#[cfg(test)]
mod tests {
    use authgate_core::auth::MemoryTokenStorage;
    use authgate_core::config::StorageBackend;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(server: &MockServer) -> Config {
        Config {
            base_url: server.uri(),
            storage: StorageBackend::Memory,
            ..Config::default()
        }
    }

    fn user_json() -> serde_json::Value {
        json!({
            "id": "0e65066c-ab20-4da0-b3bf-79dfd0668049",
            "email": "admin@example.com",
            "role": "admin",
            "tenant": "default",
            "created_at": "2024-01-30T20:07:20Z",
            "settings": "{}",
            "components": ["users"]
        })
    }

    #[tokio::test]
    async fn test_whoami_with_stored_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            // Verified once at startup, then served from the query cache
            .expect(1)
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryTokenStorage::with_value("auth_token", "abc123"));
        let mut app = App::with_storage(config(&server), storage).unwrap();

        app.run(Command::Whoami).await.unwrap();
        assert!(app.session.is_authenticated());
        assert!(!app.login_required());
    }

    #[tokio::test]
    async fn test_whoami_without_session_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = App::new(config(&server)).unwrap();
        let err = app.run(Command::Whoami).await.unwrap_err();
        assert!(err.to_string().contains("Not signed in"));
        assert!(app.session.snapshot().initialized);
    }

    #[tokio::test]
    async fn test_rejected_session_requires_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryTokenStorage::with_value("auth_token", "expired"));
        let mut app = App::with_storage(config(&server), storage.clone()).unwrap();

        app.run(Command::Status).await.unwrap();
        assert!(app.login_required());
        assert!(!app.session.is_authenticated());
        assert_eq!(storage.get("auth_token").unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_storage() {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryTokenStorage::with_value("auth_token", "abc123"));
        let mut app = App::with_storage(config(&server), storage.clone()).unwrap();

        app.run(Command::Logout).await.unwrap();
        assert_eq!(storage.get("auth_token").unwrap(), None);
        assert!(app.session.snapshot().initialized);
    }

    #[test]
    fn test_cli_navigator_records_redirect() {
        let navigator = CliNavigator::default();
        assert!(!navigator.redirected());
        navigator.navigate("/login");
        assert!(navigator.redirected());
    }
}

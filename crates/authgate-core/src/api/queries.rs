use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::auth::SessionStore;
use crate::cache::QueryCache;
use crate::models::UserMe;

use super::ApiClient;

/// Cached read queries over an `ApiClient`.
///
/// Results are keyed by the session token so a sign-in or sign-out never
/// serves another session's data.
pub struct Queries {
    client: ApiClient,
    session: Arc<SessionStore>,
    me: QueryCache<UserMe>,
}

impl Queries {
    pub fn new(client: ApiClient, session: Arc<SessionStore>, stale_time: Duration) -> Self {
        Self {
            client,
            session,
            me: QueryCache::new(stale_time),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn me(&self) -> Result<UserMe> {
        let key = self.key("me");
        if let Some(user) = self.me.get_fresh(&key) {
            debug!("Serving cached profile");
            return Ok(user);
        }
        let user = self.client.me().await?;
        self.me.insert(key, user.clone());
        Ok(user)
    }

    /// Seed the profile query with one already fetched for the current
    /// session, such as the profile `init_auth` verified.
    pub fn prime_me(&self, user: UserMe) {
        self.me.insert(self.key("me"), user);
    }

    pub fn invalidate(&self) {
        self.me.clear();
    }

    fn key(&self, query: &str) -> String {
        match self.session.token() {
            Some(token) => format!("{}:{}", query, token),
            None => format!("{}:anonymous", query),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::MemoryTokenStorage;
    use crate::config::Config;

    fn user_json(email: &str) -> serde_json::Value {
        json!({
            "id": "0e65066c-ab20-4da0-b3bf-79dfd0668049",
            "email": email,
            "tenant": "default",
            "created_at": "2024-01-30T20:07:20Z",
            "settings": "",
            "components": []
        })
    }

    async fn setup(server: &MockServer) -> (Arc<SessionStore>, Queries) {
        let session = Arc::new(SessionStore::new(
            Arc::new(MemoryTokenStorage::default()),
            "auth_token",
        ));
        let config = Config {
            base_url: server.uri(),
            ..Config::default()
        };
        let client = ApiClient::for_session(&config, session.clone(), None).unwrap();
        let queries = Queries::new(client, session.clone(), config.query_stale_time());
        (session, queries)
    }

    #[tokio::test]
    async fn test_me_is_cached_within_stale_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json("a@example.com")))
            .expect(1)
            .mount(&server)
            .await;

        let (session, queries) = setup(&server).await;
        let user: UserMe = serde_json::from_value(user_json("a@example.com")).unwrap();
        session.set_auth("t1", user).unwrap();

        assert_eq!(queries.me().await.unwrap().email, "a@example.com");
        assert_eq!(queries.me().await.unwrap().email, "a@example.com");
    }

    #[tokio::test]
    async fn test_me_refetches_after_invalidate_and_token_change() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json("a@example.com")))
            .expect(3)
            .mount(&server)
            .await;

        let (session, queries) = setup(&server).await;
        let user: UserMe = serde_json::from_value(user_json("a@example.com")).unwrap();
        session.set_auth("t1", user.clone()).unwrap();

        queries.me().await.unwrap();
        queries.invalidate();
        queries.me().await.unwrap();

        session.set_auth("t2", user).unwrap();
        queries.me().await.unwrap();
    }

    #[tokio::test]
    async fn test_primed_profile_skips_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json("b@example.com")))
            .expect(1)
            .mount(&server)
            .await;

        let (session, queries) = setup(&server).await;
        let user: UserMe = serde_json::from_value(user_json("a@example.com")).unwrap();
        session.set_auth("t1", user.clone()).unwrap();

        queries.prime_me(user);
        assert_eq!(queries.me().await.unwrap().email, "a@example.com");

        // Primed under the old token only
        let other: UserMe = serde_json::from_value(user_json("b@example.com")).unwrap();
        session.set_auth("t2", other).unwrap();
        assert_eq!(queries.me().await.unwrap().email, "b@example.com");
    }

    #[tokio::test]
    async fn test_failed_query_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let (_session, queries) = setup(&server).await;
        assert!(queries.me().await.is_err());
        assert!(queries.me().await.is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile of the signed-in user, as returned by the identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserMe {
    pub id: Uuid,
    /// Login name; usually an email address but not guaranteed to be one.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub tenant: String,
    pub created_at: DateTime<Utc>,
    /// Opaque front-end settings blob (filters, timezone, ...).
    #[serde(default)]
    pub settings: String,
    /// Menu sections the user may open.
    #[serde(default)]
    pub components: Vec<String>,
}

impl UserMe {
    pub fn role_display(&self) -> &str {
        self.role.as_deref().unwrap_or("none")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token pair issued by the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access: String,
    pub refresh: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_me() {
        let json = r#"{"id":"0e65066c-ab20-4da0-b3bf-79dfd0668049","email":"admin@example.com","role":"admin","tenant":"default","created_at":"2024-01-30T20:07:20Z","settings":"{}","components":["users","posts"]}"#;

        let user: UserMe = serde_json::from_str(json).expect("Failed to parse user test JSON");
        assert_eq!(user.email, "admin@example.com");
        assert_eq!(user.role_display(), "admin");
        assert_eq!(user.tenant, "default");
        assert_eq!(user.components, vec!["users", "posts"]);
    }

    #[test]
    fn test_parse_user_me_without_role() {
        let json = r#"{"id":"0e65066c-ab20-4da0-b3bf-79dfd0668049","email":"a@b.c","tenant":"t","created_at":"2024-01-30T20:07:20Z","settings":"","components":[]}"#;

        let user: UserMe = serde_json::from_str(json).expect("Failed to parse user test JSON");
        assert!(user.role.is_none());
        assert_eq!(user.role_display(), "none");
    }

    #[test]
    fn test_parse_auth_token() {
        let token: AuthToken =
            serde_json::from_str(r#"{"access":"at_1","refresh":"rt_1"}"#).expect("parse token");
        assert_eq!(token.access, "at_1");
        assert_eq!(token.refresh, "rt_1");
    }
}

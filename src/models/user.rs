//! User model
//!
//! Profiles of backend accounts as the client sees them, plus the persisted
//! login record that carries the bearer token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend account profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Login name
    pub username: String,
    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// User role
    #[serde(default)]
    pub role: UserRole,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Dashboard this user lands on after login
    pub fn dashboard(&self) -> Dashboard {
        match self.role {
            UserRole::Admin => Dashboard::Admin,
            UserRole::User => Dashboard::Staff,
        }
    }

    /// Name to greet the user with
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrator - user management, activity logs, statistics
    Admin,
    /// Regular staff - inventory work only
    #[default]
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Role-based landing view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Admin,
    Staff,
}

/// The persisted login record: profile fields plus the bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub profile: User,
    /// Bearer token issued at login or by the last renewal
    #[serde(default)]
    pub token: Option<String>,
}

/// Credentials for `POST /auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Input for creating a user from the admin dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: UserRole,
    /// Ask the backend to mail the new account its credentials
    pub send_welcome_email: bool,
}

/// Input for updating a user
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

/// What happened to the welcome email requested with a new user.
///
/// The backend reports delivery once; the client never retries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailDelivery {
    NotRequested,
    Sent,
    Failed(String),
}

/// Result of creating a user
#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub user: User,
    pub email: EmailDelivery,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 7,
            username: "rina".to_string(),
            full_name: None,
            email: None,
            role,
            created_at: None,
        }
    }

    #[test]
    fn test_dashboard_follows_role() {
        assert_eq!(user(UserRole::Admin).dashboard(), Dashboard::Admin);
        assert_eq!(user(UserRole::User).dashboard(), Dashboard::Staff);
        assert!(user(UserRole::Admin).is_admin());
        assert!(!user(UserRole::User).is_admin());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut u = user(UserRole::User);
        assert_eq!(u.display_name(), "rina");
        u.full_name = Some("  ".to_string());
        assert_eq!(u.display_name(), "rina");
        u.full_name = Some("Rina Wulandari".to_string());
        assert_eq!(u.display_name(), "Rina Wulandari");
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("user".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_stored_user_flattens_profile() {
        let json = r#"{"id":3,"username":"budi","role":"admin","token":"abc.def.ghi"}"#;
        let stored: StoredUser = serde_json::from_str(json).unwrap();

        assert_eq!(stored.profile.username, "budi");
        assert_eq!(stored.profile.role, UserRole::Admin);
        assert_eq!(stored.token.as_deref(), Some("abc.def.ghi"));

        let back = serde_json::to_value(&stored).unwrap();
        assert_eq!(back["username"], "budi");
        assert_eq!(back["token"], "abc.def.ghi");
    }

    #[test]
    fn test_new_user_serializes_camel_case() {
        let input = NewUser {
            username: "sari".to_string(),
            password: "rahasia".to_string(),
            full_name: Some("Sari".to_string()),
            email: None,
            role: UserRole::User,
            send_welcome_email: true,
        };
        let value = serde_json::to_value(&input).unwrap();

        assert_eq!(value["sendWelcomeEmail"], true);
        assert_eq!(value["fullName"], "Sari");
        assert!(value.get("email").is_none());
    }
}

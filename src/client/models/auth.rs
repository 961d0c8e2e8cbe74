//! Authentication models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Credentials for `POST /auth/login`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>, remember_me: bool) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember_me: Some(remember_me),
        }
    }

    /// Reject obviously unusable credentials before sending them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(ValidationError::InvalidEmail),
        }
        if self.password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(())
    }
}

/// User record embedded in the login response and persisted with the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Authenticated session returned by `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
}

/// Response of `POST /auth/refresh`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Full profile from `GET /auth/profile`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl From<SessionUser> for UserProfile {
    /// Partial profile built from the login payload, used to warm the cache
    fn from(user: SessionUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: true,
            created_at: None,
            updated_at: None,
            last_login: None,
        }
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User record in the users table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String, // partition key
    pub email: String,   // unique, lower-cased
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2, never exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            user_id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// User without credentials; what the authorization path and profile
/// endpoints work with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Profile fields that may change after registration.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none()
    }
}

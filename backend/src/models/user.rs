use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::Type, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, Default)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    #[default]
    Freelancer,
    Client,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Admin => "ADMIN",
            UserRole::Freelancer => "FREELANCER",
            UserRole::Client => "CLIENT",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub clerk_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub identity_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last" with missing parts dropped; falls back to the e-mail address.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Profile data pushed by the identity provider, either from a webhook or from
/// a profile fetch. `observed_at` orders competing writes for the same user.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub clerk_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub phone: Option<String>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum IdentityUpsertOutcome {
    Created(User),
    Updated(User),
    /// The stored row already reflects newer identity data; nothing was written.
    Stale(User),
}

impl IdentityUpsertOutcome {
    pub fn user(&self) -> &User {
        match self {
            IdentityUpsertOutcome::Created(u)
            | IdentityUpsertOutcome::Updated(u)
            | IdentityUpsertOutcome::Stale(u) => u,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            IdentityUpsertOutcome::Created(u)
            | IdentityUpsertOutcome::Updated(u)
            | IdentityUpsertOutcome::Stale(u) => u,
        }
    }
}

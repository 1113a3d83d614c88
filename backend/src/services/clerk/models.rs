use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::user::IdentityProfile;
use crate::utils::date::from_unix_millis;

#[derive(Clone, Debug, Deserialize)]
pub struct ClerkEmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email_address: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ClerkPhoneNumber {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub phone_number: String,
}

/// User object as Clerk sends it, both in `user.*` webhooks and from
/// `GET /v1/users/{id}`. Everything except `id` is optional in practice.
#[derive(Clone, Debug, Deserialize)]
pub struct ClerkUserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<ClerkPhoneNumber>,
    #[serde(default)]
    pub primary_phone_number_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Deprecated by Clerk but still present on older payloads.
    #[serde(default)]
    pub profile_image_url: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl ClerkUserData {
    /// Entries without an address are skipped.
    pub fn primary_email(&self) -> Option<&str> {
        let mut addresses = self
            .email_addresses
            .iter()
            .filter(|e| !e.email_address.trim().is_empty());
        let primary = self.primary_email_address_id.as_deref().and_then(|pid| {
            addresses.clone().find(|e| e.id.as_deref() == Some(pid))
        });
        primary
            .or_else(|| addresses.next())
            .map(|e| e.email_address.as_str())
    }

    pub fn primary_phone(&self) -> Option<&str> {
        let mut numbers = self
            .phone_numbers
            .iter()
            .filter(|p| !p.phone_number.trim().is_empty());
        let primary = self
            .primary_phone_number_id
            .as_deref()
            .and_then(|pid| numbers.clone().find(|p| p.id.as_deref() == Some(pid)));
        primary
            .or_else(|| numbers.next())
            .map(|p| p.phone_number.as_str())
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .or(self.profile_image_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.and_then(from_unix_millis)
    }

    /// `fallback_observed_at` is used when the payload carries no
    /// `updated_at` of its own.
    pub fn to_identity_profile(&self, fallback_observed_at: DateTime<Utc>) -> IdentityProfile {
        IdentityProfile {
            clerk_id: self.id.clone(),
            email: self.primary_email().unwrap_or_default().to_string(),
            first_name: non_empty(self.first_name.as_deref()),
            last_name: non_empty(self.last_name.as_deref()),
            image_url: self.avatar_url().map(str::to_string),
            phone: self.primary_phone().map(str::to_string),
            observed_at: self.updated_at().unwrap_or(fallback_observed_at),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

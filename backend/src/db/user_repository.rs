use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::{IdentityProfile, IdentityUpsertOutcome, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    /// Create-or-update keyed by `clerk_id`. An existing row whose
    /// `identity_synced_at` is newer than `profile.observed_at` is left alone
    /// and reported as `Stale`.
    async fn upsert_identity_user(
        &self,
        profile: &IdentityProfile,
    ) -> Result<IdentityUpsertOutcome, sqlx::Error>;
}

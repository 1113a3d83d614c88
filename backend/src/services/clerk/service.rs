use super::{errors::ClerkError, models::ClerkUserData};
use async_trait::async_trait;

#[async_trait]
pub trait ClerkService: Send + Sync {
    async fn get_user(&self, clerk_id: &str) -> Result<ClerkUserData, ClerkError>;
}

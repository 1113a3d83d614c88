use crate::{
    db::user_repository::UserRepository,
    models::user::{IdentityProfile, IdentityUpsertOutcome, User},
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

const USER_COLUMNS: &str = r#"
    id,
    clerk_id,
    email,
    first_name,
    last_name,
    image_url,
    phone,
    role,
    identity_synced_at,
    created_at,
    updated_at
"#;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE clerk_id = $1"
        ))
        .bind(clerk_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_identity_user(
        &self,
        profile: &IdentityProfile,
    ) -> Result<IdentityUpsertOutcome, sqlx::Error> {
        // The WHERE on the conflict arm turns an out-of-order event into a
        // no-op: no row comes back and the stored data is left untouched.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (
                id, clerk_id, email, first_name, last_name, image_url, phone,
                identity_synced_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (clerk_id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                image_url = EXCLUDED.image_url,
                phone = EXCLUDED.phone,
                identity_synced_at = EXCLUDED.identity_synced_at,
                updated_at = now()
            WHERE users.identity_synced_at IS NULL
               OR users.identity_synced_at <= EXCLUDED.identity_synced_at
            RETURNING {USER_COLUMNS}, (xmax = 0) AS inserted
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&profile.clerk_id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.image_url)
        .bind(&profile.phone)
        .bind(profile.observed_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let user = User::from_row(&row)?;
                let inserted: bool = row.try_get("inserted")?;
                if inserted {
                    Ok(IdentityUpsertOutcome::Created(user))
                } else {
                    Ok(IdentityUpsertOutcome::Updated(user))
                }
            }
            None => {
                let current = self
                    .find_user_by_clerk_id(&profile.clerk_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                Ok(IdentityUpsertOutcome::Stale(current))
            }
        }
    }
}

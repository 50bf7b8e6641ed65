//! Profile persistence in `profiles`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use beanvoyage_core::{Email, UserId};

use super::{ProfileRepository, RepositoryError};
use crate::models::Profile;

/// `PostgreSQL` profile repository.
#[derive(Debug, Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: UserId,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    avatar_url: Option<String>,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            avatar_url: row.avatar_url,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r"
            SELECT id, email, first_name, last_name, phone, address, city,
                   postal_code, avatar_url, is_admin, created_at, updated_at
            FROM profiles
            WHERE id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    /// The admin flag is never written from here; it is granted out of band.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, email, first_name, last_name, phone, address,
                                  city, postal_code, avatar_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                postal_code = EXCLUDED.postal_code,
                avatar_url = EXCLUDED.avatar_url,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(profile.id)
        .bind(profile.email.as_str())
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .bind(profile.phone.as_deref())
        .bind(profile.address.as_deref())
        .bind(profile.city.as_deref())
        .bind(profile.postal_code.as_deref())
        .bind(profile.avatar_url.as_deref())
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::DatabaseResult;
use crate::models::UserLocation;

/// Repository for user location state: one latest-location row per user
/// plus an append-only movement log.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn latest_location(&self, user_id: Uuid) -> DatabaseResult<Option<UserLocation>> {
        let location = sqlx::query_as::<_, UserLocation>(
            r#"
            SELECT user_id, latitude, longitude, location_text, updated_at
            FROM user_locations
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    pub async fn upsert_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        location_text: Option<&str>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_locations (user_id, latitude, longitude, location_text, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id) DO UPDATE
                SET latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude,
                    location_text = EXCLUDED.location_text,
                    updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .bind(location_text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn log_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        radius_km: i32,
        location_text: Option<&str>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_location_logs (user_id, latitude, longitude, radius_km, location_text)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .bind(radius_km)
        .bind(location_text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::error::DatabaseResult;
use crate::models::{NewSearchLog, SearchLogRow};

/// Repository for symptom-search logs.
///
/// Rows that carry `recommended_fields` double as the field-recommender
/// cache: the (symptoms, gender, age) signature is the lookup key, with a
/// short recency window preferred over any-age matches.
#[derive(Debug, Clone)]
pub struct SearchLogRepository {
    pool: Pool<Postgres>,
}

impl SearchLogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Newest cacheable log for this signature created at or after
    /// `cutoff`.
    pub async fn recent_with_fields(
        &self,
        symptoms: &str,
        gender: Option<&str>,
        age: Option<&str>,
        cutoff: DateTime<Utc>,
    ) -> DatabaseResult<Option<SearchLogRow>> {
        let row = sqlx::query_as::<_, SearchLogRow>(
            r#"
            SELECT symptoms, gender, age, recommended_fields, comment, created_at
            FROM symptom_search_logs
            WHERE symptoms = $1
              AND gender IS NOT DISTINCT FROM $2
              AND age IS NOT DISTINCT FROM $3
              AND recommended_fields IS NOT NULL
              AND created_at >= $4
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(symptoms)
        .bind(gender)
        .bind(age)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Newest cacheable log for this signature regardless of age.
    pub async fn latest_with_fields(
        &self,
        symptoms: &str,
        gender: Option<&str>,
        age: Option<&str>,
    ) -> DatabaseResult<Option<SearchLogRow>> {
        let row = sqlx::query_as::<_, SearchLogRow>(
            r#"
            SELECT symptoms, gender, age, recommended_fields, comment, created_at
            FROM symptom_search_logs
            WHERE symptoms = $1
              AND gender IS NOT DISTINCT FROM $2
              AND age IS NOT DISTINCT FROM $3
              AND recommended_fields IS NOT NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(symptoms)
        .bind(gender)
        .bind(age)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn insert(&self, log: &NewSearchLog) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO symptom_search_logs
                (user_id, latitude, longitude, radius_km, symptoms, gender, age,
                 recommended_fields, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.user_id)
        .bind(log.latitude)
        .bind(log.longitude)
        .bind(log.radius_km)
        .bind(&log.symptoms)
        .bind(log.gender.as_deref())
        .bind(log.age.as_deref())
        .bind(&log.recommended_fields)
        .bind(&log.comment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

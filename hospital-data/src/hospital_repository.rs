use std::collections::HashMap;

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::DatabaseResult;
use crate::models::{
    CapacityRecord, Hospital, HospitalEngagement, NearbyHospital, SevereMessage, SevereMessageRow,
};

/// Repository for hospital master data, real-time capacity and the
/// read-only engagement aggregates. Capacity rows are refreshed by an
/// out-of-band ingestion job; reads here are eventually consistent.
#[derive(Debug, Clone)]
pub struct HospitalRepository {
    pool: Pool<Postgres>,
}

impl HospitalRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Hospitals with a live capacity record, sorted by haversine distance
    /// from the given point. Radius filtering happens in the ranking
    /// engine so the nearest-5 fallback can reuse this result.
    pub async fn nearby_with_capacity(
        &self,
        latitude: f64,
        longitude: f64,
        limit: i64,
    ) -> DatabaseResult<Vec<NearbyHospital>> {
        let hospitals = sqlx::query_as::<_, NearbyHospital>(
            r#"
            SELECT h.hpid, h.name, h.address, h.main_phone, h.emergency_phone,
                   h.latitude, h.longitude, h.description,
                   6371.0 * acos(LEAST(1.0,
                       cos(radians($1)) * cos(radians(h.latitude))
                           * cos(radians(h.longitude) - radians($2))
                       + sin(radians($1)) * sin(radians(h.latitude))
                   )) AS distance_km
            FROM hospitals h
            JOIN hospital_capacity c ON c.hpid = h.hpid
            WHERE h.latitude IS NOT NULL AND h.longitude IS NOT NULL
            ORDER BY distance_km ASC
            LIMIT $3
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(hospitals)
    }

    /// Capacity records for a batch of hospitals, keyed by hpid.
    pub async fn capacities_for(
        &self,
        hpids: &[String],
    ) -> DatabaseResult<HashMap<String, CapacityRecord>> {
        let records = sqlx::query_as::<_, CapacityRecord>(
            r#"
            SELECT hpid, hvec, hvoc, hvgc, hvicc, hvcc, hvccc, hvncc,
                   hvctayn, hvmriayn, hvangioayn, hvventiayn, hvventisoayn,
                   hvecmoayn, hvcrrtayn, hvoxyayn, hvhypoayn, hvincuayn, hvamyn,
                   hvs01, hvs02, hvs03, hvs04, hvs05, hvs06, hvs07, hvs08,
                   hvidate, last_updated
            FROM hospital_capacity
            WHERE hpid = ANY($1)
            "#,
        )
        .bind(hpids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|record| (record.hpid.clone(), record))
            .collect())
    }

    /// Active severe-case broadcasts for a batch of hospitals, newest
    /// first within each hospital.
    pub async fn severe_messages_for(
        &self,
        hpids: &[String],
    ) -> DatabaseResult<HashMap<String, Vec<SevereMessage>>> {
        let rows = sqlx::query_as::<_, SevereMessageRow>(
            r#"
            SELECT hpid, message, message_type, created_at
            FROM hospital_severe_messages
            WHERE hpid = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(hpids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<String, Vec<SevereMessage>> = HashMap::new();
        for row in rows {
            grouped.entry(row.hpid).or_default().push(SevereMessage {
                message: row.message,
                message_type: row.message_type,
                created_at: row.created_at,
            });
        }
        Ok(grouped)
    }

    /// Review/bookmark aggregates for a batch of hospitals. The bookmark
    /// flag is scoped to `user_id` when given, otherwise always false.
    pub async fn engagement_for(
        &self,
        hpids: &[String],
        user_id: Option<Uuid>,
    ) -> DatabaseResult<HashMap<String, HospitalEngagement>> {
        let rows = sqlx::query_as::<_, HospitalEngagement>(
            r#"
            SELECT h.hpid,
                   AVG(r.rating)::float8 AS average_rating,
                   COUNT(r.id) AS review_count,
                   COALESCE(BOOL_OR(b.user_id IS NOT NULL), false) AS is_bookmarked
            FROM hospitals h
            LEFT JOIN hospital_reviews r ON r.hpid = h.hpid
            LEFT JOIN hospital_bookmarks b ON b.hpid = h.hpid AND b.user_id = $2
            WHERE h.hpid = ANY($1)
            GROUP BY h.hpid
            "#,
        )
        .bind(hpids)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| (row.hpid.clone(), row)).collect())
    }

    /// Full directory listing ordered for region grouping.
    pub async fn list_all(&self) -> DatabaseResult<Vec<Hospital>> {
        let hospitals = sqlx::query_as::<_, Hospital>(
            r#"
            SELECT hpid, name, address, first_address, main_phone, emergency_phone,
                   latitude, longitude, description, updated_at
            FROM hospitals
            ORDER BY first_address ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(hospitals)
    }
}

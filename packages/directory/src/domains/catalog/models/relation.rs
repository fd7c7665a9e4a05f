//! Join rows between providers and services.
//!
//! The relation is a plain pair table with no lifecycle of its own. Rows are
//! only ever inserted or deleted one pair at a time; there is deliberately
//! no bulk-replace here, so a relation an update leaves untouched keeps its
//! original `created_at`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ProviderId, ServiceId};

/// One persisted provider/service relation
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProviderService {
    pub provider_id: ProviderId,
    pub service_id: ServiceId,
    pub created_at: DateTime<Utc>,
}

impl ProviderService {
    /// Ids of services related to a provider, in relation creation order.
    pub async fn service_ids_for_provider(
        provider_id: ProviderId,
        pool: &PgPool,
    ) -> Result<Vec<ServiceId>> {
        let ids = sqlx::query_scalar::<_, ServiceId>(
            "SELECT service_id FROM provider_services WHERE provider_id = $1 ORDER BY created_at ASC",
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }

    /// Ids of providers related to a service, in relation creation order.
    pub async fn provider_ids_for_service(
        service_id: ServiceId,
        pool: &PgPool,
    ) -> Result<Vec<ProviderId>> {
        let ids = sqlx::query_scalar::<_, ProviderId>(
            "SELECT provider_id FROM provider_services WHERE service_id = $1 ORDER BY created_at ASC",
        )
        .bind(service_id)
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }

    /// Whether a relation row exists for this pair.
    pub async fn exists(
        provider_id: ProviderId,
        service_id: ServiceId,
        pool: &PgPool,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM provider_services WHERE provider_id = $1 AND service_id = $2)",
        )
        .bind(provider_id)
        .bind(service_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Insert one relation row. Duplicate pairs are ignored, which keeps the
    /// no-duplicate-pair invariant even on repeated adds.
    pub async fn add(provider_id: ProviderId, service_id: ServiceId, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO provider_services (provider_id, service_id)
            VALUES ($1, $2)
            ON CONFLICT (provider_id, service_id) DO NOTHING
            "#,
        )
        .bind(provider_id)
        .bind(service_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete one relation row.
    pub async fn remove(
        provider_id: ProviderId,
        service_id: ServiceId,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query("DELETE FROM provider_services WHERE provider_id = $1 AND service_id = $2")
            .bind(provider_id)
            .bind(service_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

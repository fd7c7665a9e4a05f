//! Service model and depth-aware persistence.
//!
//! Mirror image of the provider side: same join table, opposite root. The
//! shared reconstruction and diff logic lives in the domain's `graph` and
//! `diff` modules.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::common::{ProviderId, ServiceId};
use crate::domains::catalog::depth::DepthLevel;
use crate::domains::catalog::diff::diff_related;
use crate::domains::catalog::graph::{assemble, FlatRow, GraphNode};
use crate::domains::catalog::models::provider::Provider;
use crate::domains::catalog::models::relation::ProviderService;

/// Service - an offering listed in the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    /// Soft-delete marker. Deleted services never come back from queries
    /// and are filtered out of related lists at the row source.
    pub deleted: bool,
    /// Providers offering this service, duplicate-free, in row order.
    pub providers: Vec<Provider>,
}

/// Input for creating a new service (no id until persisted)
#[derive(Debug, Clone, Default)]
pub struct CreateService {
    pub name: String,
    /// Ids of existing providers to link at creation time.
    pub provider_ids: Vec<ProviderId>,
}

/// Input for updating a service's name and desired provider set
#[derive(Debug, Clone)]
pub struct UpdateService {
    pub name: String,
    /// The authoritative related set after the update; persisted relations
    /// missing from it are removed, new ones are added.
    pub providers: Vec<Provider>,
}

impl Service {
    /// An in-memory service with no relations attached.
    pub fn new(id: ServiceId, name: impl Into<String>) -> Self {
        Service {
            id,
            name: name.into(),
            deleted: false,
            providers: Vec::new(),
        }
    }

    /// Whether a provider with this id is attached.
    pub fn contains_provider(&self, id: ProviderId) -> bool {
        self.providers.iter().any(|p| p.id == id)
    }

    /// Fetch all services at the given depth.
    ///
    /// Bulk fetches serve shallow and medium only; deep expansion is
    /// restricted to single lookups.
    pub async fn find_all(depth: DepthLevel, pool: &PgPool) -> Result<Vec<Self>> {
        let depth = depth.for_bulk()?;

        let rows = match depth {
            DepthLevel::Shallow => {
                sqlx::query_as::<_, FlatRow>(
                    "SELECT id, name FROM services WHERE is_deleted = FALSE ORDER BY id",
                )
                .fetch_all(pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, FlatRow>(
                    r#"
                    SELECT
                        s.id AS id,
                        s.name AS name,
                        p.id AS related_id,
                        p.name AS related_name
                    FROM services s
                    LEFT JOIN provider_services ps ON ps.service_id = s.id
                    LEFT JOIN providers p ON p.id = ps.provider_id AND p.is_deleted = FALSE
                    WHERE s.is_deleted = FALSE
                    ORDER BY s.id, p.id
                    "#,
                )
                .fetch_all(pool)
                .await?
            }
        };

        Ok(assemble(rows, depth)?)
    }

    /// Fetch one service by id at the given depth.
    ///
    /// Returns `None` when the id is unknown or the service is soft-deleted.
    pub async fn find_by_id(
        id: ServiceId,
        depth: DepthLevel,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let rows = match depth {
            DepthLevel::Shallow => {
                sqlx::query_as::<_, FlatRow>(
                    "SELECT id, name FROM services WHERE id = $1 AND is_deleted = FALSE",
                )
                .bind(id)
                .fetch_all(pool)
                .await?
            }
            DepthLevel::Medium => {
                sqlx::query_as::<_, FlatRow>(
                    r#"
                    SELECT
                        s.id AS id,
                        s.name AS name,
                        p.id AS related_id,
                        p.name AS related_name
                    FROM services s
                    LEFT JOIN provider_services ps ON ps.service_id = s.id
                    LEFT JOIN providers p ON p.id = ps.provider_id AND p.is_deleted = FALSE
                    WHERE s.id = $1 AND s.is_deleted = FALSE
                    ORDER BY p.id
                    "#,
                )
                .bind(id)
                .fetch_all(pool)
                .await?
            }
            DepthLevel::Deep => {
                sqlx::query_as::<_, FlatRow>(
                    r#"
                    SELECT
                        s.id AS id,
                        s.name AS name,
                        p.id AS related_id,
                        p.name AS related_name,
                        ss.id AS secondary_id,
                        ss.name AS secondary_name
                    FROM services s
                    LEFT JOIN provider_services ps ON ps.service_id = s.id
                    LEFT JOIN providers p ON p.id = ps.provider_id AND p.is_deleted = FALSE
                    LEFT JOIN provider_services ps2 ON ps2.provider_id = p.id
                    LEFT JOIN services ss ON ss.id = ps2.service_id AND ss.is_deleted = FALSE
                    WHERE s.id = $1 AND s.is_deleted = FALSE
                    ORDER BY p.id, ss.id
                    "#,
                )
                .bind(id)
                .fetch_all(pool)
                .await?
            }
        };

        // WHERE id = $1 leaves at most one root.
        Ok(assemble(rows, depth)?.into_iter().next())
    }

    /// Create a service and attach its initial provider relations.
    pub async fn create(input: CreateService, pool: &PgPool) -> Result<Self> {
        let id = ServiceId::new();

        sqlx::query("INSERT INTO services (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(&input.name)
            .execute(pool)
            .await?;

        for provider_id in &input.provider_ids {
            ProviderService::add(*provider_id, id, pool).await?;
        }

        info!(
            service_id = %id,
            providers = input.provider_ids.len(),
            "service created"
        );

        Self::find_by_id(id, DepthLevel::Medium, pool)
            .await?
            .context("service row missing immediately after insert")
    }

    /// Rename a service and reconcile its provider relations.
    ///
    /// Returns `None` when the id is unknown or soft-deleted.
    pub async fn update(
        id: ServiceId,
        input: UpdateService,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let renamed = sqlx::query("UPDATE services SET name = $2 WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .bind(&input.name)
            .execute(pool)
            .await?;

        if renamed.rows_affected() == 0 {
            return Ok(None);
        }

        let persisted: HashSet<ProviderId> = ProviderService::provider_ids_for_service(id, pool)
            .await?
            .into_iter()
            .collect();

        let diff = diff_related(&persisted, input.providers.iter().map(|p| p.id));

        for provider_id in &diff.to_remove {
            ProviderService::remove(*provider_id, id, pool).await?;
        }
        for provider_id in &diff.to_add {
            ProviderService::add(*provider_id, id, pool).await?;
        }

        if diff.has_changes() {
            info!(
                service_id = %id,
                added = diff.to_add.len(),
                removed = diff.to_remove.len(),
                "service provider relations reconciled"
            );
        }

        Self::find_by_id(id, DepthLevel::Medium, pool).await
    }

    /// Soft-delete a service. Unknown ids are a no-op.
    pub async fn delete(id: ServiceId, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE services SET is_deleted = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        info!(service_id = %id, "service deleted");
        Ok(())
    }
}

impl GraphNode for Service {
    type Related = Provider;

    fn from_columns(id: Uuid, name: String) -> Self {
        Service::new(ServiceId::from_uuid(id), name)
    }

    fn raw_id(&self) -> Uuid {
        self.id.into_uuid()
    }

    fn related(&self) -> &[Provider] {
        &self.providers
    }

    fn related_mut(&mut self) -> &mut Vec<Provider> {
        &mut self.providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_provider() {
        let provider = Provider::new(ProviderId::new(), "Acme");
        let other = ProviderId::new();

        let mut service = Service::new(ServiceId::new(), "Plumbing");
        service.providers.push(provider.clone());

        assert!(service.contains_provider(provider.id));
        assert!(!service.contains_provider(other));
    }

    #[test]
    fn test_from_columns_starts_with_no_relations() {
        let id = Uuid::from_u128(3);
        let service = Service::from_columns(id, "Plumbing".to_string());

        assert_eq!(service.raw_id(), id);
        assert_eq!(service.name, "Plumbing");
        assert!(service.providers.is_empty());
    }
}

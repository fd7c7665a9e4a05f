//! Provider model and depth-aware persistence.
//!
//! A provider owns no service rows; it is linked to services through the
//! `provider_services` join table. Fetches reconstruct the graph from one
//! denormalized join query per depth, and updates reconcile the join table
//! by diff instead of replacing it.

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
use crate::domains::catalog::models::relation::ProviderService;
use crate::domains::catalog::models::service::Service;

/// Provider - an organization offering services in the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    /// Soft-delete marker. Deleted providers never come back from queries
    /// and are filtered out of related lists at the row source.
    pub deleted: bool,
    /// Services offered by this provider, duplicate-free, in row order.
    pub services: Vec<Service>,
}

/// Input for creating a new provider (no id until persisted)
#[derive(Debug, Clone, Default)]
pub struct CreateProvider {
    pub name: String,
    /// Ids of existing services to link at creation time.
    pub service_ids: Vec<ServiceId>,
}

/// Input for updating a provider's name and desired service set
#[derive(Debug, Clone)]
pub struct UpdateProvider {
    pub name: String,
    /// The authoritative related set after the update; persisted relations
    /// missing from it are removed, new ones are added.
    pub services: Vec<Service>,
}

impl Provider {
    /// An in-memory provider with no relations attached.
    pub fn new(id: ProviderId, name: impl Into<String>) -> Self {
        Provider {
            id,
            name: name.into(),
            deleted: false,
            services: Vec::new(),
        }
    }

    /// Whether a service with this id is attached.
    pub fn contains_service(&self, id: ServiceId) -> bool {
        self.services.iter().any(|s| s.id == id)
    }

    /// Fetch all providers at the given depth.
    ///
    /// Bulk fetches serve shallow and medium only; deep expansion is
    /// restricted to single lookups.
    pub async fn find_all(depth: DepthLevel, pool: &PgPool) -> Result<Vec<Self>> {
        let depth = depth.for_bulk()?;

        let rows = match depth {
            DepthLevel::Shallow => {
                sqlx::query_as::<_, FlatRow>(
                    "SELECT id, name FROM providers WHERE is_deleted = FALSE ORDER BY id",
                )
                .fetch_all(pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, FlatRow>(
                    r#"
                    SELECT
                        p.id AS id,
                        p.name AS name,
                        s.id AS related_id,
                        s.name AS related_name
                    FROM providers p
                    LEFT JOIN provider_services ps ON ps.provider_id = p.id
                    LEFT JOIN services s ON s.id = ps.service_id AND s.is_deleted = FALSE
                    WHERE p.is_deleted = FALSE
                    ORDER BY p.id, s.id
                    "#,
                )
                .fetch_all(pool)
                .await?
            }
        };

        Ok(assemble(rows, depth)?)
    }

    /// Fetch one provider by id at the given depth.
    ///
    /// Returns `None` when the id is unknown or the provider is
    /// soft-deleted.
    pub async fn find_by_id(
        id: ProviderId,
        depth: DepthLevel,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let rows = match depth {
            DepthLevel::Shallow => {
                sqlx::query_as::<_, FlatRow>(
                    "SELECT id, name FROM providers WHERE id = $1 AND is_deleted = FALSE",
                )
                .bind(id)
                .fetch_all(pool)
                .await?
            }
            DepthLevel::Medium => {
                sqlx::query_as::<_, FlatRow>(
                    r#"
                    SELECT
                        p.id AS id,
                        p.name AS name,
                        s.id AS related_id,
                        s.name AS related_name
                    FROM providers p
                    LEFT JOIN provider_services ps ON ps.provider_id = p.id
                    LEFT JOIN services s ON s.id = ps.service_id AND s.is_deleted = FALSE
                    WHERE p.id = $1 AND p.is_deleted = FALSE
                    ORDER BY s.id
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
                        p.id AS id,
                        p.name AS name,
                        s.id AS related_id,
                        s.name AS related_name,
                        sp.id AS secondary_id,
                        sp.name AS secondary_name
                    FROM providers p
                    LEFT JOIN provider_services ps ON ps.provider_id = p.id
                    LEFT JOIN services s ON s.id = ps.service_id AND s.is_deleted = FALSE
                    LEFT JOIN provider_services ps2 ON ps2.service_id = s.id
                    LEFT JOIN providers sp ON sp.id = ps2.provider_id AND sp.is_deleted = FALSE
                    WHERE p.id = $1 AND p.is_deleted = FALSE
                    ORDER BY s.id, sp.id
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

    /// Create a provider and attach its initial service relations.
    pub async fn create(input: CreateProvider, pool: &PgPool) -> Result<Self> {
        let id = ProviderId::new();

        sqlx::query("INSERT INTO providers (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(&input.name)
            .execute(pool)
            .await?;

        for service_id in &input.service_ids {
            ProviderService::add(id, *service_id, pool).await?;
        }

        info!(
            provider_id = %id,
            services = input.service_ids.len(),
            "provider created"
        );

        Self::find_by_id(id, DepthLevel::Medium, pool)
            .await?
            .context("provider row missing immediately after insert")
    }

    /// Rename a provider and reconcile its service relations.
    ///
    /// The persisted join rows are diffed against the desired service set;
    /// relations present on both sides are left untouched, the rest are
    /// added or removed one row at a time. Returns `None` when the id is
    /// unknown or soft-deleted.
    pub async fn update(
        id: ProviderId,
        input: UpdateProvider,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let renamed = sqlx::query("UPDATE providers SET name = $2 WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .bind(&input.name)
            .execute(pool)
            .await?;

        if renamed.rows_affected() == 0 {
            return Ok(None);
        }

        let persisted: HashSet<ServiceId> = ProviderService::service_ids_for_provider(id, pool)
            .await?
            .into_iter()
            .collect();

        let diff = diff_related(&persisted, input.services.iter().map(|s| s.id));

        for service_id in &diff.to_remove {
            ProviderService::remove(id, *service_id, pool).await?;
        }
        for service_id in &diff.to_add {
            ProviderService::add(id, *service_id, pool).await?;
        }

        if diff.has_changes() {
            info!(
                provider_id = %id,
                added = diff.to_add.len(),
                removed = diff.to_remove.len(),
                "provider service relations reconciled"
            );
        }

        Self::find_by_id(id, DepthLevel::Medium, pool).await
    }

    /// Soft-delete a provider. Unknown ids are a no-op.
    pub async fn delete(id: ProviderId, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE providers SET is_deleted = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        info!(provider_id = %id, "provider deleted");
        Ok(())
    }
}

impl GraphNode for Provider {
    type Related = Service;

    fn from_columns(id: Uuid, name: String) -> Self {
        Provider::new(ProviderId::from_uuid(id), name)
    }

    fn raw_id(&self) -> Uuid {
        self.id.into_uuid()
    }

    fn related(&self) -> &[Service] {
        &self.services
    }

    fn related_mut(&mut self) -> &mut Vec<Service> {
        &mut self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_service() {
        let service = Service::new(ServiceId::new(), "Plumbing");
        let other = ServiceId::new();

        let mut provider = Provider::new(ProviderId::new(), "Acme");
        provider.services.push(service.clone());

        assert!(provider.contains_service(service.id));
        assert!(!provider.contains_service(other));
    }

    #[test]
    fn test_from_columns_starts_with_no_relations() {
        let id = Uuid::from_u128(7);
        let provider = Provider::from_columns(id, "Acme".to_string());

        assert_eq!(provider.raw_id(), id);
        assert_eq!(provider.name, "Acme");
        assert!(!provider.deleted);
        assert!(provider.services.is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut provider = Provider::new(ProviderId::new(), "Acme");
        provider.services.push(Service::new(ServiceId::new(), "Plumbing"));

        let json = serde_json::to_string(&provider).unwrap();
        let parsed: Provider = serde_json::from_str(&json).unwrap();
        assert_eq!(provider, parsed);
    }
}

//! Provider/service catalog domain.
//!
//! Providers and services are joined many-to-many through the
//! `provider_services` table. This domain owns the three pieces the rest of
//! the system builds on: depth selection for fetches, reconstruction of
//! entity graphs from flattened join rows, and diff-based synchronization of
//! the relation table on update.

pub mod depth;
pub mod diff;
pub mod graph;
pub mod models;

pub use depth::{DepthError, DepthLevel};
pub use diff::{diff_related, RelationDiff};
pub use graph::{assemble, FlatRow, GraphError, GraphNode};
pub use models::{
    CreateProvider, CreateService, Provider, ProviderService, Service, UpdateProvider,
    UpdateService,
};

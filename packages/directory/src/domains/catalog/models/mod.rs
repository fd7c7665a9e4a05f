//! Catalog domain models

pub mod provider;
pub mod relation;
pub mod service;

pub use provider::{CreateProvider, Provider, UpdateProvider};
pub use relation::ProviderService;
pub use service::{CreateService, Service, UpdateService};

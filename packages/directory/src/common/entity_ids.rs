//! Typed ID definitions for directory entities.
//!
//! One marker type per entity kind, plus the type aliases the rest of the
//! crate uses. Mixing a `ProviderId` into a service query is a compile error.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Provider entities.
pub struct Provider;

/// Marker type for Service entities.
pub struct Service;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Provider entities.
pub type ProviderId = Id<Provider>;

/// Typed ID for Service entities.
pub type ServiceId = Id<Service>;

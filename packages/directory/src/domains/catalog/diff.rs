//! Relation-set diff synchronization.
//!
//! Updating an entity's related set never rewrites the join table wholesale.
//! The persisted id set is compared against the desired one and only the
//! difference is applied, one relation row at a time; relations present on
//! both sides are left untouched.

use std::collections::HashSet;
use std::hash::Hash;

/// The add/remove sets reconciling a persisted relation set with a desired
/// one. The two sets are disjoint by construction, so the caller may apply
/// them in either order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDiff<I: Eq + Hash> {
    /// Ids to insert a relation row for.
    pub to_add: HashSet<I>,
    /// Ids to delete the relation row for.
    pub to_remove: HashSet<I>,
}

impl<I: Eq + Hash> RelationDiff<I> {
    /// Whether applying this diff would touch the join table at all.
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_remove.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }
}

/// Compute the minimal add/remove sets that turn `persisted` into the id set
/// of `desired`.
///
/// Pure and infallible: any combination of inputs has a well-defined
/// (possibly empty) result. Duplicate ids in `desired` collapse; applying
/// removes then adds against the persisted set yields exactly the desired
/// set, with no duplicate and no dangling rows.
pub fn diff_related<I>(
    persisted: &HashSet<I>,
    desired: impl IntoIterator<Item = I>,
) -> RelationDiff<I>
where
    I: Eq + Hash + Copy,
{
    let desired: HashSet<I> = desired.into_iter().collect();

    RelationDiff {
        to_add: desired.difference(persisted).copied().collect(),
        to_remove: persisted.difference(&desired).copied().collect(),
    }
}

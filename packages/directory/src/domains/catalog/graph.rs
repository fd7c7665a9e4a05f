//! Entity-graph reconstruction from flattened join rows.
//!
//! Depth-parameterized join queries come back denormalized: one row per
//! (entity, related, secondary) combination, with the same primary entity
//! repeated across many rows. `assemble` folds such a row stream back into a
//! deduplicated object graph in a single forward pass, so it works directly
//! off a cursor that cannot be rewound.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use super::depth::DepthLevel;

/// Reconstruction failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The row source broke the shape contract: a primary column was absent.
    /// Absent related/secondary columns are a normal "no match" signal and
    /// never raise this.
    #[error("row {index} is missing required column '{column}'")]
    RowShapeMismatch { index: usize, column: &'static str },
}

/// One denormalized row from a depth-parameterized join query.
///
/// Related and secondary columns are optional: a LEFT JOIN with no match
/// legitimately leaves them NULL, and shallow queries do not select them at
/// all. Primary columns must always be present.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct FlatRow {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    #[sqlx(default)]
    pub related_id: Option<Uuid>,
    #[sqlx(default)]
    pub related_name: Option<String>,
    #[sqlx(default)]
    pub secondary_id: Option<Uuid>,
    #[sqlx(default)]
    pub secondary_name: Option<String>,
}

/// Capability seam for graph reconstruction.
///
/// Provider-rooted and service-rooted queries are mirror images: both kinds
/// are built from id/name columns and carry a duplicate-free related list of
/// the opposite kind. One algorithm serves both roots.
pub trait GraphNode: Sized {
    /// The opposite entity kind. Round-trips: `Related::Related = Self`.
    type Related: GraphNode<Related = Self>;

    /// Build a bare node from its row columns, with no relations attached.
    fn from_columns(id: Uuid, name: String) -> Self;

    /// The node's raw identifier.
    fn raw_id(&self) -> Uuid;

    /// The node's related entities.
    fn related(&self) -> &[Self::Related];

    /// Mutable access to the node's related entities.
    fn related_mut(&mut self) -> &mut Vec<Self::Related>;
}

/// Append `node` unless an entry with the same id is already attached, and
/// hand back the attached entry either way. The membership test is what keeps
/// an earlier-seen entry's sub-relations intact: a later row reuses the
/// accumulated node instead of overwriting it.
fn append_if_absent<T: GraphNode>(list: &mut Vec<T>, node: T) -> &mut T {
    let idx = match list.iter().position(|n| n.raw_id() == node.raw_id()) {
        Some(idx) => idx,
        None => {
            list.push(node);
            list.len() - 1
        }
    };
    &mut list[idx]
}

/// Fold a stream of flat rows into deduplicated root entities.
///
/// Rows are consumed once, in order. Roots come out in first-seen order; the
/// related lists grow in row order with append-if-absent semantics, one
/// further level deep when `depth` is [`DepthLevel::Deep`]. The keyed
/// accumulator is local to this call, so concurrent invocations share
/// nothing.
///
/// An empty row stream yields an empty vector. A row whose primary columns
/// are missing aborts with [`GraphError::RowShapeMismatch`]; rows with
/// missing related/secondary columns contribute their primary entity and
/// skip the nested levels.
pub fn assemble<T, I>(rows: I, depth: DepthLevel) -> Result<Vec<T>, GraphError>
where
    T: GraphNode,
    I: IntoIterator<Item = FlatRow>,
{
    let mut roots: Vec<T> = Vec::new();
    let mut seen: HashMap<Uuid, usize> = HashMap::new();

    for (index, row) in rows.into_iter().enumerate() {
        let id = row
            .id
            .ok_or(GraphError::RowShapeMismatch { index, column: "id" })?;
        let name = row
            .name
            .ok_or(GraphError::RowShapeMismatch { index, column: "name" })?;

        let root = match seen.get(&id) {
            Some(&at) => at,
            None => {
                roots.push(T::from_columns(id, name));
                seen.insert(id, roots.len() - 1);
                roots.len() - 1
            }
        };

        if !depth.includes_related() {
            continue;
        }

        // A LEFT JOIN with no match leaves the nested columns NULL; the
        // primary entity still counts and the nested levels are skipped.
        let (related_id, related_name) = match (row.related_id, row.related_name) {
            (Some(rid), Some(rname)) => (rid, rname),
            _ => continue,
        };

        let related = append_if_absent(
            roots[root].related_mut(),
            T::Related::from_columns(related_id, related_name),
        );

        if !depth.includes_secondary() {
            continue;
        }

        // The secondary entity belongs to the related node's own list, not
        // the root's. Attaching through `related` means successive rows keep
        // building up the same accumulated node.
        if let (Some(sid), Some(sname)) = (row.secondary_id, row.secondary_name) {
            append_if_absent(related.related_mut(), T::from_columns(sid, sname));
        }
    }

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::catalog::models::{Provider, Service};

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn row(id: u128, name: &str) -> FlatRow {
        FlatRow {
            id: Some(uid(id)),
            name: Some(name.to_string()),
            ..FlatRow::default()
        }
    }

    fn row_rel(id: u128, name: &str, rid: u128, rname: &str) -> FlatRow {
        FlatRow {
            related_id: Some(uid(rid)),
            related_name: Some(rname.to_string()),
            ..row(id, name)
        }
    }

    fn row_deep(id: u128, name: &str, rid: u128, rname: &str, sid: u128, sname: &str) -> FlatRow {
        FlatRow {
            secondary_id: Some(uid(sid)),
            secondary_name: Some(sname.to_string()),
            ..row_rel(id, name, rid, rname)
        }
    }

    #[test]
    fn test_empty_stream_yields_empty_output() {
        let providers: Vec<Provider> = assemble(vec![], DepthLevel::Medium).unwrap();
        assert!(providers.is_empty());
    }

    #[test]
    fn test_medium_rows_collapse_into_one_root_per_id() {
        // Provider 1 appears once per service; provider 2 has no services.
        let rows = vec![
            row_rel(1, "A", 10, "X"),
            row_rel(1, "A", 11, "Y"),
            row(2, "B"),
        ];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Medium).unwrap();

        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].name, "A");
        assert_eq!(providers[0].services.len(), 2);
        assert_eq!(providers[0].services[0].name, "X");
        assert_eq!(providers[0].services[1].name, "Y");
        assert_eq!(providers[1].name, "B");
        assert!(providers[1].services.is_empty());
    }

    #[test]
    fn test_roots_keep_first_seen_order() {
        let rows = vec![
            row_rel(2, "B", 10, "X"),
            row_rel(1, "A", 10, "X"),
            row_rel(2, "B", 11, "Y"),
        ];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Medium).unwrap();

        let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(providers[0].services.len(), 2);
    }

    #[test]
    fn test_repeated_related_rows_dedupe() {
        let rows = vec![row_rel(1, "A", 10, "X"), row_rel(1, "A", 10, "X")];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Medium).unwrap();

        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].services.len(), 1);
    }

    #[test]
    fn test_distinct_root_count_matches_distinct_primary_ids() {
        let rows = vec![
            row_rel(1, "A", 10, "X"),
            row_rel(2, "B", 10, "X"),
            row_rel(1, "A", 11, "Y"),
            row_rel(3, "C", 12, "Z"),
            row_rel(2, "B", 11, "Y"),
        ];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Medium).unwrap();
        assert_eq!(providers.len(), 3);
    }

    #[test]
    fn test_shallow_ignores_nested_columns() {
        let rows = vec![row_rel(1, "A", 10, "X")];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Shallow).unwrap();

        assert_eq!(providers.len(), 1);
        assert!(providers[0].services.is_empty());
    }

    #[test]
    fn test_null_related_columns_are_not_an_error() {
        // LEFT JOIN with no match: primary present, nested columns NULL.
        let rows = vec![row(1, "A")];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Medium).unwrap();

        assert_eq!(providers.len(), 1);
        assert!(providers[0].services.is_empty());
    }

    #[test]
    fn test_missing_primary_id_aborts() {
        let rows = vec![FlatRow {
            name: Some("A".to_string()),
            ..FlatRow::default()
        }];

        let err = assemble::<Provider, _>(rows, DepthLevel::Shallow).unwrap_err();
        assert_eq!(
            err,
            GraphError::RowShapeMismatch {
                index: 0,
                column: "id"
            }
        );
    }

    #[test]
    fn test_missing_primary_name_aborts() {
        let rows = vec![
            row(1, "A"),
            FlatRow {
                id: Some(uid(2)),
                ..FlatRow::default()
            },
        ];

        let err = assemble::<Provider, _>(rows, DepthLevel::Shallow).unwrap_err();
        assert_eq!(
            err,
            GraphError::RowShapeMismatch {
                index: 1,
                column: "name"
            }
        );
    }

    #[test]
    fn test_deep_attaches_secondary_to_the_related_node() {
        // Service 10 is offered by providers 1 and 2; the secondary level
        // lands on the service's own list, not the root's.
        let rows = vec![
            row_deep(1, "A", 10, "X", 1, "A"),
            row_deep(1, "A", 10, "X", 2, "B"),
        ];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Deep).unwrap();

        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].services.len(), 1);

        let service = &providers[0].services[0];
        assert_eq!(service.providers.len(), 2);
        assert_eq!(service.providers[0].name, "A");
        assert_eq!(service.providers[1].name, "B");
        // The secondary copies are values with no further expansion.
        assert!(service.providers[0].services.is_empty());
    }

    #[test]
    fn test_later_rows_reuse_the_accumulated_related_node() {
        // Rows for two services interleave; each secondary still reaches the
        // right service's list without clobbering what was built before.
        let rows = vec![
            row_deep(1, "A", 10, "X", 2, "B"),
            row_deep(1, "A", 11, "Y", 3, "C"),
            row_deep(1, "A", 10, "X", 4, "D"),
        ];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Deep).unwrap();

        let x = &providers[0].services[0];
        let y = &providers[0].services[1];
        assert_eq!(x.name, "X");
        assert_eq!(x.providers.len(), 2);
        assert_eq!(y.name, "Y");
        assert_eq!(y.providers.len(), 1);
    }

    #[test]
    fn test_medium_rows_without_secondary_columns_stay_flat() {
        // A medium query never selects secondary columns; deep assembly of
        // such rows just leaves the second level empty.
        let rows = vec![row_rel(1, "A", 10, "X")];

        let providers: Vec<Provider> = assemble(rows, DepthLevel::Deep).unwrap();

        assert_eq!(providers[0].services.len(), 1);
        assert!(providers[0].services[0].providers.is_empty());
    }

    #[test]
    fn test_service_rooted_assembly_mirrors_provider_rooted() {
        let rows = vec![
            row_rel(10, "X", 1, "A"),
            row_rel(10, "X", 2, "B"),
            row(11, "Y"),
        ];

        let services: Vec<Service> = assemble(rows, DepthLevel::Medium).unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].providers.len(), 2);
        assert_eq!(GraphNode::related(&services[1]).len(), 0);
    }
}

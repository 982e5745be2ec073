//! Pure rules for linking catalog rows to each other.
//!
//! A relation write is all-or-nothing: every distinct id the caller asked for
//! must come back from the visible lookup, otherwise nothing is attached.

use std::collections::BTreeSet;

use crate::storage::{RepositoryError, Result};

use super::types::CatalogEntity;

/// Returns the requested ids with duplicates removed, in ascending order.
pub fn distinct_ids(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Returns the requested ids that are absent from `found`.
pub fn missing_ids<T: CatalogEntity>(requested: &[i64], found: &[T]) -> Vec<i64> {
    let found: BTreeSet<i64> = found.iter().map(CatalogEntity::id).collect();
    distinct_ids(requested)
        .into_iter()
        .filter(|id| !found.contains(id))
        .collect()
}

/// Fails with `RelationNotFound` unless every requested id resolved to a
/// visible row.
///
/// `relation` names the field being written, e.g. `"menuIds"`.
pub fn ensure_all_resolved<T: CatalogEntity>(
    relation: &'static str,
    requested: &[i64],
    found: &[T],
) -> Result<()> {
    let found: BTreeSet<i64> = found.iter().map(CatalogEntity::id).collect();
    ensure_visible(relation, requested, |id| found.contains(&id))
}

/// Fails with `RelationNotFound` naming every requested id that `is_visible`
/// rejects.
///
/// Stores call this inside the write that attaches the ids.
pub fn ensure_visible(
    relation: &'static str,
    requested: &[i64],
    is_visible: impl Fn(i64) -> bool,
) -> Result<()> {
    let missing: Vec<i64> = distinct_ids(requested)
        .into_iter()
        .filter(|id| !is_visible(*id))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(RepositoryError::RelationNotFound { relation, missing })
}

/// Fails with `RelationNotFound` when a single-valued reference did not
/// resolve.
pub fn ensure_resolved<T>(relation: &'static str, id: i64, found: Option<T>) -> Result<T> {
    found.ok_or(RepositoryError::RelationNotFound {
        relation,
        missing: vec![id],
    })
}

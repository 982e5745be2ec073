//! Cache key layout.
//!
//! Every key starts with the entity type prefix, so one type's entries form a
//! scope that can be dropped with `{type}:*`:
//!
//! - `menu:list`, `menu:detail:{id}`
//! - `category:list`, `category:detail:{id}`
//! - `item:list`, `item:detail:{id}`

use crate::catalog::EntityKind;

/// Returns the cache key for the visible list of an entity type.
pub fn list_key(kind: EntityKind) -> String {
    format!("{}:list", kind.as_str())
}

/// Returns the cache key for one visible row.
pub fn detail_key(kind: EntityKind, id: i64) -> String {
    format!("{}:detail:{}", kind.as_str(), id)
}

/// Returns the pattern matching every key of an entity type.
pub fn scope_pattern(kind: EntityKind) -> String {
    format!("{}:*", kind.as_str())
}

/// Returns the key of the set that tracks every live key of an entity type.
///
/// Lets a backend drop a whole scope without scanning the keyspace.
pub fn tracking_key(kind: EntityKind) -> String {
    format!("{}:_keys", kind.as_str())
}

/// Returns true for the bookkeeping keys produced by [`tracking_key`].
pub fn is_tracking_key(key: &str) -> bool {
    key.ends_with(":_keys")
}

/// Extracts the entity type from a cache key or a scope pattern.
///
/// # Examples
///
/// ```
/// use gymo_core::cache::kind_from_key;
/// use gymo_core::catalog::EntityKind;
///
/// assert_eq!(kind_from_key("category:detail:5"), Some(EntityKind::Category));
/// assert_eq!(kind_from_key("item:*"), Some(EntityKind::Item));
/// assert_eq!(kind_from_key("*"), None);
/// ```
pub fn kind_from_key(key: &str) -> Option<EntityKind> {
    let prefix = key.split(':').next()?;
    EntityKind::from_prefix(prefix)
}

/// Returns the scopes a write to `kind` must invalidate.
///
/// Cached values embed relation ids, so a write also stales every type whose
/// payload can mention the written row.
pub fn invalidation_scopes(kind: EntityKind) -> &'static [EntityKind] {
    match kind {
        EntityKind::Menu => &[EntityKind::Menu, EntityKind::Category],
        EntityKind::Category => &[EntityKind::Category, EntityKind::Menu, EntityKind::Item],
        EntityKind::Item => &[EntityKind::Item, EntityKind::Category],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_key() {
        assert_eq!(list_key(EntityKind::Menu), "menu:list");
        assert_eq!(list_key(EntityKind::Category), "category:list");
    }

    #[test]
    fn test_detail_keys_are_per_id() {
        assert_eq!(detail_key(EntityKind::Category, 5), "category:detail:5");
        assert_ne!(
            detail_key(EntityKind::Category, 5),
            detail_key(EntityKind::Category, 7)
        );
    }

    #[test]
    fn test_detail_keys_are_per_type() {
        assert_ne!(
            detail_key(EntityKind::Menu, 1),
            detail_key(EntityKind::Item, 1)
        );
    }

    #[test]
    fn test_scope_pattern_and_tracking_key() {
        assert_eq!(scope_pattern(EntityKind::Item), "item:*");
        assert_eq!(tracking_key(EntityKind::Item), "item:_keys");
        assert!(is_tracking_key("item:_keys"));
        assert!(!is_tracking_key("item:list"));
    }

    #[test]
    fn test_kind_from_key() {
        assert_eq!(kind_from_key("menu:list"), Some(EntityKind::Menu));
        assert_eq!(kind_from_key("item:detail:9"), Some(EntityKind::Item));
        assert_eq!(kind_from_key("user:1"), None);
        assert_eq!(kind_from_key(""), None);
    }

    #[test]
    fn test_invalidation_scopes_include_self() {
        for kind in [EntityKind::Menu, EntityKind::Category, EntityKind::Item] {
            assert!(invalidation_scopes(kind).contains(&kind));
        }
    }

    #[test]
    fn test_category_write_stales_every_scope() {
        let scopes = invalidation_scopes(EntityKind::Category);
        assert_eq!(scopes.len(), 3);
    }

    #[test]
    fn test_item_write_does_not_touch_menus() {
        assert!(!invalidation_scopes(EntityKind::Item).contains(&EntityKind::Menu));
    }
}

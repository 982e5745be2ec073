//! Glob matching for cache keys.
//!
//! Only `*` is special; it matches any run of characters, including none.

/// Checks if a cache key matches a glob pattern.
///
/// # Examples
///
/// ```
/// use gymo_core::cache::pattern_matches;
///
/// assert!(pattern_matches("category:*", "category:detail:5"));
/// assert!(pattern_matches("*:list", "menu:list"));
/// assert!(!pattern_matches("menu:*", "item:list"));
/// ```
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let mut pieces = pattern.split('*');

    // split always yields at least one piece
    let head = pieces.next().unwrap_or_default();
    let Some(mut rest) = key.strip_prefix(head) else {
        return false;
    };

    let mut pieces: Vec<&str> = pieces.collect();
    let Some(tail) = pieces.pop() else {
        // no wildcard at all
        return rest.is_empty();
    };

    for piece in pieces.into_iter().filter(|p| !p.is_empty()) {
        match rest.find(piece) {
            Some(pos) => rest = &rest[pos + piece.len()..],
            None => return false,
        }
    }

    rest.ends_with(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(pattern_matches("menu:list", "menu:list"));
        assert!(!pattern_matches("menu:list", "menu:lists"));
        assert!(!pattern_matches("menu:list", "item:list"));
    }

    #[test]
    fn test_scope_wildcard() {
        assert!(pattern_matches("category:*", "category:list"));
        assert!(pattern_matches("category:*", "category:detail:12"));
        assert!(pattern_matches("category:*", "category:"));
        assert!(!pattern_matches("category:*", "menu:detail:12"));
    }

    #[test]
    fn test_leading_wildcard() {
        assert!(pattern_matches("*:list", "item:list"));
        assert!(!pattern_matches("*:list", "item:detail:3"));
    }

    #[test]
    fn test_wildcard_in_middle() {
        assert!(pattern_matches("item:*:3", "item:detail:3"));
        assert!(!pattern_matches("item:*:3", "item:detail:4"));
    }

    #[test]
    fn test_middle_piece_must_not_overlap_tail() {
        assert!(!pattern_matches("a*ab*b", "aab"));
        assert!(pattern_matches("a*ab*b", "aabb"));
    }

    #[test]
    fn test_wildcard_only() {
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("**", "menu:list"));
    }

    #[test]
    fn test_empty_pattern() {
        assert!(pattern_matches("", ""));
        assert!(!pattern_matches("", "menu:list"));
    }
}

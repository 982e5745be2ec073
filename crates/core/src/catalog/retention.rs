//! Retention window arithmetic for the soft-delete sweeper.

use chrono::{DateTime, Duration, Utc};

use super::types::Lifecycle;

/// Default number of days a soft-deleted row is kept.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Returns the instant before which soft-deleted rows may be purged.
///
/// A window reaching past the earliest representable instant yields that
/// instant, so nothing expires.
pub fn retention_cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Returns true if the row was soft-deleted strictly before `cutoff`.
///
/// Rows that were never deleted are never expired.
pub fn is_expired(lifecycle: &Lifecycle, cutoff: DateTime<Utc>) -> bool {
    matches!(lifecycle.deleted_at, Some(deleted_at) if deleted_at < cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_cutoff_subtracts_window() {
        let cutoff = retention_cutoff(now(), Duration::days(DEFAULT_RETENTION_DAYS));
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 5, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_huge_window_saturates() {
        let cutoff = retention_cutoff(now(), Duration::days(100_000_000));
        assert_eq!(cutoff, DateTime::<Utc>::MIN_UTC);

        let mut lifecycle = Lifecycle::new(now() - Duration::days(90));
        lifecycle.soft_delete(now() - Duration::days(60));
        assert!(!is_expired(&lifecycle, cutoff));
    }

    #[test]
    fn test_active_row_never_expires() {
        let lifecycle = Lifecycle::new(now() - Duration::days(365));
        assert!(!is_expired(&lifecycle, now()));
    }

    #[test]
    fn test_deleted_before_cutoff_expires() {
        let mut lifecycle = Lifecycle::new(now() - Duration::days(90));
        lifecycle.soft_delete(now() - Duration::days(31));
        let cutoff = retention_cutoff(now(), Duration::days(30));
        assert!(is_expired(&lifecycle, cutoff));
    }

    #[test]
    fn test_deleted_exactly_at_cutoff_is_kept() {
        let cutoff = retention_cutoff(now(), Duration::days(30));
        let mut lifecycle = Lifecycle::new(now() - Duration::days(90));
        lifecycle.soft_delete(cutoff);
        assert!(!is_expired(&lifecycle, cutoff));
    }
}

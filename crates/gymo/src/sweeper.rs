//! Retention sweeper.
//!
//! Physically removes rows that have been soft-deleted for longer than the
//! retention window. Runs against the raw store, children before parents,
//! and drops the affected cache scopes after any non-empty purge.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use gymo_core::cache::Cache;
use gymo_core::catalog::{is_expired, retention_cutoff, CatalogEntity, EntityKind};
use gymo_core::storage::{
    CategoryRepository, ItemRepository, MenuRepository, RepositoryError, Result,
};

use crate::storage::cached::invalidate;

/// Outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub cutoff: DateTime<Utc>,
    pub items: u64,
    pub categories: u64,
    pub menus: u64,
    /// Entity types whose sweep failed. They are retried on the next run.
    pub failures: Vec<(EntityKind, RepositoryError)>,
}

impl SweepReport {
    fn new(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            items: 0,
            categories: 0,
            menus: 0,
            failures: Vec::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.items + self.categories + self.menus
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ids of the rows that are past the cutoff.
fn expired_ids<T: CatalogEntity>(rows: &[T], cutoff: DateTime<Utc>) -> Vec<i64> {
    rows.iter()
        .filter(|row| is_expired(row.lifecycle(), cutoff))
        .map(CatalogEntity::id)
        .collect()
}

/// Periodic hard-delete of long-dead rows.
#[derive(Clone)]
pub struct RetentionSweeper {
    menus: Arc<dyn MenuRepository>,
    categories: Arc<dyn CategoryRepository>,
    items: Arc<dyn ItemRepository>,
    cache: Arc<dyn Cache>,
    retention: chrono::Duration,
    period: Duration,
}

impl RetentionSweeper {
    /// Creates a sweeper over the raw store.
    ///
    /// # Arguments
    ///
    /// * `retention` - How long a soft-deleted row is kept
    /// * `period` - Time between sweeps
    pub fn new(
        menus: Arc<dyn MenuRepository>,
        categories: Arc<dyn CategoryRepository>,
        items: Arc<dyn ItemRepository>,
        cache: Arc<dyn Cache>,
        retention: chrono::Duration,
        period: Duration,
    ) -> Self {
        Self {
            menus,
            categories,
            items,
            cache,
            retention,
            period,
        }
    }

    async fn sweep_items(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let rows = self.items.get_items_deleted_before(cutoff).await?;
        let ids = expired_ids(&rows, cutoff);
        if ids.is_empty() {
            return Ok(0);
        }
        self.items.purge_items(&ids, cutoff).await
    }

    async fn sweep_categories(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let rows = self.categories.get_categories_deleted_before(cutoff).await?;
        let ids = expired_ids(&rows, cutoff);
        if ids.is_empty() {
            return Ok(0);
        }
        self.categories.purge_categories(&ids, cutoff).await
    }

    async fn sweep_menus(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let rows = self.menus.get_menus_deleted_before(cutoff).await?;
        let ids = expired_ids(&rows, cutoff);
        if ids.is_empty() {
            return Ok(0);
        }
        self.menus.purge_menus(&ids, cutoff).await
    }

    /// Records one entity type's result and drops its scopes if rows went away.
    async fn settle(
        &self,
        report: &mut SweepReport,
        kind: EntityKind,
        result: Result<u64>,
    ) -> u64 {
        match result {
            Ok(0) => 0,
            Ok(purged) => {
                invalidate(self.cache.as_ref(), kind).await;
                tracing::debug!(entity_type = kind.display_name(), purged, "Purged expired rows");
                purged
            }
            Err(err) => {
                tracing::error!(
                    entity_type = kind.display_name(),
                    error = %err,
                    "Retention sweep failed"
                );
                report.failures.push((kind, err));
                0
            }
        }
    }

    /// Runs one sweep as of `now`.
    ///
    /// Never fails: per-type errors are logged and recorded in the report.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let cutoff = retention_cutoff(now, self.retention);
        let mut report = SweepReport::new(cutoff);

        let result = self.sweep_items(cutoff).await;
        let purged = self.settle(&mut report, EntityKind::Item, result).await;
        report.items = purged;

        let result = self.sweep_categories(cutoff).await;
        let purged = self.settle(&mut report, EntityKind::Category, result).await;
        report.categories = purged;

        let result = self.sweep_menus(cutoff).await;
        let purged = self.settle(&mut report, EntityKind::Menu, result).await;
        report.menus = purged;

        tracing::info!(
            cutoff = %cutoff,
            items = report.items,
            categories = report.categories,
            menus = report.menus,
            failures = report.failures.len(),
            "Retention sweep finished"
        );
        report
    }

    /// Sweeps every period until shutdown is signalled.
    ///
    /// The first sweep runs one full period after start.
    pub fn spawn(self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let Some(start) = Instant::now().checked_add(self.period) else {
                tracing::error!(
                    period_secs = self.period.as_secs(),
                    "Sweep period out of range, retention sweeper not started"
                );
                return;
            };
            let mut ticker = interval_at(start, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(period_secs = self.period.as_secs(), "Retention sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep(Utc::now()).await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Retention sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }
}

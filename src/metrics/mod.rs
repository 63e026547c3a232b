//! Aggregate pipeline counters surfaced to the presentation layer.

mod types;

pub use types::{AssetRunMetrics, MetricsSnapshot, PipelineTotals};

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::reconcile::ReconcileStats;

const MAX_RECENT_RUNS: usize = 20;

pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    totals: PipelineTotals,
    recent_runs: Vec<AssetRunMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                totals: PipelineTotals::default(),
                recent_runs: Vec::with_capacity(MAX_RECENT_RUNS),
            })),
        }
    }

    pub async fn record_asset_run(&self, asset_id: &str, stats: ReconcileStats) {
        let mut state = self.inner.lock().await;

        state.totals.assets_processed += 1;
        state.totals.intervals_ingested += u64::from(stats.input_count);
        state.totals.duplicates_removed += u64::from(stats.duplicates_removed);
        state.totals.conflicts_resolved += u64::from(stats.conflicts_resolved);
        state.totals.intervals_merged += u64::from(stats.intervals_merged);
        state.totals.gaps_filled += u64::from(stats.gaps_filled);
        state.totals.anomalies_corrected += u64::from(stats.anomalies_corrected);

        state.recent_runs.push(AssetRunMetrics {
            asset_id: asset_id.to_string(),
            processed_at: Utc::now(),
            stats,
        });

        if state.recent_runs.len() > MAX_RECENT_RUNS {
            state.recent_runs.remove(0);
        }
    }

    pub async fn record_unknown_activities(&self, count: u64) {
        if count == 0 {
            return;
        }
        let mut state = self.inner.lock().await;
        state.totals.unknown_activities += count;
    }

    pub async fn record_rules_auto_added(&self, count: u64) {
        if count == 0 {
            return;
        }
        let mut state = self.inner.lock().await;
        state.totals.rules_auto_added += count;
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;
        MetricsSnapshot {
            totals: state.totals,
            recent_runs: state.recent_runs.clone(),
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        state.totals = PipelineTotals::default();
        state.recent_runs.clear();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

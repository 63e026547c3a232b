use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::reconcile::ReconcileStats;

/// Running totals across every asset processed since startup (or reset).
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTotals {
    pub assets_processed: u64,
    pub intervals_ingested: u64,
    pub duplicates_removed: u64,
    pub conflicts_resolved: u64,
    pub intervals_merged: u64,
    pub gaps_filled: u64,
    pub anomalies_corrected: u64,
    pub unknown_activities: u64,
    pub rules_auto_added: u64,
}

/// One asset's most recent pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRunMetrics {
    pub asset_id: String,
    pub processed_at: DateTime<Utc>,
    pub stats: ReconcileStats,
}

/// Everything the presentation layer needs for its counters view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub totals: PipelineTotals,
    pub recent_runs: Vec<AssetRunMetrics>,
}

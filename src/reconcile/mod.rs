//! Per-asset interval reconciliation pipeline.
//!
//! Raw records flow through normalization, conflict resolution,
//! consolidation/gap filling and anomaly correction. The whole pipeline is
//! a pure synchronous transformation with no cross-asset state, so assets
//! can be processed in parallel.

pub mod config;

mod anomaly;
mod conflict;
mod consolidate;
mod normalize;

pub use anomaly::correct_anomalies;
pub use config::ReconcileConfig;
pub use conflict::resolve_conflicts;
pub use consolidate::consolidate_and_fill;
pub use normalize::normalize_intervals;

use serde::Serialize;

use crate::models::{RawInterval, ResolvedInterval};

/// Observability counters for one asset's pipeline run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileStats {
    pub input_count: u32,
    pub duplicates_removed: u32,
    pub conflicts_resolved: u32,
    pub intervals_merged: u32,
    pub gaps_filled: u32,
    pub anomalies_corrected: u32,
    pub output_count: u32,
}

pub struct ReconcileOutcome {
    pub intervals: Vec<ResolvedInterval>,
    pub stats: ReconcileStats,
}

/// Run the full reconciliation pipeline for one asset.
pub fn reconcile_asset(
    asset_group: Option<&str>,
    raw: Vec<RawInterval>,
    config: &ReconcileConfig,
) -> ReconcileOutcome {
    let input_count = raw.len() as u32;

    let (normalized, duplicates_removed) = normalize_intervals(raw);
    let conflict = resolve_conflicts(asset_group, &normalized, config);
    let consolidated = consolidate_and_fill(asset_group, conflict.intervals, config);
    let corrected = correct_anomalies(consolidated.intervals, config);

    let stats = ReconcileStats {
        input_count,
        duplicates_removed,
        conflicts_resolved: conflict.conflicts_resolved,
        intervals_merged: consolidated.intervals_merged,
        gaps_filled: consolidated.gaps_filled,
        anomalies_corrected: corrected.anomalies_corrected,
        output_count: corrected.intervals.len() as u32,
    };

    ReconcileOutcome {
        intervals: corrected.intervals,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{status, FeedKind, SourceMeta};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, s).unwrap()
    }

    fn raw(status_code: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> RawInterval {
        RawInterval {
            id: uuid::Uuid::new_v4().to_string(),
            asset_id: "HARVESTER-01".to_string(),
            status_code: status_code.to_string(),
            display_label: None,
            start,
            end,
            reported_duration_hours: (end - start).num_seconds() as f64 / 3600.0,
            confidence: Some(0.5),
            source: SourceMeta {
                feed: FeedKind::Status,
                record_id: None,
            },
        }
    }

    fn assert_invariants(intervals: &[ResolvedInterval]) {
        for interval in intervals {
            assert!(interval.start < interval.end, "start must precede end");
        }
        for pair in intervals.windows(2) {
            assert!(pair[0].end <= pair[1].start, "sequence must not overlap");
        }
    }

    #[test]
    fn messy_feed_produces_a_clean_timeline() {
        let config = ReconcileConfig::default();
        let input = vec![
            // Duplicate pair, second carries the larger reported duration.
            raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0)),
            raw(status::RUNNING, ts(8, 0, 10), ts(9, 0, 5)),
            // Overlapping stopped report.
            raw(status::STOPPED, ts(8, 40, 0), ts(9, 5, 0)),
            // Flicker back to running, then a fillable gap.
            raw(status::STOPPED, ts(9, 5, 0), ts(9, 5, 10)),
            raw(status::RUNNING, ts(9, 5, 10), ts(9, 40, 0)),
            raw(status::RUNNING, ts(9, 40, 45), ts(10, 30, 0)),
        ];

        let outcome = reconcile_asset(None, input, &config);
        assert_invariants(&outcome.intervals);
        assert_eq!(outcome.stats.duplicates_removed, 1);
        assert!(outcome.stats.conflicts_resolved >= 1);
        assert!(outcome.stats.gaps_filled >= 1);
        assert_eq!(outcome.stats.input_count, 6);
        assert_eq!(outcome.stats.output_count, outcome.intervals.len() as u32);
    }

    #[test]
    fn pipeline_is_idempotent_on_its_own_output() {
        let config = ReconcileConfig::default();
        let input = vec![
            raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0)),
            raw(status::STOPPED, ts(8, 40, 0), ts(9, 5, 0)),
            raw(status::RUNNING, ts(9, 5, 0), ts(9, 5, 20)),
            raw(status::STOPPED, ts(9, 5, 20), ts(9, 45, 0)),
            raw(status::STOPPED, ts(9, 45, 50), ts(10, 30, 0)),
            raw(status::OFF, ts(10, 40, 0), ts(11, 0, 0)),
        ];

        let first = reconcile_asset(None, input, &config);
        assert_invariants(&first.intervals);

        // Re-run the resolution passes on their own output: nothing new to
        // resolve, merge, fill or correct.
        let conflict = {
            let raws: Vec<RawInterval> = first
                .intervals
                .iter()
                .map(|iv| RawInterval {
                    id: iv.id.clone(),
                    asset_id: iv.asset_id.clone(),
                    status_code: iv.status_code.clone(),
                    display_label: iv.display_label.clone(),
                    start: iv.start,
                    end: iv.end,
                    reported_duration_hours: iv.duration_secs as f64 / 3600.0,
                    confidence: Some(iv.confidence),
                    source: iv.source.clone(),
                })
                .collect();
            resolve_conflicts(None, &raws, &config)
        };
        assert_eq!(conflict.conflicts_resolved, 0);

        let second = consolidate_and_fill(
            None,
            first.intervals.clone(),
            &config,
        );
        assert_eq!(second.gaps_filled, 0);

        let third = correct_anomalies(second.intervals, &config);
        assert_eq!(third.anomalies_corrected, 0);

        let statuses_first: Vec<(&str, DateTime<Utc>, DateTime<Utc>)> = first
            .intervals
            .iter()
            .map(|iv| (iv.status_code.as_str(), iv.start, iv.end))
            .collect();
        let statuses_second: Vec<(&str, DateTime<Utc>, DateTime<Utc>)> = third
            .intervals
            .iter()
            .map(|iv| (iv.status_code.as_str(), iv.start, iv.end))
            .collect();
        assert_eq!(statuses_first, statuses_second);
    }

    #[test]
    fn flicker_between_running_reports_is_corrected() {
        let config = ReconcileConfig::default();
        let input = vec![
            raw(status::RUNNING, ts(9, 0, 0), ts(9, 0, 20)),
            raw(status::STOPPED, ts(9, 0, 20), ts(9, 0, 25)),
            raw(status::RUNNING, ts(9, 0, 25), ts(9, 10, 0)),
        ];

        let outcome = reconcile_asset(None, input, &config);
        assert_eq!(outcome.stats.anomalies_corrected, 1);
        let corrected = outcome
            .intervals
            .iter()
            .find(|iv| iv.anomaly_corrected)
            .expect("one interval should be corrected");
        assert_eq!(corrected.status_code, status::RUNNING);
        assert_eq!(
            corrected.original_status_code.as_deref(),
            Some(status::STOPPED)
        );
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let config = ReconcileConfig::default();
        let outcome = reconcile_asset(None, Vec::new(), &config);
        assert!(outcome.intervals.is_empty());
        assert_eq!(outcome.stats.output_count, 0);
    }
}

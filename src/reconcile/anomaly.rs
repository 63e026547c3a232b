//! Correction of short-lived state flickers.
//!
//! A triplet like running → stopped (5s) → running is almost always sensor
//! noise. The middle interval is relabelled to the surrounding status; its
//! boundaries, label and original status are preserved so the correction
//! stays auditable.

use crate::models::ResolvedInterval;

use super::config::ReconcileConfig;

pub struct AnomalyOutcome {
    pub intervals: Vec<ResolvedInterval>,
    pub anomalies_corrected: u32,
}

pub fn correct_anomalies(
    mut intervals: Vec<ResolvedInterval>,
    config: &ReconcileConfig,
) -> AnomalyOutcome {
    let mut anomalies_corrected = 0u32;

    if intervals.len() < 3 {
        return AnomalyOutcome {
            intervals,
            anomalies_corrected,
        };
    }

    for i in 1..intervals.len() - 1 {
        if intervals[i].anomaly_corrected {
            continue;
        }

        let prev_status = intervals[i - 1].status_code.clone();
        let next_status = intervals[i + 1].status_code.clone();
        let middle = &intervals[i];

        if config
            .match_anomaly(&prev_status, &middle.status_code, &next_status, middle.span_secs())
            .is_none()
        {
            continue;
        }

        let replacement = majority_status(&prev_status, &next_status);
        let middle = &mut intervals[i];
        middle.original_status_code = Some(std::mem::replace(
            &mut middle.status_code,
            replacement.to_string(),
        ));
        middle.anomaly_corrected = true;
        middle.confidence = 0.6;
        anomalies_corrected += 1;
    }

    AnomalyOutcome {
        intervals,
        anomalies_corrected,
    }
}

/// Majority status of the two neighbours; a tie favours the first.
fn majority_status<'a>(prev: &'a str, _next: &'a str) -> &'a str {
    // With two voters the result is unanimous or a tie, and ties go to prev.
    prev
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{status, FeedKind, SourceMeta};
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, s).unwrap()
    }

    fn resolved(status_code: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ResolvedInterval {
        ResolvedInterval {
            id: Uuid::new_v4().to_string(),
            asset_id: "HARVESTER-01".to_string(),
            status_code: status_code.to_string(),
            display_label: None,
            start,
            end,
            duration_secs: (end - start).num_seconds(),
            confidence: 0.5,
            merged_count: 1,
            gap_filled: false,
            gap_fill_kind: None,
            anomaly_corrected: false,
            original_status_code: None,
            source: SourceMeta {
                feed: FeedKind::Status,
                record_id: None,
            },
        }
    }

    #[test]
    fn short_stopped_flicker_is_relabelled() {
        let config = ReconcileConfig::default();
        let input = vec![
            resolved(status::RUNNING, ts(9, 0, 0), ts(9, 0, 20)),
            resolved(status::STOPPED, ts(9, 0, 20), ts(9, 0, 25)),
            resolved(status::RUNNING, ts(9, 0, 25), ts(9, 10, 0)),
        ];

        let outcome = correct_anomalies(input, &config);
        assert_eq!(outcome.anomalies_corrected, 1);

        let middle = &outcome.intervals[1];
        assert_eq!(middle.status_code, status::RUNNING);
        assert_eq!(middle.original_status_code.as_deref(), Some(status::STOPPED));
        assert!(middle.anomaly_corrected);
        assert!((middle.confidence - 0.6).abs() < 1e-9);
        // Boundaries never move.
        assert_eq!(middle.start, ts(9, 0, 20));
        assert_eq!(middle.end, ts(9, 0, 25));
    }

    #[test]
    fn long_middle_intervals_are_left_alone() {
        let config = ReconcileConfig::default();
        let input = vec![
            resolved(status::RUNNING, ts(9, 0, 0), ts(9, 10, 0)),
            resolved(status::STOPPED, ts(9, 10, 0), ts(9, 15, 0)),
            resolved(status::RUNNING, ts(9, 15, 0), ts(9, 30, 0)),
        ];

        let outcome = correct_anomalies(input, &config);
        assert_eq!(outcome.anomalies_corrected, 0);
        assert_eq!(outcome.intervals[1].status_code, status::STOPPED);
    }

    #[test]
    fn maintenance_flicker_uses_its_wider_threshold() {
        let config = ReconcileConfig::default();
        let input = vec![
            resolved(status::MAINTENANCE, ts(9, 0, 0), ts(9, 30, 0)),
            resolved(status::RUNNING, ts(9, 30, 0), ts(9, 34, 0)),
            resolved(status::MAINTENANCE, ts(9, 34, 0), ts(10, 0, 0)),
        ];

        // 240s is over every other pattern's threshold but inside the 300s
        // maintenance window.
        let outcome = correct_anomalies(input, &config);
        assert_eq!(outcome.anomalies_corrected, 1);
        assert_eq!(outcome.intervals[1].status_code, status::MAINTENANCE);
    }

    #[test]
    fn mixed_surroundings_take_the_first_neighbour() {
        let config = ReconcileConfig::default();
        let input = vec![
            resolved(status::RUNNING, ts(9, 0, 0), ts(9, 5, 0)),
            resolved(status::STOPPED, ts(9, 5, 0), ts(9, 5, 10)),
            resolved(status::ON, ts(9, 5, 10), ts(9, 20, 0)),
        ];

        let outcome = correct_anomalies(input, &config);
        assert_eq!(outcome.anomalies_corrected, 1);
        assert_eq!(outcome.intervals[1].status_code, status::RUNNING);
    }

    #[test]
    fn unrelated_patterns_pass_through() {
        let config = ReconcileConfig::default();
        let input = vec![
            resolved(status::STOPPED, ts(9, 0, 0), ts(9, 5, 0)),
            resolved(status::MAINTENANCE, ts(9, 5, 0), ts(9, 5, 10)),
            resolved(status::STOPPED, ts(9, 5, 10), ts(9, 20, 0)),
        ];

        let outcome = correct_anomalies(input, &config);
        assert_eq!(outcome.anomalies_corrected, 0);
    }

    #[test]
    fn corrected_intervals_are_not_recorrected() {
        let config = ReconcileConfig::default();
        let first = correct_anomalies(
            vec![
                resolved(status::RUNNING, ts(9, 0, 0), ts(9, 0, 20)),
                resolved(status::STOPPED, ts(9, 0, 20), ts(9, 0, 25)),
                resolved(status::RUNNING, ts(9, 0, 25), ts(9, 10, 0)),
            ],
            &config,
        );
        assert_eq!(first.anomalies_corrected, 1);

        let second = correct_anomalies(first.intervals, &config);
        assert_eq!(second.anomalies_corrected, 0);
    }
}

//! Deduplication and time-ordering of raw interval records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{FeedKind, RawInterval};

/// Dedup identity: minute-rounded boundaries, status and source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    start_minute: i64,
    end_minute: i64,
    status_code: String,
    asset_id: String,
    feed: FeedKind,
}

fn round_to_minute(ts: DateTime<Utc>) -> i64 {
    // Nearest minute, halves rounding up.
    (ts.timestamp() + 30).div_euclid(60)
}

fn dedup_key(interval: &RawInterval) -> DedupKey {
    DedupKey {
        start_minute: round_to_minute(interval.start),
        end_minute: round_to_minute(interval.end),
        status_code: interval.status_code.clone(),
        asset_id: interval.asset_id.clone(),
        feed: interval.source.feed,
    }
}

/// Deduplicate and sort one asset's raw records.
///
/// On a key collision the record with the larger reported duration survives;
/// ties keep the first seen. The sort is stable, so records with equal start
/// times stay in arrival order. Returns the clean sequence and the number of
/// duplicates removed.
pub fn normalize_intervals(raw: Vec<RawInterval>) -> (Vec<RawInterval>, u32) {
    if raw.is_empty() {
        return (Vec::new(), 0);
    }

    let mut kept: Vec<Option<RawInterval>> = Vec::with_capacity(raw.len());
    let mut index: HashMap<DedupKey, usize> = HashMap::with_capacity(raw.len());
    let mut duplicates_removed = 0u32;

    for interval in raw {
        let key = dedup_key(&interval);
        match index.get(&key) {
            Some(&slot) => {
                duplicates_removed += 1;
                let existing = kept[slot]
                    .as_ref()
                    .map(|iv| iv.reported_duration_hours)
                    .unwrap_or(0.0);
                if interval.reported_duration_hours > existing {
                    kept[slot] = Some(interval);
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(Some(interval));
            }
        }
    }

    let mut intervals: Vec<RawInterval> = kept.into_iter().flatten().collect();
    intervals.sort_by_key(|iv| iv.start);

    (intervals, duplicates_removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{status, SourceMeta};
    use chrono::TimeZone;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, s).unwrap()
    }

    fn raw(
        status_code: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        duration_hours: f64,
        feed: FeedKind,
    ) -> RawInterval {
        RawInterval {
            id: uuid::Uuid::new_v4().to_string(),
            asset_id: "HARVESTER-01".to_string(),
            status_code: status_code.to_string(),
            display_label: None,
            start,
            end,
            reported_duration_hours: duration_hours,
            confidence: None,
            source: SourceMeta {
                feed,
                record_id: None,
            },
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let (intervals, removed) = normalize_intervals(Vec::new());
        assert!(intervals.is_empty());
        assert_eq!(removed, 0);
    }

    #[test]
    fn identical_appointment_records_collapse_to_one() {
        // Two "Manutenção" rows at the same minute-rounded boundaries.
        let a = raw("Manutenção", ts(8, 0, 2), ts(9, 0, 1), 1.0, FeedKind::Appointment);
        let b = raw("Manutenção", ts(8, 0, 10), ts(8, 59, 55), 1.0, FeedKind::Appointment);

        let (intervals, removed) = normalize_intervals(vec![a, b]);
        assert_eq!(intervals.len(), 1);
        assert_eq!(removed, 1);
    }

    #[test]
    fn larger_reported_duration_survives_a_collision() {
        let a = raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0), 0.8, FeedKind::Status);
        let b = raw(status::RUNNING, ts(8, 0, 5), ts(9, 0, 5), 1.0, FeedKind::Status);
        let b_id = b.id.clone();

        let (intervals, removed) = normalize_intervals(vec![a, b]);
        assert_eq!(intervals.len(), 1);
        assert_eq!(removed, 1);
        assert_eq!(intervals[0].id, b_id);
        assert_eq!(intervals[0].reported_duration_hours, 1.0);
    }

    #[test]
    fn duration_tie_keeps_the_first_seen() {
        let a = raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0), 1.0, FeedKind::Status);
        let b = raw(status::RUNNING, ts(8, 0, 5), ts(9, 0, 5), 1.0, FeedKind::Status);
        let a_id = a.id.clone();

        let (intervals, _) = normalize_intervals(vec![a, b]);
        assert_eq!(intervals[0].id, a_id);
    }

    #[test]
    fn different_feeds_do_not_collide() {
        let a = raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0), 1.0, FeedKind::Status);
        let b = raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0), 1.0, FeedKind::Appointment);

        let (intervals, removed) = normalize_intervals(vec![a, b]);
        assert_eq!(intervals.len(), 2);
        assert_eq!(removed, 0);
    }

    #[test]
    fn output_is_sorted_by_start() {
        let a = raw(status::STOPPED, ts(10, 0, 0), ts(11, 0, 0), 1.0, FeedKind::Status);
        let b = raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0), 1.0, FeedKind::Status);
        let c = raw(status::OFF, ts(9, 30, 0), ts(9, 45, 0), 0.25, FeedKind::Status);

        let (intervals, _) = normalize_intervals(vec![a, b, c]);
        let statuses: Vec<&str> = intervals.iter().map(|iv| iv.status_code.as_str()).collect();
        assert_eq!(statuses, vec![status::RUNNING, status::OFF, status::STOPPED]);
    }

    #[test]
    fn equal_starts_preserve_arrival_order() {
        let a = raw(status::RUNNING, ts(8, 0, 0), ts(9, 0, 0), 1.0, FeedKind::Status);
        let b = raw(status::STOPPED, ts(8, 0, 0), ts(8, 30, 0), 0.5, FeedKind::Status);
        let a_id = a.id.clone();
        let b_id = b.id.clone();

        let (intervals, _) = normalize_intervals(vec![a, b]);
        assert_eq!(intervals[0].id, a_id);
        assert_eq!(intervals[1].id, b_id);
    }
}

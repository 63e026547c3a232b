//! Validation and conversion of the two raw data feeds.
//!
//! The status feed carries telemetry state rows; the appointment feed
//! carries operator-logged task rows. Both are validated here — non-empty
//! required fields, start strictly before end — and rows failing validation
//! are dropped with a logged warning, never passed to the core.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Activity, FeedKind, RawInterval, SourceMeta};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// One row of the telemetry status feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub asset: String,
    pub status_code: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
}

/// One row of the appointment feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    pub asset: String,
    pub category_code: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub duration_text: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
}

/// Converted status feed, grouped per normalized asset.
#[derive(Debug, Default)]
pub struct StatusIngest {
    pub intervals: BTreeMap<String, Vec<RawInterval>>,
    pub dropped: usize,
}

/// Converted appointment feed: interval records for the reconciliation
/// pipeline plus the discrete activities for classification.
#[derive(Debug, Default)]
pub struct AppointmentIngest {
    pub intervals: BTreeMap<String, Vec<RawInterval>>,
    pub activities: BTreeMap<String, Vec<Activity>>,
    pub dropped: usize,
}

/// Normalize an asset name into its canonical identity: trimmed, inner
/// whitespace collapsed, uppercased.
pub fn normalize_asset_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

pub fn ingest_status_feed(records: Vec<StatusRecord>) -> StatusIngest {
    let mut ingest = StatusIngest::default();

    for record in records {
        let asset = normalize_asset_name(&record.asset);
        if asset.is_empty() || record.status_code.trim().is_empty() {
            log_warn!(
                "dropping status record with missing fields (asset='{}', record={:?})",
                record.asset,
                record.record_id
            );
            ingest.dropped += 1;
            continue;
        }
        if record.start >= record.end {
            log_warn!(
                "dropping temporally inverted status record for {} ({} >= {})",
                asset,
                record.start,
                record.end
            );
            ingest.dropped += 1;
            continue;
        }

        let span_hours = (record.end - record.start).num_seconds() as f64 / 3600.0;
        let interval = RawInterval {
            id: Uuid::new_v4().to_string(),
            asset_id: asset.clone(),
            status_code: record.status_code.trim().to_string(),
            display_label: record.display_title,
            start: record.start,
            end: record.end,
            reported_duration_hours: record.duration_hours.unwrap_or(span_hours),
            confidence: None,
            source: SourceMeta {
                feed: FeedKind::Status,
                record_id: record.record_id,
            },
        };

        ingest.intervals.entry(asset).or_default().push(interval);
    }

    ingest
}

pub fn ingest_appointment_feed(records: Vec<AppointmentRecord>) -> AppointmentIngest {
    let mut ingest = AppointmentIngest::default();

    for record in records {
        let asset = normalize_asset_name(&record.asset);
        if asset.is_empty() || record.category_code.trim().is_empty() {
            log_warn!(
                "dropping appointment record with missing fields (asset='{}', record={:?})",
                record.asset,
                record.record_id
            );
            ingest.dropped += 1;
            continue;
        }
        if record.start >= record.end {
            log_warn!(
                "dropping temporally inverted appointment record for {} ({} >= {})",
                asset,
                record.start,
                record.end
            );
            ingest.dropped += 1;
            continue;
        }

        let category = record.category_code.trim().to_string();
        let span_hours = (record.end - record.start).num_seconds() as f64 / 3600.0;
        let reported_hours = record
            .duration_text
            .as_deref()
            .and_then(parse_duration_text)
            .unwrap_or(span_hours);

        let interval = RawInterval {
            id: Uuid::new_v4().to_string(),
            asset_id: asset.clone(),
            status_code: category.clone(),
            display_label: Some(category.clone()),
            start: record.start,
            end: record.end,
            reported_duration_hours: reported_hours,
            confidence: None,
            source: SourceMeta {
                feed: FeedKind::Appointment,
                record_id: record.record_id.clone(),
            },
        };

        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            asset_id: asset.clone(),
            category_code: category.clone(),
            display_label: Some(category),
            start: record.start,
            end: record.end,
        };

        ingest
            .intervals
            .entry(asset.clone())
            .or_default()
            .push(interval);
        ingest.activities.entry(asset).or_default().push(activity);
    }

    ingest
}

/// Parse an appointment duration written either as "HH:MM" or as decimal
/// hours ("1.5" / "1,5"). Unparseable text falls back to the timestamp span.
fn parse_duration_text(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some((hours, minutes)) = text.split_once(':') {
        let hours: f64 = hours.trim().parse().ok()?;
        let minutes: f64 = minutes.trim().parse().ok()?;
        if !(0.0..60.0).contains(&minutes) {
            return None;
        }
        return Some(hours + minutes / 60.0);
    }

    text.replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    fn status_record(asset: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> StatusRecord {
        StatusRecord {
            asset: asset.to_string(),
            status_code: "running".to_string(),
            start,
            end,
            duration_hours: None,
            display_title: None,
            record_id: None,
        }
    }

    #[test]
    fn asset_names_are_normalized() {
        assert_eq!(normalize_asset_name("  colhedora   07 "), "COLHEDORA 07");
        assert_eq!(normalize_asset_name("Truck-3"), "TRUCK-3");
        assert_eq!(normalize_asset_name("   "), "");
    }

    #[test]
    fn valid_status_rows_group_by_normalized_asset() {
        let records = vec![
            status_record("colhedora 07", ts(8, 0), ts(9, 0)),
            status_record("Colhedora   07", ts(9, 0), ts(10, 0)),
            status_record("TRUCK-3", ts(8, 0), ts(8, 30)),
        ];

        let ingest = ingest_status_feed(records);
        assert_eq!(ingest.dropped, 0);
        assert_eq!(ingest.intervals.len(), 2);
        assert_eq!(ingest.intervals["COLHEDORA 07"].len(), 2);
        assert_eq!(ingest.intervals["TRUCK-3"].len(), 1);
    }

    #[test]
    fn inverted_and_incomplete_rows_are_dropped() {
        let records = vec![
            status_record("TRUCK-3", ts(9, 0), ts(8, 0)),
            status_record("", ts(8, 0), ts(9, 0)),
            StatusRecord {
                status_code: " ".to_string(),
                ..status_record("TRUCK-3", ts(8, 0), ts(9, 0))
            },
        ];

        let ingest = ingest_status_feed(records);
        assert_eq!(ingest.dropped, 3);
        assert!(ingest.intervals.is_empty());
    }

    #[test]
    fn missing_duration_derives_from_the_span() {
        let ingest = ingest_status_feed(vec![status_record("TRUCK-3", ts(8, 0), ts(9, 30))]);
        let interval = &ingest.intervals["TRUCK-3"][0];
        assert!((interval.reported_duration_hours - 1.5).abs() < 1e-9);
    }

    #[test]
    fn appointments_produce_both_intervals_and_activities() {
        let records = vec![AppointmentRecord {
            asset: "colhedora 07".to_string(),
            category_code: "Manutenção".to_string(),
            start: ts(8, 0),
            end: ts(9, 0),
            duration_text: Some("01:30".to_string()),
            record_id: Some("ap-1".to_string()),
        }];

        let ingest = ingest_appointment_feed(records);
        assert_eq!(ingest.dropped, 0);

        let interval = &ingest.intervals["COLHEDORA 07"][0];
        assert_eq!(interval.status_code, "Manutenção");
        assert_eq!(interval.source.feed, FeedKind::Appointment);
        assert!((interval.reported_duration_hours - 1.5).abs() < 1e-9);

        let activity = &ingest.activities["COLHEDORA 07"][0];
        assert_eq!(activity.category_code, "Manutenção");
    }

    #[test]
    fn duration_text_parses_both_formats() {
        assert_eq!(parse_duration_text("02:30"), Some(2.5));
        assert_eq!(parse_duration_text("1,5"), Some(1.5));
        assert_eq!(parse_duration_text("0.25"), Some(0.25));
        assert_eq!(parse_duration_text("02:75"), None);
        assert_eq!(parse_duration_text("soon"), None);
    }
}

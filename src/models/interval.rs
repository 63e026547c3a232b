//! Operating-state interval data model.
//!
//! A `RawInterval` is one time-bounded state record for an asset as reported
//! by a feed. A `ResolvedInterval` is the reconciled form: deduplicated,
//! non-overlapping, possibly merged, gap-filled or anomaly-corrected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Known operating-state codes, ordered by resolution priority elsewhere.
pub mod status {
    pub const MAINTENANCE: &str = "maintenance";
    pub const OUT_OF_PLANT: &str = "out-of-plant";
    pub const SECONDARY_MOTOR_ON: &str = "secondary-motor-on";
    pub const ON: &str = "on";
    pub const RUNNING: &str = "running";
    pub const WORKING: &str = "working";
    pub const STOPPED: &str = "stopped";
    pub const IDLE: &str = "idle";
    pub const OFF: &str = "off";
    pub const NOT_APPROPRIATED: &str = "not-appropriated";
    pub const NO_DATA: &str = "no-data";
    pub const ERROR: &str = "error";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedKind {
    Status,
    Appointment,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Status => "status",
            FeedKind::Appointment => "appointment",
        }
    }
}

/// Provenance of a raw record: which feed produced it and the source row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    pub feed: FeedKind,
    pub record_id: Option<String>,
}

/// A validated per-asset state record, as handed to the reconciliation core.
///
/// `start < end` is guaranteed by the ingest layer; records violating it are
/// dropped upstream and never reach the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInterval {
    pub id: String,
    pub asset_id: String,
    pub status_code: String,
    pub display_label: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reported_duration_hours: f64,
    pub confidence: Option<f64>,
    pub source: SourceMeta,
}

impl RawInterval {
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn span_secs(&self) -> i64 {
        self.span().num_seconds()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GapFillKind {
    Contextual,
    Default,
}

impl GapFillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapFillKind::Contextual => "contextual",
            GapFillKind::Default => "default",
        }
    }
}

/// A reconciled interval in an asset's timeline.
///
/// Within one asset's resolved sequence intervals are strictly time-ordered
/// and non-overlapping. `duration_secs` is the summed operating duration of
/// every record merged into this interval and can exceed `end - start` after
/// a weighted merge of overlapping sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInterval {
    pub id: String,
    pub asset_id: String,
    pub status_code: String,
    pub display_label: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_secs: i64,
    pub confidence: f64,
    pub merged_count: u32,
    pub gap_filled: bool,
    pub gap_fill_kind: Option<GapFillKind>,
    pub anomaly_corrected: bool,
    pub original_status_code: Option<String>,
    pub source: SourceMeta,
}

impl ResolvedInterval {
    /// Promote a raw record into an unmerged resolved interval.
    pub fn from_raw(raw: &RawInterval) -> Self {
        Self {
            id: raw.id.clone(),
            asset_id: raw.asset_id.clone(),
            status_code: raw.status_code.clone(),
            display_label: raw.display_label.clone(),
            start: raw.start,
            end: raw.end,
            duration_secs: raw.span_secs(),
            confidence: raw.confidence.unwrap_or(0.5),
            merged_count: 1,
            gap_filled: false,
            gap_fill_kind: None,
            anomaly_corrected: false,
            original_status_code: None,
            source: raw.source.clone(),
        }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn span_secs(&self) -> i64 {
        self.span().num_seconds()
    }
}

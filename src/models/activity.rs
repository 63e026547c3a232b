use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A discrete logged task for an asset (e.g. an appointment entry).
///
/// Activities are already bounded by the operator who logged them; they are
/// classified but never run through conflict resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub asset_id: String,
    pub category_code: String,
    pub display_label: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Activity {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

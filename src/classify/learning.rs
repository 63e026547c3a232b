//! Learning feedback loop for unmapped activity codes.
//!
//! Classification records every code that fell through to the fallback
//! heuristic; a periodic scan aggregates those observations and auto-adds a
//! base rule when the heuristic's suggestion is confident enough. Keeping
//! the write out of `classify` keeps evaluation side-effect-free apart from
//! the observation itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::models::ActivityKind;
use crate::rules::RuleStore;

use super::keywords;

/// Cap on distinct tracked codes; beyond it new observations are dropped.
const MAX_TRACKED_CODES: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownActivity {
    pub code: String,
    pub kind: ActivityKind,
    pub display_label: Option<String>,
    pub occurrences: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Shared, bounded aggregation of unmapped codes across all assets.
#[derive(Clone, Default)]
pub struct UnknownActivityLog {
    inner: Arc<Mutex<HashMap<(String, ActivityKind), UnknownActivity>>>,
}

impl UnknownActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, code: &str, kind: ActivityKind, display_label: Option<&str>) {
        let mut tracked = self.inner.lock().unwrap();
        let key = (code.to_string(), kind);
        let now = Utc::now();

        if let Some(entry) = tracked.get_mut(&key) {
            entry.occurrences += 1;
            entry.last_seen = now;
            if entry.display_label.is_none() {
                entry.display_label = display_label.map(str::to_string);
            }
            return;
        }

        if tracked.len() >= MAX_TRACKED_CODES {
            return;
        }

        tracked.insert(
            key,
            UnknownActivity {
                code: code.to_string(),
                kind,
                display_label: display_label.map(str::to_string),
                occurrences: 1,
                first_seen: now,
                last_seen: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn drain(&self) -> Vec<UnknownActivity> {
        let mut tracked = self.inner.lock().unwrap();
        tracked.drain().map(|(_, entry)| entry).collect()
    }

    fn restore(&self, entries: Vec<UnknownActivity>) {
        let mut tracked = self.inner.lock().unwrap();
        for entry in entries {
            tracked
                .entry((entry.code.clone(), entry.kind))
                .or_insert(entry);
        }
    }
}

/// One learning pass: drain the log, auto-add confidently suggested rules,
/// put the rest back for future evidence. Returns the number of rules added.
pub fn scan_and_learn(log: &UnknownActivityLog, store: &RuleStore) -> u32 {
    let observations = log.drain();
    if observations.is_empty() {
        return 0;
    }

    let threshold = store.document().global_settings.auto_accept_threshold;
    let mut added = 0u32;
    let mut undecided = Vec::new();

    for observation in observations {
        match keywords::suggest_class(&observation.code, observation.display_label.as_deref()) {
            Some((class, confidence)) if confidence > threshold => {
                if store.auto_add_rule(observation.kind, &observation.code, class) {
                    added += 1;
                }
            }
            _ => undecided.push(observation),
        }
    }

    if !undecided.is_empty() {
        log.restore(undecided);
    }
    if added > 0 {
        info!("learning pass auto-added {added} rule(s)");
    }

    added
}

//! The versioned rule configuration document.
//!
//! This is the persisted shape exchanged with the configuration store:
//! base rule tables, per-group overrides, time windows, conditional
//! modifiers and the global engine settings. Maps are `BTreeMap` so the
//! serialized form is deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProductivityClass;

pub const CURRENT_DOCUMENT_VERSION: &str = "2.1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictStrategy {
    Priority,
    Latest,
    Longest,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::Priority => "priority",
            ConflictStrategy::Latest => "latest",
            ConflictStrategy::Longest => "longest",
        }
    }
}

/// A time-of-day window carrying class modifiers for specific codes.
/// Windows may wrap midnight (e.g. a 22:00–06:00 night shift).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub label: String,
    /// "HH:MM", inclusive.
    pub start_time: String,
    /// "HH:MM", exclusive.
    pub end_time: String,
    #[serde(default)]
    pub modifiers: BTreeMap<String, ProductivityClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBasedRules {
    #[serde(default)]
    pub windows: Vec<TimeWindow>,
}

/// A modifier that applies only when a named context condition holds,
/// e.g. `weather == "rain"` downgrading transport work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalModifier {
    pub condition_key: String,
    pub condition_value: String,
    #[serde(default)]
    pub modifiers: BTreeMap<String, ProductivityClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualRules {
    #[serde(default)]
    pub conditional_modifiers: Vec<ConditionalModifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalSettings {
    pub conflict_strategy: ConflictStrategy,
    pub gap_tolerance_seconds: i64,
    pub confidence_threshold: f64,
    pub default_class: ProductivityClass,
    pub time_rules_enabled: bool,
    pub group_overrides_enabled: bool,
    pub contextual_rules_enabled: bool,
    /// Minimum suggestion confidence for the learning pass to auto-add a rule.
    pub auto_accept_threshold: f64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            conflict_strategy: ConflictStrategy::Priority,
            gap_tolerance_seconds: 60,
            confidence_threshold: 0.5,
            default_class: ProductivityClass::Neutral,
            time_rules_enabled: true,
            group_overrides_enabled: true,
            contextual_rules_enabled: true,
            auto_accept_threshold: 0.8,
        }
    }
}

/// The full rule configuration document.
///
/// `telemetry_rules`, `appointment_rules` and `global_settings` are required;
/// a document missing any of them fails deserialization and is rejected by
/// the store. The remaining substructures default to empty so documents from
/// older versions still parse and can be migrated forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetDocument {
    pub version: String,
    pub last_modified: DateTime<Utc>,
    pub telemetry_rules: BTreeMap<String, ProductivityClass>,
    pub appointment_rules: BTreeMap<String, ProductivityClass>,
    #[serde(default)]
    pub group_overrides: BTreeMap<String, BTreeMap<String, ProductivityClass>>,
    #[serde(default)]
    pub time_based_rules: TimeBasedRules,
    #[serde(default)]
    pub contextual_rules: ContextualRules,
    pub global_settings: GlobalSettings,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RuleSetDocument {
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}

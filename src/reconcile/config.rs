//! Tunable thresholds and rule tables for the reconciliation pipeline.
//!
//! The constants here are heuristics inherited from field behavior, not
//! derived values; everything is carried in the config struct so deployments
//! can tune them without code changes.

use std::collections::HashMap;

use crate::models::status;
use crate::rules::{ConflictStrategy, GlobalSettings};

/// Asset group with vehicle-specific gap-fill behavior.
pub const MOBILE_VEHICLE_GROUP: &str = "mobile-vehicle";

/// Fixed resolution priority over known status codes, highest first:
/// maintenance > out-of-plant > secondary-motor-on > on/running (tied) >
/// stopped > off > not-appropriated > no-data. Unknown codes rank below
/// everything known.
pub fn status_priority(code: &str) -> u8 {
    match code {
        status::MAINTENANCE | status::ERROR => 10,
        status::OUT_OF_PLANT => 9,
        status::SECONDARY_MOTOR_ON => 8,
        status::ON | status::RUNNING | status::WORKING => 7,
        status::STOPPED | status::IDLE => 6,
        status::OFF => 5,
        status::NOT_APPROPRIATED => 4,
        status::NO_DATA => 3,
        _ => 1,
    }
}

/// A short-lived A→B→A flicker pattern considered implausible.
#[derive(Debug, Clone)]
pub struct AnomalyPattern {
    /// Statuses allowed on both sides of the flicker.
    pub surrounding: Vec<String>,
    /// The anomalous middle status.
    pub middle: String,
    /// The middle interval must be shorter than this to count.
    pub max_duration_secs: i64,
}

/// A gap-fill rule keyed on the statuses on either side of the gap.
#[derive(Debug, Clone)]
pub struct GapFillRule {
    /// Asset group the rule applies to; `None` makes it global.
    pub group: Option<String>,
    pub prev_status: String,
    pub next_status: String,
    pub fill_status: String,
    pub fill_label: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub strategy: ConflictStrategy,
    /// Overlaps at or under this are boundary noise, not conflicts.
    pub overlap_tolerance_secs: i64,
    /// Base consolidation tolerance; gaps up to twice this are fillable.
    pub base_tolerance_secs: i64,
    /// Composite-score gap above which the higher-scoring interval wins
    /// outright instead of weighted-merging.
    pub score_margin: f64,
    pub priority_weight: f64,
    pub confidence_weight: f64,
    pub context_weight: f64,
    /// Gap ceiling for merging across a compatibility group.
    pub compat_gap_secs: i64,
    /// Per-status scaling of the consolidation tolerance.
    pub status_multipliers: HashMap<String, f64>,
    /// Statuses within one group consolidate across short gaps.
    pub compatibility_groups: Vec<Vec<String>>,
    pub anomaly_patterns: Vec<AnomalyPattern>,
    pub gap_fill_rules: Vec<GapFillRule>,
    pub default_fill_status: String,
    pub default_fill_label: String,
    pub default_fill_confidence: f64,
    /// Per-(group, status) context score for the priority strategy.
    pub context_scores: HashMap<(String, String), f64>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::from_settings(&GlobalSettings::default())
    }
}

impl ReconcileConfig {
    pub fn from_settings(settings: &GlobalSettings) -> Self {
        let status_multipliers = HashMap::from([
            (status::MAINTENANCE.to_string(), 3.0),
            (status::RUNNING.to_string(), 0.5),
            (status::STOPPED.to_string(), 2.0),
            (status::OFF.to_string(), 1.5),
        ]);

        let compatibility_groups = vec![
            vec![
                status::RUNNING.to_string(),
                status::ON.to_string(),
                status::WORKING.to_string(),
            ],
            vec![status::STOPPED.to_string(), status::IDLE.to_string()],
            vec![
                status::OFF.to_string(),
                status::NOT_APPROPRIATED.to_string(),
            ],
            vec![status::MAINTENANCE.to_string(), status::ERROR.to_string()],
        ];

        let running_like = vec![status::RUNNING.to_string(), status::ON.to_string()];
        let anomaly_patterns = vec![
            AnomalyPattern {
                surrounding: running_like.clone(),
                middle: status::STOPPED.to_string(),
                max_duration_secs: 30,
            },
            AnomalyPattern {
                surrounding: vec![status::OFF.to_string()],
                middle: status::RUNNING.to_string(),
                max_duration_secs: 60,
            },
            AnomalyPattern {
                surrounding: vec![status::STOPPED.to_string()],
                middle: status::RUNNING.to_string(),
                max_duration_secs: 45,
            },
            AnomalyPattern {
                surrounding: vec![status::MAINTENANCE.to_string()],
                middle: status::RUNNING.to_string(),
                max_duration_secs: 300,
            },
            AnomalyPattern {
                surrounding: running_like,
                middle: status::NO_DATA.to_string(),
                max_duration_secs: 120,
            },
        ];

        let gap_fill_rules = vec![
            GapFillRule {
                group: Some(MOBILE_VEHICLE_GROUP.to_string()),
                prev_status: status::RUNNING.to_string(),
                next_status: status::STOPPED.to_string(),
                fill_status: status::OFF.to_string(),
                fill_label: Some("Motor Desligado".to_string()),
                confidence: 0.8,
            },
            GapFillRule {
                group: Some(MOBILE_VEHICLE_GROUP.to_string()),
                prev_status: status::STOPPED.to_string(),
                next_status: status::RUNNING.to_string(),
                fill_status: status::ON.to_string(),
                fill_label: Some("Motor Ligado".to_string()),
                confidence: 0.7,
            },
        ];

        // Vehicles legitimately leave the plant; a static asset reporting
        // out-of-plant is almost certainly a feed glitch.
        let context_scores = HashMap::from([
            (
                (MOBILE_VEHICLE_GROUP.to_string(), status::OUT_OF_PLANT.to_string()),
                0.8,
            ),
            (
                ("static-plant".to_string(), status::OUT_OF_PLANT.to_string()),
                0.2,
            ),
        ]);

        Self {
            strategy: settings.conflict_strategy,
            overlap_tolerance_secs: 30,
            base_tolerance_secs: settings.gap_tolerance_seconds.max(0),
            score_margin: 0.2,
            priority_weight: 0.6,
            confidence_weight: 0.3,
            context_weight: 0.1,
            compat_gap_secs: 30,
            status_multipliers,
            compatibility_groups,
            anomaly_patterns,
            gap_fill_rules,
            default_fill_status: status::OFF.to_string(),
            default_fill_label: "Motor Desligado".to_string(),
            default_fill_confidence: 0.5,
            context_scores,
        }
    }

    pub fn multiplier_for(&self, status_code: &str) -> f64 {
        self.status_multipliers
            .get(status_code)
            .copied()
            .unwrap_or(1.0)
    }

    /// Consolidation tolerance for a status pair: base scaled by the larger
    /// of the two sides' multipliers.
    pub fn adaptive_tolerance_secs(&self, a: &str, b: &str) -> i64 {
        let multiplier = self.multiplier_for(a).max(self.multiplier_for(b));
        (self.base_tolerance_secs as f64 * multiplier).round() as i64
    }

    pub fn same_compatibility_group(&self, a: &str, b: &str) -> bool {
        self.compatibility_groups
            .iter()
            .any(|group| group.iter().any(|s| s == a) && group.iter().any(|s| s == b))
    }

    pub fn context_score(&self, group: Option<&str>, status_code: &str) -> f64 {
        let Some(group) = group else {
            return 0.5;
        };
        self.context_scores
            .get(&(group.to_string(), status_code.to_string()))
            .copied()
            .unwrap_or(0.5)
    }

    pub fn match_anomaly(
        &self,
        prev_status: &str,
        middle_status: &str,
        next_status: &str,
        middle_duration_secs: i64,
    ) -> Option<&AnomalyPattern> {
        self.anomaly_patterns.iter().find(|pattern| {
            pattern.middle == middle_status
                && pattern.surrounding.iter().any(|s| s == prev_status)
                && pattern.surrounding.iter().any(|s| s == next_status)
                && middle_duration_secs < pattern.max_duration_secs
        })
    }

    /// Resolve the fill for a gap: group-specific rules win, then a
    /// same-status bridge, then the global default.
    pub fn gap_fill_rule(
        &self,
        group: Option<&str>,
        prev_status: &str,
        next_status: &str,
    ) -> Option<&GapFillRule> {
        if let Some(group) = group {
            if let Some(rule) = self.gap_fill_rules.iter().find(|rule| {
                rule.group.as_deref() == Some(group)
                    && rule.prev_status == prev_status
                    && rule.next_status == next_status
            }) {
                return Some(rule);
            }
        }
        self.gap_fill_rules.iter().find(|rule| {
            rule.group.is_none()
                && rule.prev_status == prev_status
                && rule.next_status == next_status
        })
    }
}

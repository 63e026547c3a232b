//! Layered classification of status and activity codes.
//!
//! Evaluation walks the rule layers in a fixed order and the first one with
//! an answer wins: time window, group override, contextual modifier, base
//! mapping, then the keyword fallback. Classification is total — malformed
//! input and unmapped codes resolve to the document's default class — and
//! deterministic for a fixed document.

use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};

use crate::models::{ActivityKind, ClassificationResult, ProductivityClass, RuleLayer};
use crate::rules::{RuleSetDocument, TimeWindow};

use super::keywords;
use super::learning::UnknownActivityLog;

const TIME_LAYER_CONFIDENCE: f64 = 0.85;
const GROUP_LAYER_CONFIDENCE: f64 = 0.9;
const CONTEXTUAL_LAYER_CONFIDENCE: f64 = 0.8;
const BASE_LAYER_CONFIDENCE: f64 = 0.95;
const DEFAULT_CLASS_CONFIDENCE: f64 = 0.5;

/// Optional evaluation context: when the work happened, which asset group
/// it belongs to and any ambient conditions (weather, maintenance windows).
#[derive(Debug, Clone, Default)]
pub struct ClassificationContext {
    pub timestamp: Option<DateTime<Utc>>,
    pub asset_group: Option<String>,
    pub conditions: HashMap<String, String>,
    pub display_label: Option<String>,
}

#[derive(Clone, Default)]
pub struct ClassificationEngine {
    unknowns: UnknownActivityLog,
}

impl ClassificationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(unknowns: UnknownActivityLog) -> Self {
        Self { unknowns }
    }

    pub fn unknown_log(&self) -> &UnknownActivityLog {
        &self.unknowns
    }

    pub fn classify(
        &self,
        document: &RuleSetDocument,
        code: &str,
        kind: ActivityKind,
        ctx: &ClassificationContext,
    ) -> ClassificationResult {
        let settings = &document.global_settings;

        let code = code.trim();
        if code.is_empty() {
            return ClassificationResult {
                class: settings.default_class,
                source_layer: RuleLayer::DefaultClass,
                confidence: DEFAULT_CLASS_CONFIDENCE,
            };
        }

        if settings.time_rules_enabled {
            if let Some(result) = time_based_layer(document, code, ctx) {
                return result;
            }
        }
        if settings.group_overrides_enabled {
            if let Some(result) = group_override_layer(document, code, ctx) {
                return result;
            }
        }
        if settings.contextual_rules_enabled {
            if let Some(result) = contextual_layer(document, code, ctx) {
                return result;
            }
        }
        if let Some(result) = base_mapping_layer(document, code, kind) {
            return result;
        }

        // Layer 5: record the unmapped code for the learning pass, then try
        // the keyword heuristic before settling on the default class.
        self.unknowns
            .record(code, kind, ctx.display_label.as_deref());

        match keywords::suggest_class(code, ctx.display_label.as_deref()) {
            Some((class, confidence)) => ClassificationResult {
                class,
                source_layer: RuleLayer::FallbackHeuristic,
                confidence,
            },
            None => ClassificationResult {
                class: settings.default_class,
                source_layer: RuleLayer::DefaultClass,
                confidence: DEFAULT_CLASS_CONFIDENCE,
            },
        }
    }
}

fn time_based_layer(
    document: &RuleSetDocument,
    code: &str,
    ctx: &ClassificationContext,
) -> Option<ClassificationResult> {
    let timestamp = ctx.timestamp?;
    let time_of_day = timestamp.time();

    for window in &document.time_based_rules.windows {
        if !window_contains(window, time_of_day) {
            continue;
        }
        if let Some(class) = window.modifiers.get(code) {
            return Some(ClassificationResult {
                class: *class,
                source_layer: RuleLayer::TimeBased,
                confidence: TIME_LAYER_CONFIDENCE,
            });
        }
    }
    None
}

/// Window containment on time-of-day; windows crossing midnight wrap.
/// Unparseable window times skip the window rather than failing the call.
fn window_contains(window: &TimeWindow, time_of_day: NaiveTime) -> bool {
    let (Some(start), Some(end)) = (
        parse_window_time(&window.start_time),
        parse_window_time(&window.end_time),
    ) else {
        return false;
    };

    if start <= end {
        time_of_day >= start && time_of_day < end
    } else {
        time_of_day >= start || time_of_day < end
    }
}

fn parse_window_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

fn group_override_layer(
    document: &RuleSetDocument,
    code: &str,
    ctx: &ClassificationContext,
) -> Option<ClassificationResult> {
    let group = ctx.asset_group.as_deref()?;
    let class = document.group_overrides.get(group)?.get(code)?;
    Some(ClassificationResult {
        class: *class,
        source_layer: RuleLayer::GroupOverride,
        confidence: GROUP_LAYER_CONFIDENCE,
    })
}

fn contextual_layer(
    document: &RuleSetDocument,
    code: &str,
    ctx: &ClassificationContext,
) -> Option<ClassificationResult> {
    if ctx.conditions.is_empty() {
        return None;
    }

    for modifier in &document.contextual_rules.conditional_modifiers {
        let holds = ctx
            .conditions
            .get(&modifier.condition_key)
            .map(|value| value == &modifier.condition_value)
            .unwrap_or(false);
        if !holds {
            continue;
        }
        if let Some(class) = modifier.modifiers.get(code) {
            return Some(ClassificationResult {
                class: *class,
                source_layer: RuleLayer::Contextual,
                confidence: CONTEXTUAL_LAYER_CONFIDENCE,
            });
        }
    }
    None
}

fn base_mapping_layer(
    document: &RuleSetDocument,
    code: &str,
    kind: ActivityKind,
) -> Option<ClassificationResult> {
    let table = match kind {
        ActivityKind::Status => &document.telemetry_rules,
        ActivityKind::Appointment => &document.appointment_rules,
    };
    table.get(code).map(|class| ClassificationResult {
        class: *class,
        source_layer: RuleLayer::BaseMapping,
        confidence: BASE_LAYER_CONFIDENCE,
    })
}

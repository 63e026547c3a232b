use serde::{Deserialize, Serialize};

/// Business classification of an interval or activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductivityClass {
    Productive,
    NonProductive,
    Neutral,
}

impl ProductivityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductivityClass::Productive => "productive",
            ProductivityClass::NonProductive => "non-productive",
            ProductivityClass::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "productive" => Some(ProductivityClass::Productive),
            "non-productive" => Some(ProductivityClass::NonProductive),
            "neutral" => Some(ProductivityClass::Neutral),
            _ => None,
        }
    }
}

/// Which kind of code is being classified, selecting the base rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Status,
    Appointment,
}

/// The rule layer that produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleLayer {
    TimeBased,
    GroupOverride,
    Contextual,
    BaseMapping,
    FallbackHeuristic,
    DefaultClass,
}

impl RuleLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleLayer::TimeBased => "timeBased",
            RuleLayer::GroupOverride => "groupOverride",
            RuleLayer::Contextual => "contextual",
            RuleLayer::BaseMapping => "baseMapping",
            RuleLayer::FallbackHeuristic => "fallbackHeuristic",
            RuleLayer::DefaultClass => "defaultClass",
        }
    }
}

/// Result of one classification evaluation. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub class: ProductivityClass,
    pub source_layer: RuleLayer,
    pub confidence: f64,
}

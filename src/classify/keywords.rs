//! Curated keyword lists for the fallback classification heuristic.
//!
//! The vocabulary mixes the normalized status codes with the operator-facing
//! Portuguese labels the feeds carry. Non-productive and neutral lists are
//! checked before productive so "desligado" never matches the "ligado"
//! productive keyword.

use crate::models::ProductivityClass;

pub const KEYWORD_MATCH_CONFIDENCE: f64 = 0.9;

const NON_PRODUCTIVE_KEYWORDS: &[&str] = &[
    "maintenance",
    "manuten",
    "stopped",
    "parado",
    "parada",
    "quebra",
    "falha",
    "failure",
    "repair",
    "reparo",
    "abastec",
    "refuel",
    "fora da planta",
];

const NEUTRAL_KEYWORDS: &[&str] = &[
    "desligado",
    "off",
    "no-data",
    "sem dados",
    "nao apropriado",
    "não apropriado",
    "aguardando",
    "standby",
];

const PRODUCTIVE_KEYWORDS: &[&str] = &[
    "ligado",
    "running",
    "rodando",
    "operando",
    "operacao",
    "operação",
    "working",
    "trabalhando",
    "colheita",
    "harvest",
    "transporte",
    "transport",
];

/// Suggest a class for an unmapped code from its code and display label.
pub fn suggest_class(code: &str, display_label: Option<&str>) -> Option<(ProductivityClass, f64)> {
    let haystack = match display_label {
        Some(label) => format!("{} {}", code, label).to_lowercase(),
        None => code.to_lowercase(),
    };

    let ordered = [
        (ProductivityClass::NonProductive, NON_PRODUCTIVE_KEYWORDS),
        (ProductivityClass::Neutral, NEUTRAL_KEYWORDS),
        (ProductivityClass::Productive, PRODUCTIVE_KEYWORDS),
    ];

    for (class, keywords) in ordered {
        if keywords.iter().any(|keyword| haystack.contains(keyword)) {
            return Some((class, KEYWORD_MATCH_CONFIDENCE));
        }
    }

    None
}

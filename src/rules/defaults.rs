//! Compiled-in default rule document, used on first run and whenever a
//! stored document fails validation.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::models::{status, ProductivityClass};

use super::document::{
    ContextualRules, GlobalSettings, RuleSetDocument, TimeBasedRules, TimeWindow,
    CURRENT_DOCUMENT_VERSION,
};

pub fn default_document() -> RuleSetDocument {
    RuleSetDocument {
        version: CURRENT_DOCUMENT_VERSION.to_string(),
        last_modified: Utc::now(),
        telemetry_rules: default_telemetry_rules(),
        appointment_rules: default_appointment_rules(),
        group_overrides: BTreeMap::new(),
        time_based_rules: default_time_rules(),
        contextual_rules: ContextualRules::default(),
        global_settings: GlobalSettings::default(),
        metadata: BTreeMap::new(),
    }
}

fn default_telemetry_rules() -> BTreeMap<String, ProductivityClass> {
    use ProductivityClass::{Neutral, NonProductive, Productive};

    let mut rules = BTreeMap::new();
    rules.insert(status::RUNNING.to_string(), Productive);
    rules.insert(status::ON.to_string(), Productive);
    rules.insert(status::WORKING.to_string(), Productive);
    rules.insert(status::SECONDARY_MOTOR_ON.to_string(), Productive);
    rules.insert(status::STOPPED.to_string(), NonProductive);
    rules.insert(status::IDLE.to_string(), NonProductive);
    rules.insert(status::MAINTENANCE.to_string(), NonProductive);
    rules.insert(status::ERROR.to_string(), NonProductive);
    rules.insert(status::OUT_OF_PLANT.to_string(), NonProductive);
    rules.insert(status::OFF.to_string(), Neutral);
    rules.insert(status::NOT_APPROPRIATED.to_string(), Neutral);
    rules.insert(status::NO_DATA.to_string(), Neutral);
    rules
}

// Appointment categories keep the source domain's operator vocabulary.
fn default_appointment_rules() -> BTreeMap<String, ProductivityClass> {
    use ProductivityClass::{Neutral, NonProductive, Productive};

    let mut rules = BTreeMap::new();
    rules.insert("Operação".to_string(), Productive);
    rules.insert("Transporte".to_string(), Productive);
    rules.insert("Colheita".to_string(), Productive);
    rules.insert("Manutenção".to_string(), NonProductive);
    rules.insert("Abastecimento".to_string(), NonProductive);
    rules.insert("Aguardando Ordem".to_string(), Neutral);
    rules.insert("Deslocamento".to_string(), Neutral);
    rules
}

fn default_time_rules() -> TimeBasedRules {
    let mut night_modifiers = BTreeMap::new();
    // The auxiliary motor outside operating hours is not production work.
    night_modifiers.insert(
        status::SECONDARY_MOTOR_ON.to_string(),
        ProductivityClass::Neutral,
    );

    TimeBasedRules {
        windows: vec![
            TimeWindow {
                label: "business-hours".to_string(),
                start_time: "07:00".to_string(),
                end_time: "18:00".to_string(),
                modifiers: BTreeMap::new(),
            },
            TimeWindow {
                label: "night-shift".to_string(),
                start_time: "22:00".to_string(),
                end_time: "06:00".to_string(),
                modifiers: night_modifiers,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_is_current_version() {
        let doc = default_document();
        assert_eq!(doc.version, CURRENT_DOCUMENT_VERSION);
        assert!(!doc.telemetry_rules.is_empty());
        assert!(!doc.appointment_rules.is_empty());
    }

    #[test]
    fn default_document_round_trips_through_json() {
        let doc = default_document();
        let json = serde_json::to_string(&doc).unwrap();
        let back: RuleSetDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn known_statuses_have_base_rules() {
        let rules = default_telemetry_rules();
        assert_eq!(
            rules.get(status::RUNNING),
            Some(&ProductivityClass::Productive)
        );
        assert_eq!(
            rules.get(status::MAINTENANCE),
            Some(&ProductivityClass::NonProductive)
        );
        assert_eq!(rules.get(status::OFF), Some(&ProductivityClass::Neutral));
    }
}

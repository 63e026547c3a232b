//! Structural validation and forward migration of rule documents.

use anyhow::{bail, Result};
use chrono::NaiveTime;
use log::info;

use super::defaults::default_document;
use super::document::{RuleSetDocument, CURRENT_DOCUMENT_VERSION};

/// Parse a "major.minor.patch" version string.
pub fn parse_version(value: &str) -> Option<(u32, u32, u32)> {
    let mut parts = value.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// Check a document beyond what deserialization already enforces.
///
/// Class values are guaranteed by the enum; this verifies version syntax,
/// settings ranges and window time formats. A failing document is rejected
/// by the store and replaced with defaults, never a fatal error.
pub fn validate_document(doc: &RuleSetDocument) -> Result<()> {
    if parse_version(&doc.version).is_none() {
        bail!("unparseable document version '{}'", doc.version);
    }

    let settings = &doc.global_settings;
    if settings.gap_tolerance_seconds < 0 {
        bail!(
            "gapToleranceSeconds must be non-negative, got {}",
            settings.gap_tolerance_seconds
        );
    }
    if !(0.0..=1.0).contains(&settings.confidence_threshold) {
        bail!(
            "confidenceThreshold out of range: {}",
            settings.confidence_threshold
        );
    }
    if !(0.0..=1.0).contains(&settings.auto_accept_threshold) {
        bail!(
            "autoAcceptThreshold out of range: {}",
            settings.auto_accept_threshold
        );
    }

    for window in &doc.time_based_rules.windows {
        parse_window_time(&window.start_time)
            .ok_or_else(|| anyhow::anyhow!("window '{}' has invalid startTime", window.label))?;
        parse_window_time(&window.end_time)
            .ok_or_else(|| anyhow::anyhow!("window '{}' has invalid endTime", window.label))?;
    }

    Ok(())
}

pub(crate) fn parse_window_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Bring an older document forward to the current version.
///
/// Missing substructures are populated from defaults, the version is bumped
/// and the migration is recorded in metadata. Returns true when anything
/// changed. Documents at or beyond the current version pass through.
pub fn migrate_document(doc: &mut RuleSetDocument) -> bool {
    let stored = match parse_version(&doc.version) {
        Some(v) => v,
        None => return false,
    };
    let current = parse_version(CURRENT_DOCUMENT_VERSION)
        .unwrap_or((0, 0, 0));
    if stored >= current {
        return false;
    }

    let defaults = default_document();

    if doc.group_overrides.is_empty() {
        doc.group_overrides = defaults.group_overrides;
    }
    if doc.time_based_rules.windows.is_empty() {
        doc.time_based_rules = defaults.time_based_rules;
    }
    if doc.contextual_rules.conditional_modifiers.is_empty() {
        doc.contextual_rules = defaults.contextual_rules;
    }

    info!(
        "migrated rule document {} -> {}",
        doc.version, CURRENT_DOCUMENT_VERSION
    );
    doc.metadata.insert(
        "migratedFrom".to_string(),
        serde_json::Value::String(doc.version.clone()),
    );
    doc.version = CURRENT_DOCUMENT_VERSION.to_string();
    doc.touch();
    true
}

//! Consolidation of noise-split intervals and synthesis of gap fillers.

use uuid::Uuid;

use crate::models::{GapFillKind, ResolvedInterval, SourceMeta};

use super::config::ReconcileConfig;

pub struct ConsolidateOutcome {
    pub intervals: Vec<ResolvedInterval>,
    pub intervals_merged: u32,
    pub gaps_filled: u32,
}

/// Merge reporting-noise splits, fill small residual gaps, then absorb the
/// fillers that landed next to a same-status neighbour.
pub fn consolidate_and_fill(
    asset_group: Option<&str>,
    intervals: Vec<ResolvedInterval>,
    config: &ReconcileConfig,
) -> ConsolidateOutcome {
    let (intervals, mut intervals_merged) = consolidate(intervals, config);
    let (intervals, gaps_filled) = fill_gaps(asset_group, intervals, config);

    let intervals = if gaps_filled > 0 {
        let (absorbed, more) = consolidate(intervals, config);
        intervals_merged += more;
        absorbed
    } else {
        intervals
    };

    ConsolidateOutcome {
        intervals,
        intervals_merged,
        gaps_filled,
    }
}

/// Single left-to-right merge walk.
pub fn consolidate(
    intervals: Vec<ResolvedInterval>,
    config: &ReconcileConfig,
) -> (Vec<ResolvedInterval>, u32) {
    if intervals.len() < 2 {
        return (intervals, 0);
    }

    let mut merged_count = 0u32;
    let mut result: Vec<ResolvedInterval> = Vec::with_capacity(intervals.len());
    let mut iter = intervals.into_iter();
    let mut current = iter.next().unwrap();

    for next in iter {
        if can_merge(&current, &next, config) {
            merge_into(&mut current, next);
            merged_count += 1;
        } else {
            result.push(current);
            current = next;
        }
    }
    result.push(current);

    (result, merged_count)
}

fn can_merge(current: &ResolvedInterval, next: &ResolvedInterval, config: &ReconcileConfig) -> bool {
    // Anomaly relabels keep their own interval; merging one would erase the
    // correction provenance and reopen it to further passes.
    if current.anomaly_corrected || next.anomaly_corrected {
        return false;
    }

    let gap_secs = (next.start - current.end).num_seconds();
    if gap_secs < 0 {
        return false;
    }

    let same_state = current.status_code == next.status_code
        && current.display_label == next.display_label;
    if same_state {
        let tolerance = config.adaptive_tolerance_secs(&current.status_code, &next.status_code);
        if gap_secs <= tolerance {
            return true;
        }
    }

    config.same_compatibility_group(&current.status_code, &next.status_code)
        && gap_secs <= config.compat_gap_secs
}

fn merge_into(current: &mut ResolvedInterval, next: ResolvedInterval) {
    current.end = next.end;
    current.duration_secs += next.duration_secs;
    current.merged_count += next.merged_count;
    current.confidence = (current.confidence.max(next.confidence) + 0.05).min(1.0);
    if next.gap_filled {
        current.gap_filled = true;
        if current.gap_fill_kind.is_none() {
            current.gap_fill_kind = next.gap_fill_kind;
        }
    }
}

/// Synthesize a filler for every residual gap up to twice the base
/// tolerance. Group rules win, then a same-status bridge, then the global
/// default fill.
pub fn fill_gaps(
    asset_group: Option<&str>,
    intervals: Vec<ResolvedInterval>,
    config: &ReconcileConfig,
) -> (Vec<ResolvedInterval>, u32) {
    if intervals.len() < 2 {
        return (intervals, 0);
    }

    let max_gap_secs = config.base_tolerance_secs * 2;
    let mut gaps_filled = 0u32;
    let mut result: Vec<ResolvedInterval> = Vec::with_capacity(intervals.len());
    let mut iter = intervals.into_iter();
    let mut current = iter.next().unwrap();

    for next in iter {
        let gap_secs = (next.start - current.end).num_seconds();
        if gap_secs > 0 && gap_secs <= max_gap_secs {
            let filler = synthesize_filler(asset_group, &current, &next, gap_secs, config);
            result.push(std::mem::replace(&mut current, filler));
            result.push(std::mem::replace(&mut current, next));
            gaps_filled += 1;
        } else {
            result.push(std::mem::replace(&mut current, next));
        }
    }
    result.push(current);

    (result, gaps_filled)
}

fn synthesize_filler(
    asset_group: Option<&str>,
    prev: &ResolvedInterval,
    next: &ResolvedInterval,
    gap_secs: i64,
    config: &ReconcileConfig,
) -> ResolvedInterval {
    let (status_code, display_label, confidence, kind) =
        match config.gap_fill_rule(asset_group, &prev.status_code, &next.status_code) {
            Some(rule) => (
                rule.fill_status.clone(),
                rule.fill_label.clone(),
                rule.confidence,
                GapFillKind::Contextual,
            ),
            None if prev.status_code == next.status_code => (
                prev.status_code.clone(),
                prev.display_label.clone(),
                0.7,
                GapFillKind::Contextual,
            ),
            None => (
                config.default_fill_status.clone(),
                Some(config.default_fill_label.clone()),
                config.default_fill_confidence,
                GapFillKind::Default,
            ),
        };

    ResolvedInterval {
        id: Uuid::new_v4().to_string(),
        asset_id: prev.asset_id.clone(),
        status_code,
        display_label,
        start: prev.end,
        end: next.start,
        duration_secs: gap_secs,
        confidence,
        merged_count: 1,
        gap_filled: true,
        gap_fill_kind: Some(kind),
        anomaly_corrected: false,
        original_status_code: None,
        source: SourceMeta {
            feed: prev.source.feed,
            record_id: None,
        },
    }
}

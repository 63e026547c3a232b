//! Temporal overlap resolution between consecutive normalized intervals.

use crate::models::{RawInterval, ResolvedInterval};
use crate::rules::ConflictStrategy;

use super::config::{status_priority, ReconcileConfig};

pub struct ConflictOutcome {
    pub intervals: Vec<ResolvedInterval>,
    pub conflicts_resolved: u32,
}

/// Turn a time-sorted sequence into a non-overlapping one.
///
/// Overlaps at or under the tolerance are boundary noise: the earlier
/// interval's end is snapped to the next start and both survive. Larger
/// overlaps are real conflicts resolved by the configured strategy.
pub fn resolve_conflicts(
    asset_group: Option<&str>,
    raw: &[RawInterval],
    config: &ReconcileConfig,
) -> ConflictOutcome {
    let mut intervals = Vec::with_capacity(raw.len());
    let mut conflicts_resolved = 0u32;

    let Some(first) = raw.first() else {
        return ConflictOutcome {
            intervals,
            conflicts_resolved,
        };
    };

    let mut current = ResolvedInterval::from_raw(first);

    for next_raw in &raw[1..] {
        let next = ResolvedInterval::from_raw(next_raw);
        let overlap_secs = (current.end - next.start).num_seconds();

        if overlap_secs <= config.overlap_tolerance_secs && next.start > current.start {
            if overlap_secs > 0 {
                // Snap the boundary so the output sequence never overlaps.
                current.end = next.start;
            }
            intervals.push(current);
            current = next;
            continue;
        }

        conflicts_resolved += 1;
        current = match config.strategy {
            ConflictStrategy::Priority => resolve_by_priority(current, next, asset_group, config),
            ConflictStrategy::Latest => resolve_latest(current, next),
            ConflictStrategy::Longest => resolve_longest(current, next),
        };
    }

    intervals.push(current);

    ConflictOutcome {
        intervals,
        conflicts_resolved,
    }
}

/// Composite score for one conflict candidate. The fixed status priority is
/// normalized to 0–1 before weighting so the confidence and context terms
/// still matter.
fn composite_score(interval: &ResolvedInterval, group: Option<&str>, config: &ReconcileConfig) -> f64 {
    let priority = f64::from(status_priority(&interval.status_code)) / 10.0;
    let context = config.context_score(group, &interval.status_code);

    config.priority_weight * priority
        + config.confidence_weight * interval.confidence
        + config.context_weight * context
}

fn resolve_by_priority(
    current: ResolvedInterval,
    next: ResolvedInterval,
    group: Option<&str>,
    config: &ReconcileConfig,
) -> ResolvedInterval {
    let score_current = composite_score(&current, group, config);
    let score_next = composite_score(&next, group, config);

    if (score_current - score_next).abs() > config.score_margin {
        let (mut winner, loser) = if score_current >= score_next {
            (current, next)
        } else {
            (next, current)
        };
        winner.end = winner.end.max(loser.end);
        winner.confidence = (winner.confidence + 0.1).min(1.0);
        winner
    } else {
        weighted_merge(current, next, score_current, score_next)
    }
}

/// Merge two candidates whose scores are too close to call. The merged
/// interval spans both, keeps the summed operating duration and takes the
/// dominant candidate's status with the larger normalized weight as
/// confidence.
fn weighted_merge(
    a: ResolvedInterval,
    b: ResolvedInterval,
    score_a: f64,
    score_b: f64,
) -> ResolvedInterval {
    let total = score_a + score_b;
    let (weight_a, weight_b) = if total > 0.0 {
        (score_a / total, score_b / total)
    } else {
        (0.5, 0.5)
    };

    let merged_count = a.merged_count + b.merged_count;
    let duration_secs = a.duration_secs + b.duration_secs;
    let start = a.start.min(b.start);
    let end = a.end.max(b.end);

    let mut merged = if score_a >= score_b { a } else { b };
    merged.start = start;
    merged.end = end;
    merged.duration_secs = duration_secs;
    merged.confidence = weight_a.max(weight_b);
    merged.merged_count = merged_count;
    merged
}

/// Keep the most recent interval, covering the span the loser reported.
fn resolve_latest(current: ResolvedInterval, next: ResolvedInterval) -> ResolvedInterval {
    let mut winner = next;
    winner.end = winner.end.max(current.end);
    winner
}

/// Keep the longer interval; ties keep the earlier one.
fn resolve_longest(current: ResolvedInterval, next: ResolvedInterval) -> ResolvedInterval {
    let (mut winner, loser) = if next.span_secs() > current.span_secs() {
        (next, current)
    } else {
        (current, next)
    };
    winner.end = winner.end.max(loser.end);
    winner
}

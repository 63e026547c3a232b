//! Top-level wiring: per-asset reconciliation sharding, snapshot-consistent
//! classification and the periodic persistence/learning tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::classify::{scan_and_learn, ClassificationContext, ClassificationEngine};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::models::{
    Activity, ActivityKind, ClassificationResult, FeedKind, RawInterval, ResolvedInterval,
};
use crate::reconcile::{reconcile_asset, ReconcileConfig, ReconcileStats};
use crate::rules::RuleStore;

const FLUSH_INTERVAL_SECS: u64 = 30;
const LEARNING_INTERVAL_SECS: u64 = 300;

/// Everything known about one asset going into a processing batch.
#[derive(Debug, Clone)]
pub struct AssetInput {
    pub asset_id: String,
    pub group: Option<String>,
    pub conditions: HashMap<String, String>,
    pub intervals: Vec<RawInterval>,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedInterval {
    pub interval: ResolvedInterval,
    pub classification: ClassificationResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedActivity {
    pub activity: Activity,
    pub classification: ClassificationResult,
}

/// Per-asset result handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTimeline {
    pub asset_id: String,
    pub intervals: Vec<ClassifiedInterval>,
    pub activities: Vec<ClassifiedActivity>,
    pub stats: ReconcileStats,
}

pub struct ReconcilerService {
    rules: Arc<RuleStore>,
    engine: ClassificationEngine,
    metrics: MetricsCollector,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ReconcilerService {
    pub fn new(rules: Arc<RuleStore>) -> Self {
        Self {
            rules,
            engine: ClassificationEngine::new(),
            metrics: MetricsCollector::new(),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    pub fn engine(&self) -> &ClassificationEngine {
        &self.engine
    }

    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot().await
    }

    /// Reconcile and classify a batch of assets.
    ///
    /// Every asset runs the pure pipeline on its own blocking worker; the
    /// whole batch is evaluated against one rule document snapshot so
    /// results are mutually consistent even if an edit lands mid-batch.
    pub async fn process_assets(&self, batch: Vec<AssetInput>) -> Vec<AssetTimeline> {
        let document = Arc::new(self.rules.document());
        let config = Arc::new(ReconcileConfig::from_settings(&document.global_settings));
        let unknowns_before = self.engine.unknown_log().len();

        let mut handles = Vec::with_capacity(batch.len());
        for input in batch {
            let document = Arc::clone(&document);
            let config = Arc::clone(&config);
            let engine = self.engine.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                process_single_asset(input, &engine, &document, &config)
            }));
        }

        let mut timelines = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(timeline) => timelines.push(timeline),
                Err(err) => error!("asset worker panicked: {err}"),
            }
        }

        for timeline in &timelines {
            self.metrics
                .record_asset_run(&timeline.asset_id, timeline.stats)
                .await;
        }
        let new_unknowns = self
            .engine
            .unknown_log()
            .len()
            .saturating_sub(unknowns_before);
        self.metrics
            .record_unknown_activities(new_unknowns as u64)
            .await;

        timelines
    }

    /// Spawn the debounced persistence flush and the learning scan. Both
    /// run until `shutdown`; calling this twice is a no-op.
    pub async fn start_background_tasks(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            return;
        }

        tasks.push(tokio::spawn(flush_loop(
            Arc::clone(&self.rules),
            self.cancel.child_token(),
            Duration::from_secs(FLUSH_INTERVAL_SECS),
        )));
        tasks.push(tokio::spawn(learning_loop(
            Arc::clone(&self.rules),
            self.engine.clone(),
            self.metrics.clone(),
            self.cancel.child_token(),
            Duration::from_secs(LEARNING_INTERVAL_SECS),
        )));
    }

    /// Stop scheduling periodic work and flush any pending document state.
    /// In-flight reconciliation always runs to completion.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let mut tasks = self.tasks.lock().await;
        for handle in tasks.drain(..) {
            if let Err(err) = handle.await {
                error!("background task failed to join: {err}");
            }
        }

        if let Err(err) = self.rules.flush_if_dirty().await {
            warn!("final rule flush failed: {err:#}");
        }
    }
}

fn process_single_asset(
    input: AssetInput,
    engine: &ClassificationEngine,
    document: &crate::rules::RuleSetDocument,
    config: &ReconcileConfig,
) -> AssetTimeline {
    let outcome = reconcile_asset(input.group.as_deref(), input.intervals, config);

    let intervals = outcome
        .intervals
        .into_iter()
        .map(|interval| {
            let ctx = ClassificationContext {
                timestamp: Some(interval.start),
                asset_group: input.group.clone(),
                conditions: input.conditions.clone(),
                display_label: interval.display_label.clone(),
            };
            let kind = match interval.source.feed {
                FeedKind::Status => ActivityKind::Status,
                FeedKind::Appointment => ActivityKind::Appointment,
            };
            let classification = engine.classify(document, &interval.status_code, kind, &ctx);
            ClassifiedInterval {
                interval,
                classification,
            }
        })
        .collect();

    let activities = input
        .activities
        .into_iter()
        .map(|activity| {
            let ctx = ClassificationContext {
                timestamp: Some(activity.start),
                asset_group: input.group.clone(),
                conditions: input.conditions.clone(),
                display_label: activity.display_label.clone(),
            };
            let classification = engine.classify(
                document,
                &activity.category_code,
                ActivityKind::Appointment,
                &ctx,
            );
            ClassifiedActivity {
                activity,
                classification,
            }
        })
        .collect();

    AssetTimeline {
        asset_id: input.asset_id,
        intervals,
        activities,
        stats: outcome.stats,
    }
}

async fn flush_loop(rules: Arc<RuleStore>, cancel: CancellationToken, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match rules.flush_if_dirty().await {
                    Ok(true) => info!("rule document flushed"),
                    Ok(false) => {}
                    Err(err) => warn!("rule flush failed, retrying next tick: {err:#}"),
                }
            }
            _ = cancel.cancelled() => {
                info!("flush loop shutting down");
                break;
            }
        }
    }
}

async fn learning_loop(
    rules: Arc<RuleStore>,
    engine: ClassificationEngine,
    metrics: MetricsCollector,
    cancel: CancellationToken,
    every: Duration,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let added = scan_and_learn(engine.unknown_log(), &rules);
                metrics.record_rules_auto_added(u64::from(added)).await;
            }
            _ = cancel.cancelled() => {
                info!("learning loop shutting down");
                break;
            }
        }
    }
}

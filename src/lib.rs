//! fleetline: per-asset operating-state timeline reconciliation and
//! productivity classification.
//!
//! Raw state records arrive overlapping, duplicated and inconsistently
//! sourced. The reconciliation pipeline turns them into a clean,
//! non-overlapping timeline per asset; the layered rule engine classifies
//! every resulting interval and logged activity as productive,
//! non-productive or neutral, learning rules for codes it has never seen.

pub mod classify;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod reconcile;
pub mod rules;
pub mod service;
pub mod snapshot;
pub mod utils;

pub use classify::{ClassificationContext, ClassificationEngine, UnknownActivityLog};
pub use models::{
    Activity, ActivityKind, ClassificationResult, GapFillKind, ProductivityClass, RawInterval,
    ResolvedInterval, RuleLayer,
};
pub use reconcile::{reconcile_asset, ReconcileConfig, ReconcileOutcome, ReconcileStats};
pub use rules::{RemoteConfigSource, RuleSetDocument, RuleStore};
pub use service::{AssetInput, AssetTimeline, ReconcilerService};
pub use snapshot::SnapshotStore;

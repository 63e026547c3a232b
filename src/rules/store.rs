//! Owner of the live rule document.
//!
//! Load order is remote snapshot, then local snapshot, then compiled-in
//! defaults. All mutations go through the explicit edit methods (or
//! `auto_add_rule`, the learning write path), flip the dirty flag and are
//! flushed by the periodic persistence task. Readers always observe a
//! complete pre- or post-mutation document.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::models::{ActivityKind, ProductivityClass};
use crate::snapshot::SnapshotStore;

use super::defaults::default_document;
use super::document::{GlobalSettings, RuleSetDocument};
use super::validate::{migrate_document, validate_document};

/// Collaborator that supplies and accepts the rule document remotely.
/// Absence and failure are both tolerated; the store falls back to the
/// local snapshot and then to defaults.
pub trait RemoteConfigSource: Send + Sync {
    fn fetch(&self) -> Result<Option<RuleSetDocument>>;
    fn push(&self, document: &RuleSetDocument) -> Result<()>;
}

pub struct RuleStore {
    document: RwLock<RuleSetDocument>,
    dirty: AtomicBool,
    local: Option<SnapshotStore>,
    remote: Option<Arc<dyn RemoteConfigSource>>,
}

impl RuleStore {
    /// In-memory store seeded with defaults; nothing is persisted.
    pub fn with_defaults() -> Self {
        Self {
            document: RwLock::new(default_document()),
            dirty: AtomicBool::new(false),
            local: None,
            remote: None,
        }
    }

    /// Load following the remote → local → defaults order. A document that
    /// fails validation is rejected and replaced with defaults; an older
    /// document is migrated forward and marked dirty so the migrated form
    /// is persisted on the next flush.
    pub async fn load(
        local: Option<SnapshotStore>,
        remote: Option<Arc<dyn RemoteConfigSource>>,
    ) -> Self {
        let mut loaded: Option<RuleSetDocument> = None;

        if let Some(source) = remote.as_ref() {
            match source.fetch() {
                Ok(Some(document)) => {
                    info!("loaded rule document from remote source");
                    loaded = Some(document);
                }
                Ok(None) => {}
                Err(err) => warn!("remote rule fetch failed, falling back: {err:#}"),
            }
        }

        if loaded.is_none() {
            if let Some(store) = local.as_ref() {
                match store.load_latest().await {
                    Ok(Some((document, saved_at))) => {
                        info!("loaded rule document snapshot saved at {saved_at}");
                        loaded = Some(document);
                    }
                    Ok(None) => {}
                    Err(err) => warn!("local rule snapshot load failed: {err:#}"),
                }
            }
        }

        let mut dirty = false;
        let document = match loaded {
            Some(mut document) => {
                if let Err(err) = validate_document(&document) {
                    warn!("stored rule document rejected, using defaults: {err:#}");
                    document = default_document();
                    dirty = true;
                } else if migrate_document(&mut document) {
                    dirty = true;
                }
                document
            }
            None => {
                info!("no stored rule document, starting from defaults");
                default_document()
            }
        };

        Self {
            document: RwLock::new(document),
            dirty: AtomicBool::new(dirty),
            local,
            remote,
        }
    }

    /// Cheap consistent copy of the live document.
    pub fn document(&self) -> RuleSetDocument {
        self.document.read().unwrap().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn set_telemetry_rule(&self, code: &str, class: ProductivityClass) {
        self.mutate(|doc| {
            doc.telemetry_rules.insert(code.to_string(), class);
        });
    }

    pub fn set_appointment_rule(&self, code: &str, class: ProductivityClass) {
        self.mutate(|doc| {
            doc.appointment_rules.insert(code.to_string(), class);
        });
    }

    pub fn set_group_override(&self, group: &str, code: &str, class: ProductivityClass) {
        self.mutate(|doc| {
            doc.group_overrides
                .entry(group.to_string())
                .or_default()
                .insert(code.to_string(), class);
        });
    }

    pub fn update_global_settings(&self, settings: GlobalSettings) {
        self.mutate(|doc| {
            doc.global_settings = settings;
        });
    }

    /// The single write path used by the learning pass. Existing rules are
    /// never overwritten by learning; an explicit edit is required for that.
    pub fn auto_add_rule(&self, kind: ActivityKind, code: &str, class: ProductivityClass) -> bool {
        let mut added = false;
        self.mutate(|doc| {
            let table = match kind {
                ActivityKind::Status => &mut doc.telemetry_rules,
                ActivityKind::Appointment => &mut doc.appointment_rules,
            };
            if table.contains_key(code) {
                return;
            }
            table.insert(code.to_string(), class);
            added = true;

            let counter = doc
                .metadata
                .entry("autoAddedRules".to_string())
                .or_insert_with(|| serde_json::Value::from(0u64));
            if let Some(n) = counter.as_u64() {
                *counter = serde_json::Value::from(n + 1);
            }
        });
        if added {
            info!("auto-added {} rule: {} -> {}", kind_name(kind), code, class.as_str());
        }
        added
    }

    fn mutate<F: FnOnce(&mut RuleSetDocument)>(&self, apply: F) {
        let mut guard = self.document.write().unwrap();
        apply(&mut guard);
        guard.touch();
        drop(guard);
        self.dirty.store(true, Ordering::Release);
    }

    /// Persist the current document when dirty. On failure the dirty flag
    /// stays set and the write is retried on the next scheduled flush.
    /// Returns true when a flush actually happened.
    pub async fn flush_if_dirty(&self) -> Result<bool> {
        if !self.dirty.load(Ordering::Acquire) {
            return Ok(false);
        }

        let document = self.document();

        if let Some(store) = self.local.as_ref() {
            store
                .save_document(&document)
                .await
                .context("local rule snapshot save failed")?;
        }
        if let Some(remote) = self.remote.as_ref() {
            remote
                .push(&document)
                .context("remote rule push failed")?;
        }

        self.dirty.store(false, Ordering::Release);
        Ok(true)
    }
}

fn kind_name(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Status => "telemetry",
        ActivityKind::Appointment => "appointment",
    }
}

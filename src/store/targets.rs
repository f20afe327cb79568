//! In-memory target store. Owns every target mutation.

use chrono::Utc;
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use super::document::repair;
use super::history;
use super::models::*;
use crate::activity::ActivityLog;
use crate::probe::{normalize_url, CheckOutcome, CheckRequest};

/// What `apply_result` changed, for the caller to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedResult {
    pub url: String,
    pub status: Status,
    pub transition: Option<Transition>,
}

/// Counts by status, for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    pub pending: usize,
    pub checking: usize,
    pub paused: usize,
}

/// Thread-safe target collection plus global configuration.
///
/// Locks are never held across an await point. Every mutation bumps the
/// revision counter observed by the persistence writer.
pub struct TargetStore {
    targets: RwLock<Vec<Target>>,
    config: RwLock<MonitorConfig>,
    activity: Arc<ActivityLog>,
    revision: watch::Sender<u64>,
}

impl TargetStore {
    /// Create an empty store.
    pub fn new(activity: Arc<ActivityLog>) -> Self {
        Self::from_snapshot(Snapshot::default(), activity)
    }

    /// Create a store seeded from a previously saved snapshot.
    pub fn from_snapshot(mut snapshot: Snapshot, activity: Arc<ActivityLog>) -> Self {
        repair(&mut snapshot);
        let (revision, _) = watch::channel(0);
        Self {
            targets: RwLock::new(snapshot.targets),
            config: RwLock::new(snapshot.config),
            activity,
            revision,
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    // --- Target CRUD ---

    /// Add a new PENDING target and return its id.
    pub fn add(&self, spec: TargetSpec) -> TargetId {
        let target = Target::new(spec, Utc::now().timestamp_millis());
        let id = target.id.clone();

        tracing::info!("Added target {} ({})", target.url, id);
        self.activity.info(format!("Added monitor: {}", target.url));

        self.targets.write().push(target);
        self.bump();
        id
    }

    /// Add several targets at once, logged as a single activity entry.
    pub fn add_batch(&self, specs: Vec<TargetSpec>) -> Vec<TargetId> {
        if specs.is_empty() {
            return Vec::new();
        }

        let now = Utc::now().timestamp_millis();
        let created: Vec<Target> = specs.into_iter().map(|spec| Target::new(spec, now)).collect();
        let ids: Vec<TargetId> = created.iter().map(|t| t.id.clone()).collect();

        tracing::info!("Added {} targets in batch", created.len());
        self.activity.info(format!("Batch added {} monitors", created.len()));

        self.targets.write().extend(created);
        self.bump();
        ids
    }

    /// Remove a target. Returns false if it was already absent.
    pub fn remove(&self, id: &TargetId) -> bool {
        let removed = {
            let mut targets = self.targets.write();
            targets
                .iter()
                .position(|t| &t.id == id)
                .map(|idx| targets.remove(idx))
        };

        match removed {
            Some(target) => {
                tracing::info!("Removed target {} ({})", target.url, id);
                self.activity.info(format!("Removed monitor: {}", target.url));
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Replace editable fields. Counters, history and incidents are kept.
    pub fn update(&self, id: &TargetId, update: TargetUpdate) -> bool {
        let url = {
            let mut targets = self.targets.write();
            let Some(target) = targets.iter_mut().find(|t| &t.id == id) else {
                return false;
            };

            if let Some(url) = update.url {
                target.url = normalize_url(&url);
            }
            if let Some(validation) = update.validation {
                target.validation = validation;
            }
            if let Some(polling) = update.polling {
                if !polling.is_jitter() {
                    target.next_interval_secs = None;
                }
                target.polling = polling;
            }
            if let Some(identity) = update.client_identity {
                target.client_identity = identity;
            }
            target.url.clone()
        };

        tracing::info!("Updated target {} ({})", url, id);
        self.activity.info(format!("Updated monitor: {}", url));
        self.bump();
        true
    }

    /// Flip the paused flag. Returns the new value, or `None` if absent.
    pub fn toggle_pause(&self, id: &TargetId) -> Option<bool> {
        let (url, paused) = {
            let mut targets = self.targets.write();
            let target = targets.iter_mut().find(|t| &t.id == id)?;
            target.paused = !target.paused;
            (target.url.clone(), target.paused)
        };

        let verb = if paused { "Paused" } else { "Resumed" };
        tracing::info!("{} target {}", verb, url);
        self.activity.info(format!("{} monitoring: {}", verb, url));
        self.bump();
        Some(paused)
    }

    /// Pause everything, or resume everything if all targets are already paused.
    /// Returns the new paused value.
    pub fn toggle_pause_all(&self) -> bool {
        let (paused, count) = {
            let mut targets = self.targets.write();
            let paused = !targets.iter().all(|t| t.paused);
            for target in targets.iter_mut() {
                target.paused = paused;
            }
            (paused, targets.len())
        };

        if count > 0 {
            let verb = if paused { "Paused" } else { "Resumed" };
            tracing::info!("{} all {} targets", verb, count);
            self.activity.info(format!("{} all monitors", verb));
            self.bump();
        }
        paused
    }

    // --- Check lifecycle ---

    /// Atomically claim a target for checking.
    ///
    /// Compare-and-set: succeeds only if the target exists and is not already
    /// CHECKING. For jitter targets this also draws the gap that follows the
    /// check.
    pub fn begin_check(&self, id: &TargetId) -> Option<CheckRequest> {
        let request = {
            let mut targets = self.targets.write();
            let target = targets.iter_mut().find(|t| &t.id == id)?;
            if target.status == Status::Checking {
                return None;
            }

            target.status = Status::Checking;
            if target.polling.is_jitter() {
                target.next_interval_secs = Some(rand::thread_rng().gen_range(JITTER_RANGE_SECS));
            }

            CheckRequest {
                id: target.id.clone(),
                url: target.url.clone(),
                validation: target.validation.clone(),
                client_identity: target.client_identity,
            }
        };

        self.bump();
        Some(request)
    }

    /// Apply a completed check. A result for a target removed mid-check is
    /// discarded and `None` is returned.
    pub fn apply_result(
        &self,
        id: &TargetId,
        result: &CheckOutcome,
        timestamp: i64,
    ) -> Option<AppliedResult> {
        let applied = {
            let mut targets = self.targets.write();
            let target = targets.iter_mut().find(|t| &t.id == id)?;
            let prior = target.settled_status();

            target.total_checks += 1;
            match result.outcome {
                Outcome::Down => {
                    target.total_down += 1;
                    target.failure_count = target.failure_count.saturating_add(1);
                }
                Outcome::Up => target.failure_count = 0,
            }

            let transition = history::record(
                target,
                prior,
                result.outcome,
                result.latency_ms,
                &result.detail,
                timestamp,
            );

            target.status = result.outcome.into();
            target.last_checked = Some(timestamp);
            target.last_response = Some(result.detail.clone());

            AppliedResult {
                url: target.url.clone(),
                status: target.status,
                transition,
            }
        };

        self.bump();
        Some(applied)
    }

    // --- Reads ---

    pub fn get(&self, id: &TargetId) -> Option<Target> {
        self.targets.read().iter().find(|t| &t.id == id).cloned()
    }

    pub fn list(&self) -> Vec<Target> {
        self.targets.read().clone()
    }

    /// Run a closure over the targets under the read lock, without cloning.
    pub fn read<R>(&self, f: impl FnOnce(&[Target]) -> R) -> R {
        f(&self.targets.read())
    }

    pub fn len(&self) -> usize {
        self.targets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.read().is_empty()
    }

    pub fn summary(&self) -> StoreSummary {
        self.read(|targets| {
            let mut summary = StoreSummary {
                total: targets.len(),
                ..Default::default()
            };
            for target in targets {
                match target.status {
                    Status::Up => summary.up += 1,
                    Status::Down => summary.down += 1,
                    Status::Pending => summary.pending += 1,
                    Status::Checking => summary.checking += 1,
                }
                if target.paused {
                    summary.paused += 1;
                }
            }
            summary
        })
    }

    // --- Configuration and snapshots ---

    pub fn config(&self) -> MonitorConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: MonitorConfig) {
        *self.config.write() = config;
        tracing::info!("Global configuration updated");
        self.activity.info("Settings updated");
        self.bump();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            targets: self.list(),
            config: self.config(),
        }
    }

    /// Replace all targets and the configuration with an imported snapshot.
    pub fn import(&self, mut snapshot: Snapshot) {
        repair(&mut snapshot);
        let count = snapshot.targets.len();

        *self.targets.write() = snapshot.targets;
        *self.config.write() = snapshot.config;

        tracing::info!("Imported {} targets", count);
        self.activity.info(format!("Imported {} monitors", count));
        self.bump();
    }

    // --- Observers ---

    /// Watch the revision counter; it changes after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }
}

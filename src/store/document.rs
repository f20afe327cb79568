//! Persisted snapshot document: load, save, load-time repair and the debounced
//! background writer.

use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::models::*;
use super::targets::TargetStore;
use crate::probe::normalize_url;

/// Document error types.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported document shape: expected an object or a list of targets")]
    Shape,
    #[error("Background save failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Decode a document from text. Accepts the snapshot object or a legacy bare
/// list of targets.
pub fn parse(text: &str) -> Result<Snapshot, DocumentError> {
    from_value(serde_json::from_str(text)?)
}

/// Decode an already-parsed document.
pub fn from_value(value: Value) -> Result<Snapshot, DocumentError> {
    let snapshot = match value {
        Value::Object(_) => serde_json::from_value(value)?,
        Value::Array(_) => serde_json::from_value(serde_json::json!({ "apis": value }))?,
        _ => return Err(DocumentError::Shape),
    };
    Ok(snapshot)
}

/// Load a document from disk. A missing file is not an error.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Snapshot>, DocumentError> {
    let text = match std::fs::read_to_string(path.as_ref()) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut snapshot = parse(&text)?;
    let repaired = repair(&mut snapshot);
    if repaired > 0 {
        tracing::info!("Repaired {} targets while loading {}", repaired, path.as_ref().display());
    }
    Ok(Some(snapshot))
}

/// Write a document atomically: a sibling temp file, then rename.
pub fn save<P: AsRef<Path>>(path: P, snapshot: &Snapshot) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let json = serde_json::to_vec_pretty(snapshot)?;
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Restore invariants field defaults cannot express. Returns the number of
/// targets that needed a fix.
pub fn repair(snapshot: &mut Snapshot) -> usize {
    let mut seen = HashSet::new();
    let mut repaired = 0;

    for target in snapshot.targets.iter_mut() {
        let mut fixed = false;

        if !seen.insert(target.id.clone()) {
            target.id = TargetId::generate();
            seen.insert(target.id.clone());
            fixed = true;
        }

        let url = normalize_url(&target.url);
        if url != target.url {
            target.url = url;
            fixed = true;
        }

        let polling = target.polling.clamped();
        if polling != target.polling {
            target.polling = polling;
            fixed = true;
        }
        let stale_gap = match target.next_interval_secs {
            Some(gap) => !target.polling.is_jitter() || !JITTER_RANGE_SECS.contains(&gap),
            None => false,
        };
        if stale_gap {
            target.next_interval_secs = None;
            fixed = true;
        }

        if target.history.len() > HISTORY_CAPACITY {
            let excess = target.history.len() - HISTORY_CAPACITY;
            target.history.drain(..excess);
            fixed = true;
        }

        if target.total_down > target.total_checks {
            target.total_down = target.total_checks;
            fixed = true;
        }

        fixed |= repair_incidents(target);

        if fixed {
            repaired += 1;
        }
    }

    repaired
}

/// Settle a persisted CHECKING and make "open incident iff DOWN" hold again.
fn repair_incidents(target: &mut Target) -> bool {
    let mut fixed = false;

    // Only the newest open incident may stay open
    let open: Vec<usize> = target
        .incidents
        .iter()
        .enumerate()
        .filter(|(_, i)| i.is_open())
        .map(|(idx, _)| idx)
        .collect();
    if let Some((&newest, older)) = open.split_last() {
        let close_at = target.incidents[newest].start_time;
        for &idx in older {
            target.incidents[idx].end_time = Some(close_at.max(target.incidents[idx].start_time));
            fixed = true;
        }
    }

    if target.status == Status::Checking {
        target.status = target.settled_status();
        fixed = true;
    }

    let resolved_at = target.last_checked.unwrap_or(target.created_at);
    match (target.status, target.open_incident().is_some()) {
        (Status::Down, false) => {
            let error = target.last_response.clone().unwrap_or_else(|| "Unknown".to_string());
            target.incidents.push(Incident::open(resolved_at, error));
            fixed = true;
        }
        (Status::Up | Status::Pending, true) => {
            if let Some(incident) = target.incidents.iter_mut().rev().find(|i| i.is_open()) {
                incident.end_time = Some(resolved_at.max(incident.start_time));
            }
            fixed = true;
        }
        _ => {}
    }

    fixed
}

/// Persist the store whenever it changes, coalescing bursts of mutations.
///
/// A save happens once the revision counter has been quiet for `debounce`.
/// Save failures are logged and retried on the next change.
pub async fn run_debounced_writer(store: Arc<TargetStore>, path: PathBuf, debounce: Duration) {
    let mut rx = store.subscribe();
    tracing::info!("Persisting state to {} (debounce {:?})", path.display(), debounce);

    loop {
        if rx.changed().await.is_err() {
            break;
        }

        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        if let Err(e) = flush(&store, &path).await {
            tracing::error!("Failed to save state to {}: {}", path.display(), e);
        }
    }

    // Sender gone, write whatever is left
    if let Err(e) = flush(&store, &path).await {
        tracing::error!("Failed to save state to {}: {}", path.display(), e);
    }
}

/// Save the current snapshot off the async runtime.
pub async fn flush(store: &TargetStore, path: &Path) -> Result<(), DocumentError> {
    let snapshot = store.snapshot();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || save(&path, &snapshot)).await??;
    tracing::debug!("State saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityLog;
    use crate::probe::CheckOutcome;
    use serde_json::json;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = TargetStore::new(Arc::new(ActivityLog::new()));
        let id = store.add(TargetSpec::new("https://example.com"));
        for (i, outcome) in [
            CheckOutcome::up(20, "HTTP 200"),
            CheckOutcome::down(0, "Timeout"),
            CheckOutcome::up(25, "HTTP 200"),
            CheckOutcome::down(0, "Connection Failed"),
        ]
        .iter()
        .enumerate()
        {
            store.begin_check(&id).unwrap();
            store.apply_result(&id, outcome, i as i64 * 1000).unwrap();
        }

        let snapshot = store.snapshot();
        save(&path, &snapshot).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        assert_eq!(loaded, snapshot);
        let target = &loaded.targets[0];
        assert_eq!(target.id, id);
        assert_eq!(target.total_checks, 4);
        assert_eq!(target.total_down, 2);
        assert_eq!(target.incidents.len(), 2);
        assert_eq!(target.status, Status::Down);
    }

    #[test]
    fn test_legacy_array_document() {
        let snapshot = parse(r#"[{"id": "a1", "url": "example.com"}, 7]"#).unwrap();
        assert_eq!(snapshot.targets.len(), 1);
        assert_eq!(snapshot.config, MonitorConfig::default());
    }

    #[test]
    fn test_jitter_interval_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let text = json!([
            {"id": "j", "url": "https://j.test", "intervalSeconds": 30, "useRandomInterval": true}
        ])
        .to_string();

        save(&path, &parse(&text).unwrap()).unwrap();
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.targets[0].polling, PollingPolicy::jitter(30));

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["apis"][0]["intervalSeconds"], 30);
    }

    #[test]
    fn test_scalar_document_rejected() {
        assert!(matches!(parse("42"), Err(DocumentError::Shape)));
        assert!(matches!(parse("{not json"), Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_repair_checking_and_ledger() {
        let mut snapshot: Snapshot = serde_json::from_value(json!({
            "apis": [
                {
                    "id": "dup", "url": "a.test", "status": "CHECKING", "totalChecks": 3,
                    "totalDown": 9, "lastChecked": 500,
                    "incidents": [
                        {"id": "i1", "startTime": 100, "endTime": null, "error": "Timeout"},
                        {"id": "i2", "startTime": 300, "endTime": null, "error": "Timeout"}
                    ]
                },
                {
                    "id": "dup", "url": "https://b.test", "status": "DOWN", "totalChecks": 1,
                    "totalDown": 1, "lastChecked": 700, "lastResponse": "HTTP 503"
                },
                {
                    "id": "c", "url": "https://c.test", "status": "UP", "totalChecks": 2,
                    "lastChecked": 900,
                    "incidents": [{"id": "i3", "startTime": 800, "endTime": null, "error": "x"}]
                }
            ]
        }))
        .unwrap();

        assert_eq!(repair(&mut snapshot), 3);

        let a = &snapshot.targets[0];
        assert_eq!(a.url, "https://a.test");
        assert_eq!(a.status, Status::Down);
        assert_eq!(a.total_down, 3);
        assert_eq!(a.incidents[0].end_time, Some(300));
        assert!(a.incidents[1].is_open());

        let b = &snapshot.targets[1];
        assert_ne!(b.id.as_str(), "dup");
        assert_eq!(b.open_incident().map(|i| i.error.as_str()), Some("HTTP 503"));
        assert_eq!(b.open_incident().map(|i| i.start_time), Some(700));

        let c = &snapshot.targets[2];
        assert!(c.open_incident().is_none());
        assert_eq!(c.incidents[0].end_time, Some(900));

        // A second pass has nothing left to fix
        assert_eq!(repair(&mut snapshot), 0);
    }

    #[test]
    fn test_repair_trims_history() {
        let history: Vec<Value> = (0..(HISTORY_CAPACITY + 10))
            .map(|i| json!({"timestamp": i, "latency": 5, "status": "UP"}))
            .collect();
        let doc = json!({"apis": [{"id": "h", "url": "https://h.test", "history": history}]});
        let mut snapshot = parse(&doc.to_string()).unwrap();

        repair(&mut snapshot);
        let target = &snapshot.targets[0];
        assert_eq!(target.history.len(), HISTORY_CAPACITY);
        assert_eq!(target.history.front().map(|s| s.timestamp), Some(10));
    }

    #[tokio::test]
    async fn test_debounced_writer_coalesces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = Arc::new(TargetStore::new(Arc::new(ActivityLog::new())));

        let writer = tokio::spawn(run_debounced_writer(
            store.clone(),
            path.clone(),
            Duration::from_millis(50),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        for i in 0..5 {
            store.add(TargetSpec::new(format!("https://{}.test", i)));
        }
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.targets.len(), 5);

        writer.abort();
    }
}

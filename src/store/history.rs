//! Bounded sample series and incident ledger bookkeeping.

use super::models::{HistorySample, Incident, Outcome, Status, Target, Transition, HISTORY_CAPACITY};

/// Record one completed check on `target`.
///
/// `prior` is the settled status before the check began. The sample is always
/// appended; the incident ledger only changes when the outcome crosses into or
/// out of DOWN. Returns the transition, if any.
pub fn record(
    target: &mut Target,
    prior: Status,
    outcome: Outcome,
    latency_ms: u64,
    detail: &str,
    timestamp: i64,
) -> Option<Transition> {
    push_sample(
        target,
        HistorySample {
            timestamp,
            latency: (outcome == Outcome::Up).then_some(latency_ms),
            outcome,
        },
    );

    match (prior, outcome) {
        (Status::Down, Outcome::Up) => {
            close_incident(target, timestamp);
            Some(Transition::Restored)
        }
        (Status::Down, Outcome::Down) | (_, Outcome::Up) => None,
        (_, Outcome::Down) => {
            target.incidents.push(Incident::open(timestamp, detail));
            Some(Transition::WentDown)
        }
    }
}

/// Append a sample, evicting the oldest entries beyond capacity.
pub fn push_sample(target: &mut Target, sample: HistorySample) {
    target.history.push_back(sample);
    while target.history.len() > HISTORY_CAPACITY {
        target.history.pop_front();
    }
}

/// Close the open incident, if one exists.
fn close_incident(target: &mut Target, timestamp: i64) {
    match target.incidents.iter_mut().rev().find(|i| i.is_open()) {
        Some(incident) => incident.end_time = Some(timestamp),
        None => tracing::warn!("Target {} restored without an open incident", target.id),
    }
}

//! Update pipeline: normalize, classify, transition, store.
//!
//! Each feed delivery runs the whole sequence synchronously under the state
//! write lock, so deliveries never interleave and the latest reading always
//! wins. Two housekeeping threads poll the feed and expire popups; both obey
//! a shared stop flag for teardown.

use crate::alert::classify;
use crate::alert::notify::NotificationSink;
use crate::error::AppError;
use crate::feed::adapter;
use crate::feed::FeedSource;
use crate::registry::RoadSegment;
use crate::state::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Process one raw feed snapshot for the live segment.
pub fn apply_snapshot(
    state: &Arc<RwLock<AppState>>,
    sink: &dyn NotificationSink,
    segment_id: u32,
    raw: &Value,
) -> Result<Option<RoadSegment>, AppError> {
    apply_snapshot_at(state, sink, segment_id, raw, SystemTime::now())
}

pub fn apply_snapshot_at(
    state: &Arc<RwLock<AppState>>,
    sink: &dyn NotificationSink,
    segment_id: u32,
    raw: &Value,
    now: SystemTime,
) -> Result<Option<RoadSegment>, AppError> {
    let mut guard = state.write().map_err(|_| AppError::StateLock)?;

    // A delivered snapshot proves the feed is reachable even when it carries
    // nothing for the monitored segment.
    guard.set_connected(true)?;

    let Some(prev) = guard.road(segment_id) else {
        debug!(segment_id, "Snapshot targets unknown segment, ignoring");
        return Ok(None);
    };
    let reading = adapter::normalize(raw, segment_id, prev);
    let classification = classify::classify(&reading, guard.alerts().policy());
    debug!(
        segment_id,
        vehicle_count = reading.vehicle_count,
        severity = ?classification.severity,
        "Snapshot classified"
    );

    guard.apply_classified_reading(segment_id, &reading, classification, now, sink)
}

/// Connectivity failure: surface the disconnected indicator, nothing else.
pub fn handle_feed_error(state: &Arc<RwLock<AppState>>) -> Result<(), AppError> {
    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.set_connected(false)
}

pub fn run_tick(state: &Arc<RwLock<AppState>>, now: SystemTime) -> Result<bool, AppError> {
    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.tick_alerts(now)
}

/// Spawn the feed polling thread. Clearing the stop flag's owner side (set
/// to true) is the unsubscribe: no further snapshots are processed.
pub fn spawn_feed_thread<F, S>(
    mut source: F,
    state: Arc<RwLock<AppState>>,
    sink: S,
    segment_id: u32,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()>
where
    F: FeedSource + Send + 'static,
    S: NotificationSink + Send + 'static,
{
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            match source.fetch_snapshot() {
                Ok(raw) => {
                    if let Err(err) = apply_snapshot(&state, &sink, segment_id, &raw) {
                        warn!(error = %err, "Feed update failed");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Feed fetch failed");
                    if let Err(err) = handle_feed_error(&state) {
                        warn!(error = %err, "Failed to flag feed as disconnected");
                    }
                }
            }

            sleep_with_stop(interval, &stop, cycle_start);
        }
    })
}

/// Spawn the popup housekeeping thread. The deadline is re-read from current
/// state on every tick, so a tick armed against a superseded popup is a no-op.
pub fn spawn_tick_thread(
    state: Arc<RwLock<AppState>>,
    stop: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();
            if let Err(err) = run_tick(&state, SystemTime::now()) {
                warn!(error = %err, "Alert tick failed");
            }
            sleep_with_stop(TICK_INTERVAL, &stop, cycle_start);
        }
    })
}

fn sleep_with_stop(duration: Duration, stop: &AtomicBool, start: Instant) {
    let elapsed = start.elapsed();
    if elapsed >= duration {
        return;
    }
    let remaining = duration - elapsed;
    let step = Duration::from_millis(100);
    let mut slept = Duration::ZERO;

    while slept < remaining {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(step);
        slept += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::notify::RecordingNotificationSink;
    use crate::alert::{AlertKind, GateStatus};
    use serde_json::json;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn escalation_scenario_runs_end_to_end() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let sink = RecordingNotificationSink::new();

        // 5 vehicles: nothing raised, gate open.
        apply_snapshot_at(&state, &sink, 4, &json!({"currentVehicles": 5}), at(0))
            .expect("apply")
            .expect("updated");
        {
            let guard = state.read().expect("state lock");
            assert!(!guard.alerts().popup().visible);
            assert_eq!(guard.road(4).expect("road").gate_status, GateStatus::Open);
            assert!(guard.connected());
        }

        // 8 vehicles: warning popup, one notification, gate still open.
        apply_snapshot_at(&state, &sink, 4, &json!({"currentVehicles": 8}), at(1))
            .expect("apply");
        {
            let guard = state.read().expect("state lock");
            let popup = guard.alerts().popup();
            assert!(popup.visible);
            assert_eq!(popup.kind, AlertKind::Warning);
            assert_eq!(guard.road(4).expect("road").gate_status, GateStatus::Open);
            assert_eq!(sink.count(), 1);
        }

        // 10 vehicles: closed popup, second notification, gate forced
        // closed, reopen deadline 15 minutes out.
        apply_snapshot_at(&state, &sink, 4, &json!({"currentVehicles": 10}), at(2))
            .expect("apply");
        {
            let guard = state.read().expect("state lock");
            let road = guard.road(4).expect("road");
            assert_eq!(guard.alerts().popup().kind, AlertKind::Closed);
            assert_eq!(road.gate_status, GateStatus::Closed);
            assert_eq!(
                road.reopen_deadline,
                Some(at(2) + Duration::from_secs(15 * 60))
            );
            assert_eq!(sink.count(), 2);
        }

        // Back to 9: warning band again, reopen deadline cleared.
        apply_snapshot_at(&state, &sink, 4, &json!({"currentVehicles": 9}), at(3))
            .expect("apply");
        {
            let guard = state.read().expect("state lock");
            let road = guard.road(4).expect("road");
            assert_eq!(road.reopen_deadline, None);
            assert_eq!(road.gate_status, GateStatus::Open);
        }
    }

    #[test]
    fn nested_snapshot_shape_reaches_the_live_segment() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let sink = RecordingNotificationSink::new();

        let raw = json!({"4": {"gate": {"carCount": 10, "isClosed": false}}});
        let updated = apply_snapshot_at(&state, &sink, 4, &raw, at(0))
            .expect("apply")
            .expect("updated");

        assert_eq!(updated.current_vehicles, 10);
        assert_eq!(updated.gate_status, GateStatus::Closed);
    }

    #[test]
    fn feed_error_only_flips_connectivity() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let sink = RecordingNotificationSink::new();

        apply_snapshot_at(&state, &sink, 4, &json!({"currentVehicles": 10}), at(0))
            .expect("apply");
        handle_feed_error(&state).expect("handle error");

        let guard = state.read().expect("state lock");
        assert!(!guard.connected());
        // Alert and registry state survive the outage untouched.
        assert!(guard.alerts().popup().visible);
        assert_eq!(guard.road(4).expect("road").current_vehicles, 10);
    }

    #[test]
    fn tick_expires_popup_through_shared_state() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let sink = RecordingNotificationSink::new();

        apply_snapshot_at(&state, &sink, 4, &json!({"currentVehicles": 10}), at(0))
            .expect("apply");

        assert!(!run_tick(&state, at(29)).expect("tick"));
        assert!(run_tick(&state, at(30)).expect("tick"));
        let guard = state.read().expect("state lock");
        assert!(!guard.alerts().popup().visible);
    }

    #[test]
    fn snapshot_for_unknown_segment_still_marks_connected() {
        let state = Arc::new(RwLock::new(AppState::default()));
        let sink = RecordingNotificationSink::new();

        let updated = apply_snapshot_at(&state, &sink, 77, &json!({"currentVehicles": 10}), at(0))
            .expect("apply");

        assert!(updated.is_none());
        let guard = state.read().expect("state lock");
        assert!(guard.connected());
        assert!(!guard.alerts().popup().visible);
    }
}

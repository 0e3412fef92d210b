use crate::api::ApiContext;
use crate::api::responses::{
    AlertErrorCode, AlertErrorResponse, AlertSuccessResponse, ConfigErrorCode,
    ConfigErrorResponse, DismissSuccessResponse, FeedConfigResponse, FeedStatus,
    HealthErrorCode, HealthErrorResponse, HealthSuccessResponse, RoadResponse, RoadStats,
    RoadsErrorCode, RoadsErrorResponse, RoadsSuccessResponse, SaveFeedConfigRequest,
    SaveFeedConfigResponse,
};
use crate::alert::GateStatus;
use crate::config::save_feed_url;
use crate::registry::RoadSegment;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

fn format_timestamp(timestamp: SystemTime) -> Result<String, time::error::Format> {
    OffsetDateTime::from(timestamp).format(&Rfc3339)
}

fn fallback_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

// Roads

pub enum RoadsResponse {
    Success(RoadsSuccessResponse),
    Error {
        status: StatusCode,
        body: RoadsErrorResponse,
    },
}

impl IntoResponse for RoadsResponse {
    fn into_response(self) -> Response {
        match self {
            RoadsResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            RoadsResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_roads(State(context): State<ApiContext>) -> impl IntoResponse {
    build_roads_response(context.state, SystemTime::now())
}

fn build_roads_response(state: Arc<RwLock<AppState>>, now: SystemTime) -> RoadsResponse {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return roads_internal_error("state lock poisoned while reading roads");
        }
    };
    let roads = guard.roads().to_vec();
    drop(guard);

    let mut mapped = Vec::with_capacity(roads.len());
    for road in &roads {
        match map_road(road) {
            Ok(response) => mapped.push(response),
            Err(message) => return roads_internal_error(message),
        }
    }

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return roads_internal_error("timestamp formatting failure"),
    };

    RoadsResponse::Success(RoadsSuccessResponse {
        stats: build_stats(&roads),
        roads: mapped,
        timestamp,
    })
}

fn build_stats(roads: &[RoadSegment]) -> RoadStats {
    let total_roads = roads.len();
    let open_gates = roads
        .iter()
        .filter(|road| road.gate_status == GateStatus::Open)
        .count();
    let closed_gates = total_roads - open_gates;
    let avg_occupancy_percent = if total_roads == 0 {
        0.0
    } else {
        let sum: f64 = roads.iter().map(|road| road.occupancy_percent()).sum();
        (sum / total_roads as f64).round()
    };

    RoadStats {
        total_roads,
        open_gates,
        closed_gates,
        avg_occupancy_percent,
    }
}

fn map_road(road: &RoadSegment) -> Result<RoadResponse, &'static str> {
    let reopen_at = match road.reopen_deadline {
        Some(deadline) => match format_timestamp(deadline) {
            Ok(formatted) => Some(formatted),
            Err(_) => return Err("reopen deadline formatting failure"),
        },
        None => None,
    };

    Ok(RoadResponse {
        id: road.id,
        name: road.name.clone(),
        location: road.location.clone(),
        capacity: road.capacity,
        current_vehicles: road.current_vehicles,
        occupancy_percent: road.occupancy_percent(),
        congestion: road.congestion_level(),
        gate_status: road.gate_status,
        center: road.center,
        path: road.path.clone(),
        avg_green_secs: road.avg_green_secs,
        reopen_at,
        sensors: road.sensors.clone(),
    })
}

fn roads_internal_error(message: &str) -> RoadsResponse {
    error!(message = message, "Internal error while handling /api/roads");
    RoadsResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: RoadsErrorResponse {
            error_code: RoadsErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

// Alert

pub enum AlertResponse {
    Success(AlertSuccessResponse),
    Error {
        status: StatusCode,
        body: AlertErrorResponse,
    },
}

impl IntoResponse for AlertResponse {
    fn into_response(self) -> Response {
        match self {
            AlertResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            AlertResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_alert(State(context): State<ApiContext>) -> impl IntoResponse {
    build_alert_response(context.state, SystemTime::now())
}

fn build_alert_response(state: Arc<RwLock<AppState>>, now: SystemTime) -> AlertResponse {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return alert_internal_error("state lock poisoned while reading alert");
        }
    };
    let popup = guard.alerts().popup().clone();
    drop(guard);

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return alert_internal_error("timestamp formatting failure"),
    };

    let (kind, message) = if popup.visible {
        (Some(popup.kind), Some(popup.message))
    } else {
        (None, None)
    };

    AlertResponse::Success(AlertSuccessResponse {
        visible: popup.visible,
        kind,
        message,
        timestamp,
    })
}

fn alert_internal_error(message: &str) -> AlertResponse {
    error!(message = message, "Internal error while handling /api/alert");
    AlertResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: AlertErrorResponse {
            error_code: AlertErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

pub enum DismissResponse {
    Success(DismissSuccessResponse),
    Error {
        status: StatusCode,
        body: AlertErrorResponse,
    },
}

impl IntoResponse for DismissResponse {
    fn into_response(self) -> Response {
        match self {
            DismissResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            DismissResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn dismiss_alert(State(context): State<ApiContext>) -> impl IntoResponse {
    build_dismiss_response(context.state, SystemTime::now())
}

fn build_dismiss_response(state: Arc<RwLock<AppState>>, now: SystemTime) -> DismissResponse {
    let mut guard = match state.write() {
        Ok(guard) => guard,
        Err(_) => {
            return dismiss_internal_error("state lock poisoned while dismissing alert");
        }
    };
    let dismissed = match guard.dismiss_alert(now) {
        Ok(dismissed) => dismissed,
        Err(_) => {
            return dismiss_internal_error("alert publication failed while dismissing");
        }
    };
    drop(guard);

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return dismiss_internal_error("timestamp formatting failure"),
    };

    DismissResponse::Success(DismissSuccessResponse {
        dismissed,
        timestamp,
    })
}

fn dismiss_internal_error(message: &str) -> DismissResponse {
    error!(
        message = message,
        "Internal error while handling /api/alert/dismiss"
    );
    DismissResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: AlertErrorResponse {
            error_code: AlertErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

// Health

pub enum HealthResponse {
    Success {
        status: StatusCode,
        body: HealthSuccessResponse,
    },
    Error {
        status: StatusCode,
        body: HealthErrorResponse,
    },
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        match self {
            HealthResponse::Success { status, body } => (status, Json(body)).into_response(),
            HealthResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health(State(context): State<ApiContext>) -> impl IntoResponse {
    build_health_response(context.state, SystemTime::now())
}

fn build_health_response(state: Arc<RwLock<AppState>>, now: SystemTime) -> HealthResponse {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return health_internal_error("state lock poisoned while reading connectivity");
        }
    };
    let connected = guard.connected();
    drop(guard);

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return health_internal_error("timestamp formatting failure"),
    };

    let (status_code, status) = if connected {
        (StatusCode::OK, FeedStatus::Ok)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, FeedStatus::Disconnected)
    };

    HealthResponse::Success {
        status: status_code,
        body: HealthSuccessResponse {
            status,
            connected,
            timestamp,
        },
    }
}

fn health_internal_error(message: &str) -> HealthResponse {
    error!(message = message, "Internal error while handling /api/health");
    HealthResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: HealthErrorResponse {
            error_code: HealthErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

// Feed configuration

pub enum ConfigResponse {
    FeedUrl(FeedConfigResponse),
    Saved(SaveFeedConfigResponse),
    Error {
        status: StatusCode,
        body: ConfigErrorResponse,
    },
}

impl IntoResponse for ConfigResponse {
    fn into_response(self) -> Response {
        match self {
            ConfigResponse::FeedUrl(body) => (StatusCode::OK, Json(body)).into_response(),
            ConfigResponse::Saved(body) => (StatusCode::OK, Json(body)).into_response(),
            ConfigResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_feed_config(State(context): State<ApiContext>) -> impl IntoResponse {
    build_feed_config_response(context.state, SystemTime::now())
}

pub async fn put_feed_config(
    State(context): State<ApiContext>,
    Json(request): Json<SaveFeedConfigRequest>,
) -> impl IntoResponse {
    build_save_feed_config_response(
        context.state,
        &context.config_path,
        request,
        SystemTime::now(),
    )
}

fn build_feed_config_response(state: Arc<RwLock<AppState>>, now: SystemTime) -> ConfigResponse {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return config_internal_error("state lock poisoned while reading feed url");
        }
    };
    let url = guard.feed_url().to_string();
    drop(guard);

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return config_internal_error("timestamp formatting failure"),
    };

    ConfigResponse::FeedUrl(FeedConfigResponse { url, timestamp })
}

fn build_save_feed_config_response(
    state: Arc<RwLock<AppState>>,
    config_path: &Path,
    request: SaveFeedConfigRequest,
    now: SystemTime,
) -> ConfigResponse {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return config_internal_error("timestamp formatting failure"),
    };

    let url = request.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return ConfigResponse::Error {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ConfigErrorResponse {
                error_code: ConfigErrorCode::InvalidUrl,
                error_message: "feed url must start with http:// or https://".to_string(),
                timestamp,
            },
        };
    }

    if let Err(err) = save_feed_url(config_path, url) {
        error!(error = %err, "Failed to persist feed url");
        return ConfigResponse::Error {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ConfigErrorResponse {
                error_code: ConfigErrorCode::PersistFailed,
                error_message: "failed to persist feed url".to_string(),
                timestamp,
            },
        };
    }

    match state.write() {
        Ok(mut guard) => guard.set_feed_url(url.to_string()),
        Err(_) => {
            return config_internal_error("state lock poisoned while updating feed url");
        }
    }

    // The feed thread keeps polling the old source until the service is
    // restarted; the caller is told so.
    ConfigResponse::Saved(SaveFeedConfigResponse {
        saved: true,
        restart_required: true,
        timestamp,
    })
}

fn config_internal_error(message: &str) -> ConfigResponse {
    error!(
        message = message,
        "Internal error while handling /api/config/feed"
    );
    ConfigResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ConfigErrorResponse {
            error_code: ConfigErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertKind;
    use crate::alert::classify::Classification;
    use crate::alert::notify::RecordingNotificationSink;
    use crate::alert::Severity;
    use crate::feed::adapter::CanonicalReading;
    use std::time::{Duration, UNIX_EPOCH};

    fn shared_state() -> Arc<RwLock<AppState>> {
        Arc::new(RwLock::new(AppState::default()))
    }

    fn poison(state: &Arc<RwLock<AppState>>) {
        let state_for_thread = Arc::clone(state);
        let _ = std::thread::spawn(move || {
            let _guard = state_for_thread.write().expect("lock for poison");
            panic!("poison lock");
        })
        .join();
    }

    fn raise_alert(state: &Arc<RwLock<AppState>>, vehicle_count: u32, severity: Severity) {
        let sink = RecordingNotificationSink::new();
        let mut guard = state.write().expect("state lock");
        guard
            .apply_classified_reading(
                4,
                &CanonicalReading {
                    avg_green_secs: Some(5.0),
                    vehicle_count,
                    gate_closed_hint: false,
                    sensors: None,
                },
                Classification {
                    severity,
                    gate_status: if severity == Severity::Closed {
                        GateStatus::Closed
                    } else {
                        GateStatus::Open
                    },
                },
                UNIX_EPOCH,
                &sink,
            )
            .expect("apply reading");
    }

    #[test]
    fn roads_handler_returns_seeded_registry_with_stats() {
        let state = shared_state();

        let response = build_roads_response(state, UNIX_EPOCH + Duration::from_secs(1));

        match response {
            RoadsResponse::Success(body) => {
                assert_eq!(body.roads.len(), 5);
                assert_eq!(body.stats.total_roads, 5);
                assert_eq!(body.stats.open_gates, 4);
                assert_eq!(body.stats.closed_gates, 1);
                assert_eq!(body.roads[3].id, 4);
                assert_eq!(body.roads[3].name, "Wahat Road");
                assert_eq!(body.timestamp, "1970-01-01T00:00:01Z");
            }
            RoadsResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
    }

    #[test]
    fn roads_handler_formats_reopen_deadline() {
        let state = shared_state();
        raise_alert(&state, 10, Severity::Closed);

        let response = build_roads_response(state, UNIX_EPOCH + Duration::from_secs(2));

        match response {
            RoadsResponse::Success(body) => {
                assert_eq!(
                    body.roads[3].reopen_at.as_deref(),
                    Some("1970-01-01T00:15:00Z")
                );
                assert_eq!(body.roads[3].current_vehicles, 10);
            }
            RoadsResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
    }

    #[test]
    fn roads_handler_returns_internal_error_when_lock_poisoned() {
        let state = shared_state();
        poison(&state);

        let response = build_roads_response(state, UNIX_EPOCH);

        match response {
            RoadsResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.error_code, RoadsErrorCode::InternalError);
                assert_eq!(body.error_message, "Internal server error");
            }
            RoadsResponse::Success(_) => {
                panic!("expected internal error response");
            }
        }
    }

    #[test]
    fn alert_handler_hides_stale_fields() {
        let state = shared_state();

        let response = build_alert_response(state, UNIX_EPOCH + Duration::from_secs(3));

        match response {
            AlertResponse::Success(body) => {
                assert!(!body.visible);
                assert!(body.kind.is_none());
                assert!(body.message.is_none());
                assert_eq!(body.timestamp, "1970-01-01T00:00:03Z");
            }
            AlertResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
    }

    #[test]
    fn alert_handler_reports_visible_popup() {
        let state = shared_state();
        raise_alert(&state, 8, Severity::Warning);

        let response = build_alert_response(state, UNIX_EPOCH + Duration::from_secs(4));

        match response {
            AlertResponse::Success(body) => {
                assert!(body.visible);
                assert_eq!(body.kind, Some(AlertKind::Warning));
                assert!(body.message.is_some());
            }
            AlertResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
    }

    #[test]
    fn dismiss_handler_reports_whether_popup_was_visible() {
        let state = shared_state();

        let response = build_dismiss_response(Arc::clone(&state), UNIX_EPOCH);
        match response {
            DismissResponse::Success(body) => assert!(!body.dismissed),
            DismissResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }

        raise_alert(&state, 10, Severity::Closed);
        let response = build_dismiss_response(state, UNIX_EPOCH + Duration::from_secs(5));
        match response {
            DismissResponse::Success(body) => {
                assert!(body.dismissed);
                assert_eq!(body.timestamp, "1970-01-01T00:00:05Z");
            }
            DismissResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
    }

    #[test]
    fn health_handler_reflects_connectivity() {
        let state = shared_state();

        let response = build_health_response(Arc::clone(&state), UNIX_EPOCH);
        match response {
            HealthResponse::Success { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body.status, FeedStatus::Disconnected);
                assert!(!body.connected);
            }
            HealthResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }

        state
            .write()
            .expect("state lock")
            .set_connected(true)
            .expect("set connected");
        let response = build_health_response(state, UNIX_EPOCH + Duration::from_secs(6));
        match response {
            HealthResponse::Success { status, body } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body.status, FeedStatus::Ok);
                assert!(body.connected);
                assert_eq!(body.timestamp, "1970-01-01T00:00:06Z");
            }
            HealthResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
    }

    #[test]
    fn put_feed_config_rejects_non_http_url() {
        let state = shared_state();
        let response = build_save_feed_config_response(
            state,
            Path::new("/nonexistent/config.toml"),
            SaveFeedConfigRequest {
                url: "ftp://feed.example.com".to_string(),
            },
            UNIX_EPOCH,
        );

        match response {
            ConfigResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(body.error_code, ConfigErrorCode::InvalidUrl);
            }
            _ => panic!("expected invalid url error"),
        }
    }

    #[test]
    fn put_feed_config_reports_persist_failure() {
        let state = shared_state();
        let response = build_save_feed_config_response(
            state,
            Path::new("/nonexistent/config.toml"),
            SaveFeedConfigRequest {
                url: "https://feed.example.com".to_string(),
            },
            UNIX_EPOCH,
        );

        match response {
            ConfigResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.error_code, ConfigErrorCode::PersistFailed);
            }
            _ => panic!("expected persist failure error"),
        }
    }

    #[test]
    fn put_feed_config_saves_and_requires_restart() -> Result<(), Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("wahat-api-config-{unique}.toml"));
        std::fs::write(
            &path,
            "[app]\nname = \"wahat-flow\"\n\n[logging]\nlevel = \"info\"\n\n[feed]\nurl = \"https://old.example.com/\"\n",
        )?;

        let state = shared_state();
        let response = build_save_feed_config_response(
            Arc::clone(&state),
            &path,
            SaveFeedConfigRequest {
                url: "https://new.example.com/".to_string(),
            },
            UNIX_EPOCH + Duration::from_secs(7),
        );

        let saved = crate::config::load_from_path(&path)?;
        let _ = std::fs::remove_file(&path);

        match response {
            ConfigResponse::Saved(body) => {
                assert!(body.saved);
                assert!(body.restart_required);
                assert_eq!(body.timestamp, "1970-01-01T00:00:07Z");
            }
            _ => panic!("expected saved response"),
        }
        assert_eq!(saved.feed_url(), "https://new.example.com/");
        assert_eq!(
            state.read().expect("state lock").feed_url(),
            "https://new.example.com/"
        );
        Ok(())
    }
}

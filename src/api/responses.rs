use crate::alert::{AlertKind, GateStatus};
use crate::registry::{CongestionLevel, GeoPoint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RoadsSuccessResponse {
    pub stats: RoadStats,
    pub roads: Vec<RoadResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RoadStats {
    pub total_roads: usize,
    pub open_gates: usize,
    pub closed_gates: usize,
    pub avg_occupancy_percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RoadResponse {
    pub id: u32,
    pub name: String,
    pub location: String,
    pub capacity: u32,
    pub current_vehicles: u32,
    pub occupancy_percent: f64,
    pub congestion: CongestionLevel,
    pub gate_status: GateStatus,
    pub center: GeoPoint,
    pub path: Vec<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_green_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reopen_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensors: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RoadsErrorResponse {
    pub error_code: RoadsErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoadsErrorCode {
    InternalError,
}

/// Popup snapshot. Stale `kind`/`message` are omitted entirely while the
/// popup is hidden, so consumers cannot read them by accident.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AlertSuccessResponse {
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AlertKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DismissSuccessResponse {
    pub dismissed: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AlertErrorResponse {
    pub error_code: AlertErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertErrorCode {
    InternalError,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Ok,
    Disconnected,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: FeedStatus,
    pub connected: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthErrorResponse {
    pub error_code: HealthErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthErrorCode {
    InternalError,
}

#[derive(Debug, Deserialize)]
pub struct SaveFeedConfigRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedConfigResponse {
    pub url: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SaveFeedConfigResponse {
    pub saved: bool,
    pub restart_required: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ConfigErrorResponse {
    pub error_code: ConfigErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigErrorCode {
    InvalidUrl,
    PersistFailed,
    InternalError,
}

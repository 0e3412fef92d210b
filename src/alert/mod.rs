use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod classify;
pub mod controller;
pub mod notify;

pub const DEFAULT_WARNING_THRESHOLD: u32 = 8;
pub const DEFAULT_CLOSED_THRESHOLD: u32 = 10;
pub const DEFAULT_POPUP_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_SNOOZE_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_REOPEN_AFTER: Duration = Duration::from_secs(15 * 60);

pub const WARNING_MESSAGE: &str =
    "Warning: high density detected. The road will close in about 5 minutes.";
pub const CLOSED_MESSAGE: &str =
    "Road closed: maximum density reached. Expected to reopen in about 15 minutes.";

/// Congestion severity for one classified reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Warning,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Open,
    Closed,
}

/// The two popup-bearing severities. `Severity::None` never raises a popup,
/// so the popup and suppression state only track these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Closed,
}

/// Transient popup shown to the operator. When `visible` is false the
/// remaining fields are stale and consumers must ignore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPopup {
    pub visible: bool,
    pub kind: AlertKind,
    pub message: String,
}

impl AlertPopup {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            kind: AlertKind::Warning,
            message: String::new(),
        }
    }
}

impl Default for AlertPopup {
    fn default() -> Self {
        Self::hidden()
    }
}

/// Thresholds and durations driving classification and the alert machine.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicy {
    /// Vehicle count at which a warning is raised.
    pub warning_threshold: u32,
    /// Vehicle count at which the gate is force-closed.
    pub closed_threshold: u32,
    /// How long a popup stays up before auto-dismissing.
    pub popup_duration: Duration,
    /// Suppression window started by an explicit user dismissal.
    pub snooze_duration: Duration,
    /// How far ahead the reopen deadline is set on entry into Closed.
    pub reopen_after: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            closed_threshold: DEFAULT_CLOSED_THRESHOLD,
            popup_duration: DEFAULT_POPUP_DURATION,
            snooze_duration: DEFAULT_SNOOZE_DURATION,
            reopen_after: DEFAULT_REOPEN_AFTER,
        }
    }
}

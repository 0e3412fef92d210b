//! Popup and notification state machine.
//!
//! Owns the transient popup, the per-severity "already notified" flags, the
//! per-severity snooze deadlines, and the popup auto-dismiss deadline. All
//! transitions take an explicit `now` so temporal behavior is testable
//! without sleeping.

use crate::alert::classify::Classification;
use crate::alert::notify::NotificationSink;
use crate::alert::{AlertKind, AlertPolicy, AlertPopup, CLOSED_MESSAGE, Severity, WARNING_MESSAGE};
use std::time::SystemTime;
use tracing::debug;

const WARNING_TITLE: &str = "Traffic warning";
const WARNING_BODY: &str = "Wahat Road is nearing closure (8+ vehicles).";
const CLOSED_TITLE: &str = "Road closed";
const CLOSED_BODY: &str = "Wahat Road is heavily congested (10+ vehicles).";

#[derive(Debug)]
pub struct AlertController {
    policy: AlertPolicy,
    popup: AlertPopup,
    notified_warning: bool,
    notified_closed: bool,
    snooze_warning_until: Option<SystemTime>,
    snooze_closed_until: Option<SystemTime>,
    dismiss_at: Option<SystemTime>,
}

impl AlertController {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            popup: AlertPopup::hidden(),
            notified_warning: false,
            notified_closed: false,
            snooze_warning_until: None,
            snooze_closed_until: None,
            dismiss_at: None,
        }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    pub fn popup(&self) -> &AlertPopup {
        &self.popup
    }

    /// Advance the machine by one classified reading.
    ///
    /// The popup may reappear on every qualifying update while not visible;
    /// the external notification fires at most once per entry into a
    /// severity band (edge-triggered on the notified flag).
    pub fn apply(
        &mut self,
        classification: Classification,
        vehicle_count: u32,
        now: SystemTime,
        sink: &dyn NotificationSink,
    ) {
        match classification.severity {
            Severity::Closed => {
                if !self.snoozed(AlertKind::Closed, now) {
                    self.show(AlertKind::Closed, CLOSED_MESSAGE, now);
                }
                if !self.notified_closed {
                    sink.send(CLOSED_TITLE, CLOSED_BODY, "closed");
                }
            }
            Severity::Warning => {
                if !self.snoozed(AlertKind::Warning, now) {
                    self.show(AlertKind::Warning, WARNING_MESSAGE, now);
                }
                if !self.notified_warning {
                    sink.send(WARNING_TITLE, WARNING_BODY, "warning");
                }
            }
            Severity::None => {
                // A Closed popup is never silently cleared here; the
                // auto-dismiss deadline owns its lifetime.
                if self.popup.visible && self.popup.kind == AlertKind::Warning {
                    self.hide();
                }
            }
        }

        // Flags track the classified band directly; the false-to-true edge
        // above is what gated notification dispatch.
        self.notified_closed = classification.severity == Severity::Closed;
        self.notified_warning = classification.severity == Severity::Warning;

        // Snooze windows survive only while their condition holds.
        if vehicle_count < self.policy.warning_threshold {
            self.snooze_warning_until = None;
        }
        if vehicle_count < self.policy.closed_threshold {
            self.snooze_closed_until = None;
        }
    }

    /// Explicit user close. Hides the popup and starts the snooze window for
    /// the dismissed severity only. Returns whether a popup was visible.
    pub fn dismiss(&mut self, now: SystemTime) -> bool {
        if !self.popup.visible {
            return false;
        }
        let snooze_until = now + self.policy.snooze_duration;
        match self.popup.kind {
            AlertKind::Warning => self.snooze_warning_until = Some(snooze_until),
            AlertKind::Closed => self.snooze_closed_until = Some(snooze_until),
        }
        debug!(kind = ?self.popup.kind, "Popup dismissed by user, snooze started");
        self.hide();
        true
    }

    /// Expire the popup once its dismiss deadline has passed. Reads current
    /// state at fire time, so a deadline armed against a superseded popup is
    /// harmless. Returns whether the popup was dismissed on this tick.
    pub fn tick(&mut self, now: SystemTime) -> bool {
        if self.popup.visible && self.dismiss_at.is_some_and(|at| at <= now) {
            debug!(kind = ?self.popup.kind, "Popup auto-dismissed");
            self.hide();
            return true;
        }
        false
    }

    fn show(&mut self, kind: AlertKind, message: &str, now: SystemTime) {
        // A repeated identical update while visible leaves the dismiss
        // deadline alone; only a real transition re-arms it.
        if self.popup.visible && self.popup.kind == kind {
            return;
        }
        self.popup = AlertPopup {
            visible: true,
            kind,
            message: message.to_string(),
        };
        self.dismiss_at = Some(now + self.policy.popup_duration);
    }

    fn hide(&mut self) {
        self.popup.visible = false;
        self.dismiss_at = None;
    }

    fn snoozed(&self, kind: AlertKind, now: SystemTime) -> bool {
        let until = match kind {
            AlertKind::Warning => self.snooze_warning_until,
            AlertKind::Closed => self.snooze_closed_until,
        };
        until.is_some_and(|deadline| now < deadline)
    }
}

impl Default for AlertController {
    fn default() -> Self {
        Self::new(AlertPolicy::default())
    }
}

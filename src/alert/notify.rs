use tracing::info;

/// Best-effort external notification channel.
///
/// Sends must never fail: an unsupported or unpermitted host environment is
/// a silent no-op, not an error.
pub trait NotificationSink {
    fn send(&self, title: &str, body: &str, tag: &str);
}

/// Default sink: structured log lines, one per dispatched notification.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn send(&self, title: &str, body: &str, tag: &str) {
        info!(title = title, body = body, tag = tag, "Notification dispatched");
    }
}

/// Recording sink for tests: captures every send in order.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: std::sync::Mutex<Vec<(String, String, String)>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn send(&self, title: &str, body: &str, tag: &str) {
        if let Ok(mut guard) = self.sent.lock() {
            guard.push((title.to_string(), body.to_string(), tag.to_string()));
        }
    }
}

use crate::alert::classify::Classification;
use crate::alert::controller::AlertController;
use crate::alert::notify::NotificationSink;
use crate::alert::AlertPopup;
use crate::error::AppError;
use crate::feed::adapter::CanonicalReading;
use crate::registry::{RoadRegistry, RoadSegment};
use std::time::SystemTime;
use tokio::sync::watch;

/// Process-wide state behind one `Arc<RwLock<_>>`: the road registry, the
/// alert machine, and the feed connectivity indicator, each mirrored into a
/// watch channel for presentation consumers.
#[derive(Debug)]
pub struct AppState {
    registry: RoadRegistry,
    roads_tx: watch::Sender<Vec<RoadSegment>>,
    roads_rx: watch::Receiver<Vec<RoadSegment>>,
    alerts: AlertController,
    alert_tx: watch::Sender<AlertPopup>,
    alert_rx: watch::Receiver<AlertPopup>,
    connected: bool,
    connected_tx: watch::Sender<bool>,
    connected_rx: watch::Receiver<bool>,
    feed_url: String,
}

impl AppState {
    pub fn new(registry: RoadRegistry, alerts: AlertController, feed_url: String) -> Self {
        let (roads_tx, roads_rx) = watch::channel(registry.get_all().to_vec());
        let (alert_tx, alert_rx) = watch::channel(alerts.popup().clone());
        let (connected_tx, connected_rx) = watch::channel(false);
        Self {
            registry,
            roads_tx,
            roads_rx,
            alerts,
            alert_tx,
            alert_rx,
            connected: false,
            connected_tx,
            connected_rx,
            feed_url,
        }
    }

    pub fn roads(&self) -> &[RoadSegment] {
        self.registry.get_all()
    }

    pub fn road(&self, id: u32) -> Option<&RoadSegment> {
        self.registry.get(id)
    }

    pub fn subscribe_roads(&self) -> watch::Receiver<Vec<RoadSegment>> {
        self.roads_tx.subscribe()
    }

    pub fn alerts(&self) -> &AlertController {
        &self.alerts
    }

    pub fn subscribe_alert(&self) -> watch::Receiver<AlertPopup> {
        self.alert_tx.subscribe()
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn subscribe_connected(&self) -> watch::Receiver<bool> {
        self.connected_tx.subscribe()
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn set_feed_url(&mut self, url: String) {
        self.feed_url = url;
    }

    pub fn set_connected(&mut self, connected: bool) -> Result<(), AppError> {
        self.connected = connected;
        self.connected_tx
            .send(connected)
            .map_err(|_| AppError::WatchSend)
    }

    /// Run one classified reading through the alert machine and the
    /// registry, then publish both snapshots.
    pub fn apply_classified_reading(
        &mut self,
        id: u32,
        reading: &CanonicalReading,
        classification: Classification,
        now: SystemTime,
        sink: &dyn NotificationSink,
    ) -> Result<Option<RoadSegment>, AppError> {
        self.alerts
            .apply(classification, reading.vehicle_count, now, sink);
        let policy = self.alerts.policy().clone();
        let updated = self
            .registry
            .apply_reading(id, reading, &classification, &policy, now);

        self.publish_alert()?;
        if updated.is_some() {
            self.publish_roads()?;
        }
        Ok(updated)
    }

    /// User close action. Returns whether a popup was actually dismissed.
    pub fn dismiss_alert(&mut self, now: SystemTime) -> Result<bool, AppError> {
        let dismissed = self.alerts.dismiss(now);
        if dismissed {
            self.publish_alert()?;
        }
        Ok(dismissed)
    }

    /// Expire the popup if its auto-dismiss deadline has passed.
    pub fn tick_alerts(&mut self, now: SystemTime) -> Result<bool, AppError> {
        let dismissed = self.alerts.tick(now);
        if dismissed {
            self.publish_alert()?;
        }
        Ok(dismissed)
    }

    fn publish_roads(&self) -> Result<(), AppError> {
        self.roads_tx
            .send(self.registry.get_all().to_vec())
            .map_err(|_| AppError::WatchSend)
    }

    fn publish_alert(&self) -> Result<(), AppError> {
        self.alert_tx
            .send(self.alerts.popup().clone())
            .map_err(|_| AppError::WatchSend)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            RoadRegistry::with_seed(),
            AlertController::default(),
            String::new(),
        )
    }
}

//! Monitored road segments.
//!
//! Seeded once at startup; only the live-linked segment is replaced on feed
//! updates. Occupancy-derived values are computed on demand, never stored.

use crate::alert::classify::Classification;
use crate::alert::{AlertPolicy, GateStatus};
use crate::feed::adapter::CanonicalReading;
use serde::Serialize;
use std::time::SystemTime;

/// Segment receiving live sensor updates in the current deployment.
pub const DEFAULT_LIVE_SEGMENT_ID: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    pub id: u32,
    pub name: String,
    pub location: String,
    pub capacity: u32,
    pub current_vehicles: u32,
    pub gate_status: GateStatus,
    pub center: GeoPoint,
    pub path: Vec<GeoPoint>,
    pub avg_green_secs: Option<f64>,
    /// Present only while the gate is force-closed. Informational: reopening
    /// is announced, not enforced.
    pub reopen_deadline: Option<SystemTime>,
    /// Last raw sensor payload, kept opaque for display.
    pub sensors: Option<serde_json::Value>,
}

impl RoadSegment {
    pub fn occupancy_percent(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.current_vehicles as f64 / self.capacity as f64) * 100.0
    }

    pub fn congestion_level(&self) -> CongestionLevel {
        let percent = self.occupancy_percent();
        if percent >= 80.0 {
            CongestionLevel::High
        } else if percent >= 60.0 {
            CongestionLevel::Medium
        } else {
            CongestionLevel::Low
        }
    }
}

#[derive(Debug)]
pub struct RoadRegistry {
    roads: Vec<RoadSegment>,
}

impl RoadRegistry {
    pub fn new(roads: Vec<RoadSegment>) -> Self {
        Self { roads }
    }

    /// Registry seeded with the 6th of October to Tahrir corridor.
    pub fn with_seed() -> Self {
        Self::new(seed_roads())
    }

    pub fn get_all(&self) -> &[RoadSegment] {
        &self.roads
    }

    pub fn get(&self, id: u32) -> Option<&RoadSegment> {
        self.roads.iter().find(|road| road.id == id)
    }

    /// Replace the volatile fields of the segment matching `id` from a
    /// classified reading. Identity and geometry are untouched. Unknown ids
    /// are a no-op returning `None`.
    pub fn apply_reading(
        &mut self,
        id: u32,
        reading: &CanonicalReading,
        classification: &Classification,
        policy: &AlertPolicy,
        now: SystemTime,
    ) -> Option<RoadSegment> {
        let segment = self.roads.iter_mut().find(|road| road.id == id)?;

        // Set once per entry into Closed, cleared as soon as the count drops
        // back below the threshold. Not refreshed while Closed persists.
        let reopen_deadline = if reading.vehicle_count >= policy.closed_threshold {
            segment
                .reopen_deadline
                .or(Some(now + policy.reopen_after))
        } else {
            None
        };

        let updated = RoadSegment {
            current_vehicles: reading.vehicle_count,
            gate_status: classification.gate_status,
            avg_green_secs: reading.avg_green_secs,
            reopen_deadline,
            sensors: reading.sensors.clone(),
            ..segment.clone()
        };
        *segment = updated.clone();
        Some(updated)
    }
}

impl Default for RoadRegistry {
    fn default() -> Self {
        Self::with_seed()
    }
}

fn seed_roads() -> Vec<RoadSegment> {
    vec![
        RoadSegment {
            id: 1,
            name: "26th of July Corridor".to_string(),
            location: "Toward Lebanon Square".to_string(),
            capacity: 200,
            current_vehicles: 180,
            gate_status: GateStatus::Open,
            center: GeoPoint::new(30.0350, 31.0800),
            path: vec![
                GeoPoint::new(30.0074, 30.9733),
                GeoPoint::new(30.0300, 31.0200),
                GeoPoint::new(30.0500, 31.1300),
                GeoPoint::new(30.0550, 31.1800),
            ],
            avg_green_secs: Some(10.0),
            reopen_deadline: None,
            sensors: None,
        },
        RoadSegment {
            id: 2,
            name: "Arab League Street".to_string(),
            location: "Mohandessin".to_string(),
            capacity: 120,
            current_vehicles: 60,
            gate_status: GateStatus::Open,
            center: GeoPoint::new(30.0511, 31.2000),
            path: vec![
                GeoPoint::new(30.0550, 31.1800),
                GeoPoint::new(30.0511, 31.2000),
                GeoPoint::new(30.0469, 31.2100),
            ],
            avg_green_secs: Some(15.0),
            reopen_deadline: None,
            sensors: None,
        },
        RoadSegment {
            id: 3,
            name: "6th of October Bridge".to_string(),
            location: "Above Zamalek".to_string(),
            capacity: 180,
            current_vehicles: 170,
            gate_status: GateStatus::Closed,
            center: GeoPoint::new(30.0469, 31.2290),
            path: vec![
                GeoPoint::new(30.0469, 31.2100),
                GeoPoint::new(30.0520, 31.2250),
                GeoPoint::new(30.0469, 31.2290),
                GeoPoint::new(30.0450, 31.2330),
            ],
            avg_green_secs: Some(12.0),
            reopen_deadline: None,
            sensors: None,
        },
        RoadSegment {
            id: 4,
            name: "Wahat Road".to_string(),
            location: "6th of October entrance".to_string(),
            capacity: 80,
            current_vehicles: 5,
            gate_status: GateStatus::Open,
            center: GeoPoint::new(29.9800, 31.0200),
            path: vec![
                GeoPoint::new(29.9600, 30.9400),
                GeoPoint::new(29.9800, 31.0200),
                GeoPoint::new(30.0000, 31.1000),
            ],
            avg_green_secs: Some(5.0),
            reopen_deadline: None,
            sensors: None,
        },
        RoadSegment {
            id: 5,
            name: "Qasr El Nil Bridge".to_string(),
            location: "Downtown".to_string(),
            capacity: 100,
            current_vehicles: 80,
            gate_status: GateStatus::Open,
            center: GeoPoint::new(30.0435, 31.2285),
            path: vec![
                GeoPoint::new(30.0430, 31.2200),
                GeoPoint::new(30.0435, 31.2285),
                GeoPoint::new(30.0444, 31.2357),
            ],
            avg_green_secs: Some(10.0),
            reopen_deadline: None,
            sensors: None,
        },
    ]
}

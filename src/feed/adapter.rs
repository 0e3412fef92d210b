//! Normalization of raw feed payloads.
//!
//! The upstream payload shape is not controlled by this service: readings may
//! arrive nested under the segment-id key or flat, and field names vary by
//! firmware revision. Each logical value is probed through an ordered list of
//! accessor attempts; every accessor is total, and anything unusable degrades
//! to the previously known value. A reading can never regress a field to
//! missing.

use crate::alert::GateStatus;
use crate::registry::RoadSegment;
use serde_json::Value;

/// Normalized sensor values used by the classifier, independent of the
/// upstream payload shape. Ephemeral: derived once per feed update.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalReading {
    pub avg_green_secs: Option<f64>,
    pub vehicle_count: u32,
    pub gate_closed_hint: bool,
    pub sensors: Option<Value>,
}

/// Produce a canonical reading for `segment_id` from an arbitrary payload.
pub fn normalize(raw: &Value, segment_id: u32, prev: &RoadSegment) -> CanonicalReading {
    // Nested form keys the segment data under its id; otherwise the payload
    // itself is the segment data.
    let scoped = raw.get(segment_id.to_string()).unwrap_or(raw);

    let avg_green_secs = number_at(scoped, &["color", "avgGreen"])
        .or_else(|| number_at(scoped, &["avgGreen"]))
        .or(prev.avg_green_secs);

    let vehicle_count = count_at(scoped, &["gate", "carCount"])
        .or_else(|| count_at(scoped, &["currentVehicles"]))
        .or_else(|| count_at(scoped, &["Vehicles"]))
        .unwrap_or(prev.current_vehicles);

    let gate_closed_hint = bool_at(scoped, &["gate", "isClosed"])
        .or_else(|| closed_status_at(scoped, &["gateStatus"]))
        .unwrap_or(prev.gate_status == GateStatus::Closed);

    let sensors = scoped
        .get("sensors")
        .filter(|value| !value.is_null())
        .cloned()
        .or_else(|| prev.sensors.clone());

    CanonicalReading {
        avg_green_secs,
        vehicle_count,
        gate_closed_hint,
        sensors,
    }
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Numeric field: JSON number or numeric string (the ESP32 feed is loosely
/// typed). Anything else falls through to the next candidate.
fn number_at(value: &Value, path: &[&str]) -> Option<f64> {
    match value_at(value, path)? {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Vehicle counts are non-negative integers; garbage values are unusable
/// rather than clamped, so the probe moves on.
fn count_at(value: &Value, path: &[&str]) -> Option<u32> {
    let number = number_at(value, path)?;
    if number < 0.0 {
        return None;
    }
    Some(number.round() as u32)
}

fn bool_at(value: &Value, path: &[&str]) -> Option<bool> {
    match value_at(value, path)? {
        Value::Bool(b) => Some(*b),
        // Firmware sometimes reports flags as 0/1.
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

fn closed_status_at(value: &Value, path: &[&str]) -> Option<bool> {
    match value_at(value, path)? {
        Value::String(s) => Some(s.eq_ignore_ascii_case("closed")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RoadRegistry;
    use serde_json::json;

    fn previous() -> RoadSegment {
        let mut segment = RoadRegistry::with_seed().get(4).expect("segment 4").clone();
        segment.current_vehicles = 6;
        segment.avg_green_secs = Some(5.0);
        segment.sensors = Some(json!({"lane": 1}));
        segment
    }

    #[test]
    fn nested_payload_is_scoped_by_segment_id() {
        let raw = json!({
            "4": {
                "gate": { "carCount": 9, "isClosed": true },
                "color": { "avgGreen": 12 }
            }
        });

        let reading = normalize(&raw, 4, &previous());

        assert_eq!(reading.vehicle_count, 9);
        assert_eq!(reading.avg_green_secs, Some(12.0));
        assert!(reading.gate_closed_hint);
    }

    #[test]
    fn flat_payload_uses_top_level_fields() {
        let raw = json!({
            "currentVehicles": 11,
            "avgGreen": 8,
            "gateStatus": "closed"
        });

        let reading = normalize(&raw, 4, &previous());

        assert_eq!(reading.vehicle_count, 11);
        assert_eq!(reading.avg_green_secs, Some(8.0));
        assert!(reading.gate_closed_hint);
    }

    #[test]
    fn field_precedence_prefers_nested_gate_count() {
        let raw = json!({
            "gate": { "carCount": 3 },
            "currentVehicles": 7,
            "Vehicles": 9
        });

        assert_eq!(normalize(&raw, 4, &previous()).vehicle_count, 3);

        let raw = json!({ "currentVehicles": 7, "Vehicles": 9 });
        assert_eq!(normalize(&raw, 4, &previous()).vehicle_count, 7);

        let raw = json!({ "Vehicles": 9 });
        assert_eq!(normalize(&raw, 4, &previous()).vehicle_count, 9);
    }

    #[test]
    fn missing_fields_fall_back_to_previous_values() {
        let reading = normalize(&json!({}), 4, &previous());

        assert_eq!(reading.vehicle_count, 6);
        assert_eq!(reading.avg_green_secs, Some(5.0));
        assert!(!reading.gate_closed_hint);
        assert_eq!(reading.sensors, Some(json!({"lane": 1})));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let raw = json!({ "currentVehicles": "10", "avgGreen": " 6.5 " });

        let reading = normalize(&raw, 4, &previous());

        assert_eq!(reading.vehicle_count, 10);
        assert_eq!(reading.avg_green_secs, Some(6.5));
    }

    #[test]
    fn garbage_values_fall_through_to_next_candidate() {
        let raw = json!({
            "gate": { "carCount": "not-a-number" },
            "currentVehicles": -2,
            "Vehicles": 4
        });

        assert_eq!(normalize(&raw, 4, &previous()).vehicle_count, 4);

        // No candidate usable at all: unchanged from last known.
        let raw = json!({ "currentVehicles": {"nested": true} });
        assert_eq!(normalize(&raw, 4, &previous()).vehicle_count, 6);
    }

    #[test]
    fn gate_hint_accepts_numeric_flag() {
        let raw = json!({ "gate": { "isClosed": 1 } });
        assert!(normalize(&raw, 4, &previous()).gate_closed_hint);

        let raw = json!({ "gate": { "isClosed": 0 } });
        assert!(!normalize(&raw, 4, &previous()).gate_closed_hint);
    }

    #[test]
    fn gate_hint_falls_back_to_previous_gate_status() {
        let mut prev = previous();
        prev.gate_status = GateStatus::Closed;

        assert!(normalize(&json!({}), 4, &prev).gate_closed_hint);
    }

    #[test]
    fn sensors_payload_replaces_and_persists() {
        let raw = json!({ "sensors": {"lane": 2, "speed": 40} });
        let reading = normalize(&raw, 4, &previous());
        assert_eq!(reading.sensors, Some(json!({"lane": 2, "speed": 40})));

        let reading = normalize(&json!({ "sensors": null }), 4, &previous());
        assert_eq!(reading.sensors, Some(json!({"lane": 1})));
    }
}

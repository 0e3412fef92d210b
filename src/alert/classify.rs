use crate::alert::{AlertPolicy, GateStatus, Severity};
use crate::feed::adapter::CanonicalReading;

/// Result of classifying one canonical reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub severity: Severity,
    pub gate_status: GateStatus,
}

/// Map a reading to a severity and derived gate status.
///
/// Ordered policy, first match wins. Every update is reclassified from
/// scratch; suppression statefulness lives in the alert controller, not here.
pub fn classify(reading: &CanonicalReading, policy: &AlertPolicy) -> Classification {
    let hinted = if reading.gate_closed_hint {
        GateStatus::Closed
    } else {
        GateStatus::Open
    };

    if reading.vehicle_count >= policy.closed_threshold {
        // Saturated: the gate reads closed no matter what the hint says.
        Classification {
            severity: Severity::Closed,
            gate_status: GateStatus::Closed,
        }
    } else if reading.vehicle_count >= policy.warning_threshold {
        Classification {
            severity: Severity::Warning,
            gate_status: hinted,
        }
    } else {
        Classification {
            severity: Severity::None,
            gate_status: hinted,
        }
    }
}

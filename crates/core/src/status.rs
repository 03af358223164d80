//! Appointment lifecycle state machine.
//!
//! Every status change in the system goes through [`AppointmentStatus::apply`]. Store
//! primitives call it while holding their lock, so an illegal transition is rejected in one
//! place regardless of which operation attempted it.
//!
//! ```text
//!                 Approve               Complete
//! pending_request ───────▶ approved ───────────▶ completed
//!    │   │  ▲ Reschedule    │  ▲ Reschedule / AttachPrescription
//!    │   │  └──────┘        │  └──────┘
//!    │   │ Reject           │ Cancel
//!    │   ▼                  ▼
//!    │ rejected          cancelled
//!    └── Cancel ───────────▶ cancelled
//! ```
//!
//! Older records may carry the statuses `pending` and `confirmed`. They are accepted on input
//! and mapped onto `pending_request` and `approved`; they are never written back.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Canonical appointment status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Submitted by a patient, waiting for doctor triage. Occupies slot capacity.
    #[serde(alias = "pending")]
    PendingRequest,
    /// In the slot's queue with a serial number. Occupies slot capacity.
    #[serde(alias = "confirmed")]
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

/// Something that happens to an appointment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Approve,
    Reject,
    Complete,
    Cancel,
    Reschedule,
    AttachPrescription,
}

/// A `(status, event)` pair that the state machine does not allow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event} an appointment that is {from}")]
pub struct TransitionError {
    pub from: AppointmentStatus,
    pub event: LifecycleEvent,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::PendingRequest,
        AppointmentStatus::Approved,
        AppointmentStatus::Rejected,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    /// Statuses that count towards a slot's capacity.
    pub const OCCUPYING: [AppointmentStatus; 2] =
        [AppointmentStatus::PendingRequest, AppointmentStatus::Approved];

    /// Returns the status reached by applying `event`, or the reason it is not allowed.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] for every pair not listed in the module diagram.
    pub fn apply(self, event: LifecycleEvent) -> Result<AppointmentStatus, TransitionError> {
        use AppointmentStatus::*;
        use LifecycleEvent::*;

        match (self, event) {
            (PendingRequest, Approve) => Ok(Approved),
            (PendingRequest, Reject) => Ok(Rejected),
            (PendingRequest, Cancel) => Ok(Cancelled),
            (PendingRequest, Reschedule) => Ok(PendingRequest),
            (Approved, Complete) => Ok(Completed),
            (Approved, Cancel) => Ok(Cancelled),
            (Approved, Reschedule) => Ok(Approved),
            (Approved, AttachPrescription) => Ok(Approved),
            (from, event) => Err(TransitionError { from, event }),
        }
    }

    /// True for statuses that still hold a place in the slot (requested or queued).
    pub fn occupies_capacity(self) -> bool {
        Self::OCCUPYING.contains(&self)
    }

    /// True only for appointments holding a serial number in the live queue.
    pub fn is_queued(self) -> bool {
        self == AppointmentStatus::Approved
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected
                | AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::PendingRequest => "pending_request",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown appointment status: '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    /// Parses a status, accepting the legacy `pending`/`confirmed` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending_request" | "pending" => Ok(AppointmentStatus::PendingRequest),
            "approved" | "confirmed" => Ok(AppointmentStatus::Approved),
            "rejected" => Ok(AppointmentStatus::Rejected),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_owned())),
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            LifecycleEvent::Approve => "approve",
            LifecycleEvent::Reject => "reject",
            LifecycleEvent::Complete => "complete",
            LifecycleEvent::Cancel => "cancel",
            LifecycleEvent::Reschedule => "reschedule",
            LifecycleEvent::AttachPrescription => "attach a prescription to",
        };
        f.write_str(verb)
    }
}

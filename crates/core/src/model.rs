//! Appointment and patient-record documents.
//!
//! These are the persisted shapes. Field names serialise in camelCase to stay compatible with
//! records written by the earlier JavaScript service.

use crate::status::AppointmentStatus;
use chrono::{DateTime, Utc};
use clinic_types::{AppointmentId, EmailAddress, NonEmptyText, SlotDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifies one capacity-limited queue: a doctor, a date and a catalogue slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub doctor_email: EmailAddress,
    pub date: SlotDate,
    pub time: String,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.doctor_email, self.date, self.time)
    }
}

/// Prescription attached to an approved appointment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub diagnosis: NonEmptyText,
    pub medications: NonEmptyText,
    pub dosage: NonEmptyText,
    pub instructions: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub prescribed_by: EmailAddress,
    pub prescribed_at: DateTime<Utc>,
}

/// One appointment document.
///
/// The `patient*` fields are a snapshot taken at booking time, not a reference to the
/// patient's live profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,

    pub patient_id: NonEmptyText,
    pub patient_name: NonEmptyText,
    pub patient_email: EmailAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_gender: Option<String>,

    pub doctor_email: EmailAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    pub appointment_date: SlotDate,
    pub appointment_time: String,
    pub symptoms: NonEmptyText,

    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<Prescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            doctor_email: self.doctor_email.clone(),
            date: self.appointment_date,
            time: self.appointment_time.clone(),
        }
    }

    pub fn is_in_slot(&self, slot: &SlotKey) -> bool {
        self.doctor_email == slot.doctor_email
            && self.appointment_date == slot.date
            && self.appointment_time == slot.time
    }

    /// Booking order: `created_at`, then id. Used to renumber a slot.
    pub fn booking_order(a: &Appointment, b: &Appointment) -> Ordering {
        a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
    }

    /// Queue display order: date, time, serial (unserialised last), then booking order.
    pub fn queue_order(a: &Appointment, b: &Appointment) -> Ordering {
        let serial = |x: &Appointment| x.serial_number.unwrap_or(u32::MAX);
        a.appointment_date
            .cmp(&b.appointment_date)
            .then_with(|| a.appointment_time.cmp(&b.appointment_time))
            .then_with(|| serial(a).cmp(&serial(b)))
            .then_with(|| Appointment::booking_order(a, b))
    }
}

/// Summary of a completed visit kept in the patient record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub appointment_id: AppointmentId,
    pub date: SlotDate,
    pub time: String,
    pub symptoms: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<u32>,
    pub doctor_email: EmailAddress,
    pub doctor_name: String,
}

/// Prescription as filed in the patient record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionEntry {
    pub appointment_id: AppointmentId,
    pub appointment_date: SlotDate,
    pub diagnosis: String,
    pub medications: String,
    pub dosage: String,
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub doctor_email: EmailAddress,
    pub doctor_name: String,
    pub prescribed_at: DateTime<Utc>,
}

/// Longitudinal, append-only record of a patient's completed visits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub patient_email: EmailAddress,
    pub patient_id: String,
    pub patient_name: String,
    pub visits: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<SlotDate>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionEntry>,
    #[serde(default)]
    pub appointments: Vec<VisitSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn has_visit(&self, id: AppointmentId) -> bool {
        self.appointments.iter().any(|v| v.appointment_id == id)
    }
}

/// One row of a doctor's patient list, derived from completed appointments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: EmailAddress,
    pub visits: u32,
    pub last_visit: SlotDate,
}

/// Everything the projector needs to fold one completed appointment into a patient record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionProjection {
    pub patient_email: EmailAddress,
    pub patient_id: String,
    pub patient_name: String,
    pub visit: VisitSummary,
    pub prescription: Option<PrescriptionEntry>,
    pub at: DateTime<Utc>,
}

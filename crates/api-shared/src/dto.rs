//! Wire types for the appointment API.
//!
//! Field names are camelCase on the wire. Request types keep every field optional so that
//! missing fields reach core validation and come back as a `400` naming the field, rather
//! than failing JSON extraction.

use clinic_core::{
    Appointment, CompletionOutcome, NewAppointmentRequest, PatientRecord, PatientSummary,
    Prescription, PrescriptionEntry, PrescriptionInput, QueueChange, SlotAvailability,
    VisitSummary,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Error body returned for every failed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    /// Stable machine-readable category: `validation`, `forbidden`, `not_found`, `conflict`
    /// or `store`.
    pub kind: String,
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentReq {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_age: Option<u32>,
    pub patient_gender: Option<String>,
    pub doctor_email: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub symptoms: Option<String>,
}

impl From<CreateAppointmentReq> for NewAppointmentRequest {
    fn from(req: CreateAppointmentReq) -> Self {
        NewAppointmentRequest {
            patient_id: req.patient_id,
            patient_name: req.patient_name,
            patient_email: req.patient_email,
            patient_phone: req.patient_phone,
            patient_age: req.patient_age,
            patient_gender: req.patient_gender,
            doctor_email: req.doctor_email,
            appointment_date: req.appointment_date,
            appointment_time: req.appointment_time,
            symptoms: req.symptoms,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectReq {
    pub rejection_reason: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateReq {
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleReq {
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub symptoms: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionReq {
    pub diagnosis: Option<String>,
    pub medications: Option<String>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub follow_up: Option<String>,
    pub notes: Option<String>,
}

impl From<PrescriptionReq> for PrescriptionInput {
    fn from(req: PrescriptionReq) -> Self {
        PrescriptionInput {
            diagnosis: req.diagnosis,
            medications: req.medications,
            dosage: req.dosage,
            instructions: req.instructions,
            follow_up: req.follow_up,
            notes: req.notes,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AvailableSlotsQuery {
    pub doctor_email: Option<String>,
    pub date: Option<String>,
    pub exclude_appointment_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CheckSlotQuery {
    pub doctor_email: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub exclude_appointment_id: Option<String>,
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRes {
    pub diagnosis: String,
    pub medications: String,
    pub dosage: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub prescribed_by: String,
    pub prescribed_at: String,
}

impl From<&Prescription> for PrescriptionRes {
    fn from(p: &Prescription) -> Self {
        PrescriptionRes {
            diagnosis: p.diagnosis.to_string(),
            medications: p.medications.to_string(),
            dosage: p.dosage.to_string(),
            instructions: p.instructions.to_string(),
            follow_up: p.follow_up.clone(),
            notes: p.notes.clone(),
            prescribed_by: p.prescribed_by.to_string(),
            prescribed_at: p.prescribed_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRes {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_gender: Option<String>,
    pub doctor_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub symptoms: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<u32>,
    /// Estimated consultation start (`HH:MM`) for approved appointments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<PrescriptionRes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<String>,
    pub updated_at: String,
}

impl AppointmentRes {
    /// Builds the wire form of `a`, attaching a pre-computed estimated start time.
    pub fn new(a: &Appointment, estimated_time: Option<String>) -> Self {
        AppointmentRes {
            id: a.id.to_string(),
            patient_id: a.patient_id.to_string(),
            patient_name: a.patient_name.to_string(),
            patient_email: a.patient_email.to_string(),
            patient_phone: a.patient_phone.clone(),
            patient_age: a.patient_age,
            patient_gender: a.patient_gender.clone(),
            doctor_email: a.doctor_email.to_string(),
            doctor_name: a.doctor_name.clone(),
            appointment_date: a.appointment_date.to_string(),
            appointment_time: a.appointment_time.clone(),
            symptoms: a.symptoms.to_string(),
            status: a.status.to_string(),
            serial_number: a.serial_number,
            estimated_time,
            prescription: a.prescription.as_ref().map(PrescriptionRes::from),
            rejection_reason: a.rejection_reason.clone(),
            created_at: a.created_at.to_rfc3339(),
            approved_at: a.approved_at.map(|t| t.to_rfc3339()),
            completed_at: a.completed_at.map(|t| t.to_rfc3339()),
            rejected_at: a.rejected_at.map(|t| t.to_rfc3339()),
            cancelled_at: a.cancelled_at.map(|t| t.to_rfc3339()),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListAppointmentsRes {
    pub appointments: Vec<AppointmentRes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRes {
    pub appointment_id: String,
    /// `applied`, `already_applied` or `failed`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits: Option<u32>,
}

impl From<&CompletionOutcome> for ProjectionRes {
    fn from(outcome: &CompletionOutcome) -> Self {
        ProjectionRes {
            appointment_id: outcome.appointment.id.to_string(),
            status: outcome.projection.as_str().to_string(),
            warning: outcome.projection.warning().map(str::to_string),
            visits: outcome.record.as_ref().map(|r| r.visits),
        }
    }
}

/// Result of an operation that changed an appointment's status.
///
/// `resequenced` is filled in for cancellations and reschedules; `projection` only for
/// completions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentChangeRes {
    pub appointment: AppointmentRes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resequenced: Vec<AppointmentRes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionRes>,
}

impl AppointmentChangeRes {
    pub fn appointment(appointment: AppointmentRes) -> Self {
        AppointmentChangeRes {
            appointment,
            resequenced: Vec::new(),
            projection: None,
        }
    }

    pub fn queue_change(
        change: &QueueChange,
        estimate: impl Fn(&Appointment) -> Option<String>,
    ) -> Self {
        AppointmentChangeRes {
            appointment: AppointmentRes::new(&change.appointment, estimate(&change.appointment)),
            resequenced: change
                .resequenced
                .iter()
                .map(|a| AppointmentRes::new(a, estimate(a)))
                .collect(),
            projection: None,
        }
    }

    pub fn completion(outcome: &CompletionOutcome) -> Self {
        AppointmentChangeRes {
            appointment: AppointmentRes::new(&outcome.appointment, None),
            resequenced: Vec::new(),
            projection: Some(ProjectionRes::from(outcome)),
        }
    }

    /// True when the completion went through but the patient record was not updated.
    pub fn is_partial(&self) -> bool {
        self.projection
            .as_ref()
            .is_some_and(|p| p.warning.is_some())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsRes {
    pub available_slots: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckSlotRes {
    pub available: bool,
    pub occupied: u32,
    pub capacity: u32,
}

impl From<SlotAvailability> for CheckSlotRes {
    fn from(s: SlotAvailability) -> Self {
        CheckSlotRes {
            available: s.available,
            occupied: s.occupied,
            capacity: s.capacity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummaryRes {
    pub appointment_id: String,
    pub date: String,
    pub time: String,
    pub symptoms: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<u32>,
    pub doctor_email: String,
    pub doctor_name: String,
}

impl From<&VisitSummary> for VisitSummaryRes {
    fn from(v: &VisitSummary) -> Self {
        VisitSummaryRes {
            appointment_id: v.appointment_id.to_string(),
            date: v.date.to_string(),
            time: v.time.clone(),
            symptoms: v.symptoms.clone(),
            status: v.status.to_string(),
            serial_number: v.serial_number,
            doctor_email: v.doctor_email.to_string(),
            doctor_name: v.doctor_name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionEntryRes {
    pub appointment_id: String,
    pub appointment_date: String,
    pub diagnosis: String,
    pub medications: String,
    pub dosage: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub doctor_email: String,
    pub doctor_name: String,
    pub prescribed_at: String,
}

impl From<&PrescriptionEntry> for PrescriptionEntryRes {
    fn from(p: &PrescriptionEntry) -> Self {
        PrescriptionEntryRes {
            appointment_id: p.appointment_id.to_string(),
            appointment_date: p.appointment_date.to_string(),
            diagnosis: p.diagnosis.clone(),
            medications: p.medications.clone(),
            dosage: p.dosage.clone(),
            instructions: p.instructions.clone(),
            follow_up: p.follow_up.clone(),
            notes: p.notes.clone(),
            doctor_email: p.doctor_email.to_string(),
            doctor_name: p.doctor_name.clone(),
            prescribed_at: p.prescribed_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecordRes {
    pub patient_email: String,
    pub patient_id: String,
    pub patient_name: String,
    pub visits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<String>,
    pub prescriptions: Vec<PrescriptionEntryRes>,
    pub appointments: Vec<VisitSummaryRes>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&PatientRecord> for PatientRecordRes {
    fn from(r: &PatientRecord) -> Self {
        PatientRecordRes {
            patient_email: r.patient_email.to_string(),
            patient_id: r.patient_id.clone(),
            patient_name: r.patient_name.clone(),
            visits: r.visits,
            last_visit: r.last_visit.map(|d| d.to_string()),
            prescriptions: r.prescriptions.iter().map(PrescriptionEntryRes::from).collect(),
            appointments: r.appointments.iter().map(VisitSummaryRes::from).collect(),
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummaryRes {
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: String,
    pub visits: u32,
    pub last_visit: String,
}

impl From<&PatientSummary> for PatientSummaryRes {
    fn from(p: &PatientSummary) -> Self {
        PatientSummaryRes {
            patient_id: p.patient_id.clone(),
            patient_name: p.patient_name.clone(),
            patient_email: p.patient_email.to_string(),
            visits: p.visits,
            last_visit: p.last_visit.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DoctorPatientsRes {
    pub patients: Vec<PatientSummaryRes>,
}

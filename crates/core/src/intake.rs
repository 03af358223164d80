//! Request intake: validating and persisting a new appointment request.

use crate::directory::UserRole;
use crate::model::Appointment;
use crate::service::AppointmentService;
use crate::status::AppointmentStatus;
use crate::store::{AppointmentStore, InsertOutcome, PatientRecordStore};
use crate::validation::{
    catalogue_slot, known_doctor, optional_text, required_date, required_email, required_text,
};
use crate::{AppointmentError, AppointmentResult};
use chrono::Utc;
use clinic_types::AppointmentId;

/// A booking request as submitted by a patient, before validation.
#[derive(Clone, Debug, Default)]
pub struct NewAppointmentRequest {
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

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Validates a booking request and stores it as `pending_request`.
    ///
    /// Capacity is not checked here; it is enforced when the doctor approves.
    ///
    /// # Arguments
    ///
    /// * `requester_id` - Opaque user id of the caller, resolved through the identity provider.
    /// * `request` - The raw booking fields.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` / `UnknownDoctor` for missing or malformed fields.
    /// - `PatientNotFound` if the requester does not resolve.
    /// - `UnauthorisedRole` if the requester is not a patient, or books for another patient or
    ///   under another patient's email.
    /// - `DuplicateRequest` if the patient already holds an active booking in the slot.
    pub async fn request_appointment(
        &self,
        requester_id: &str,
        request: NewAppointmentRequest,
    ) -> AppointmentResult<Appointment> {
        let patient_id = required_text("patientId", request.patient_id.as_deref())?;
        let patient_name = required_text("patientName", request.patient_name.as_deref())?;
        let patient_email = required_email("patientEmail", request.patient_email.as_deref())?;
        let appointment_date =
            required_date("appointmentDate", request.appointment_date.as_deref())?;
        let appointment_time = catalogue_slot(&self.cfg, request.appointment_time.as_deref())?;
        let symptoms = required_text("symptoms", request.symptoms.as_deref())?;
        let doctor_email = known_doctor(&self.cfg, request.doctor_email.as_deref())?;

        let requester = self
            .identities
            .resolve(requester_id)
            .await?
            .ok_or_else(|| AppointmentError::PatientNotFound(requester_id.to_string()))?;
        if requester.role != UserRole::Patient {
            return Err(AppointmentError::UnauthorisedRole(format!(
                "only patients may book appointments, caller is a {}",
                requester.role
            )));
        }
        if requester.user_id != patient_id.as_str() {
            return Err(AppointmentError::UnauthorisedRole(
                "patients may only book for themselves".into(),
            ));
        }
        if requester.email != patient_email {
            return Err(AppointmentError::UnauthorisedRole(
                "patientEmail does not match the caller's account".into(),
            ));
        }

        let doctor_name = self.doctor_display_name(&doctor_email).await;
        let now = Utc::now();
        let appointment = Appointment {
            id: AppointmentId::generate(),
            patient_id,
            patient_name,
            patient_email,
            patient_phone: optional_text(request.patient_phone),
            patient_age: request.patient_age,
            patient_gender: optional_text(request.patient_gender),
            doctor_email,
            doctor_name: Some(doctor_name),
            appointment_date,
            appointment_time,
            symptoms,
            status: AppointmentStatus::PendingRequest,
            serial_number: None,
            prescription: None,
            rejection_reason: None,
            created_at: now,
            approved_at: None,
            completed_at: None,
            rejected_at: None,
            cancelled_at: None,
            updated_at: now,
        };

        match self.store.insert_unless_duplicate(appointment).await? {
            InsertOutcome::Inserted(appointment) => {
                tracing::info!(
                    "appointment {} requested for {}",
                    appointment.id,
                    appointment.slot_key()
                );
                Ok(appointment)
            }
            InsertOutcome::Duplicate(existing) => {
                tracing::debug!("duplicate request blocked by {}", existing);
                Err(AppointmentError::DuplicateRequest)
            }
        }
    }
}

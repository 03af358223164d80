//! Prescriptions on approved appointments.

use crate::model::{Appointment, Prescription};
use crate::service::AppointmentService;
use crate::status::LifecycleEvent;
use crate::store::{AppointmentPatch, AppointmentStore, PatientRecordStore, TransitionOutcome};
use crate::validation::{optional_text, parse_appointment_id, required_text};
use crate::{AppointmentError, AppointmentResult};
use chrono::Utc;

/// Prescription fields as entered by the doctor.
#[derive(Clone, Debug, Default)]
pub struct PrescriptionInput {
    pub diagnosis: Option<String>,
    pub medications: Option<String>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub follow_up: Option<String>,
    pub notes: Option<String>,
}

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Attaches (or replaces) the prescription on an approved appointment.
    ///
    /// The prescribing doctor is the appointment's doctor.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if diagnosis, medications, dosage or instructions is blank.
    /// - `NotFound` if there is no such appointment.
    /// - `NotActive` if the appointment is not approved.
    pub async fn attach_prescription(
        &self,
        id: &str,
        input: PrescriptionInput,
    ) -> AppointmentResult<Appointment> {
        let id = parse_appointment_id(id)?;
        let diagnosis = required_text("diagnosis", input.diagnosis.as_deref())?;
        let medications = required_text("medications", input.medications.as_deref())?;
        let dosage = required_text("dosage", input.dosage.as_deref())?;
        let instructions = required_text("instructions", input.instructions.as_deref())?;

        let current = self.require(id).await?;
        let patch = AppointmentPatch {
            prescription: Some(Prescription {
                diagnosis,
                medications,
                dosage,
                instructions,
                follow_up: optional_text(input.follow_up),
                notes: optional_text(input.notes),
                prescribed_by: current.doctor_email,
                prescribed_at: Utc::now(),
            }),
            ..AppointmentPatch::default()
        };

        match self
            .store
            .transition(id, LifecycleEvent::AttachPrescription, patch, Utc::now())
            .await?
        {
            TransitionOutcome::Applied(appointment) => {
                tracing::info!("prescription attached to appointment {}", id);
                Ok(appointment)
            }
            TransitionOutcome::NotFound => Err(AppointmentError::NotFound(id)),
            TransitionOutcome::Illegal(_) => Err(AppointmentError::NotActive(id)),
        }
    }
}

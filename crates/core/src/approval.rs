//! Approval and rejection of pending requests.

use crate::constants::NO_REASON_PROVIDED;
use crate::model::Appointment;
use crate::service::AppointmentService;
use crate::status::LifecycleEvent;
use crate::store::{
    AppointmentPatch, AppointmentStore, ApproveOutcome, PatientRecordStore, TransitionOutcome,
};
use crate::validation::{optional_text, parse_appointment_id};
use crate::{AppointmentError, AppointmentResult};
use chrono::Utc;

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Moves a pending request into its slot's queue with the next serial number.
    ///
    /// # Errors
    ///
    /// - `QueueFull` if the slot already holds the configured number of approved appointments.
    /// - `NotFoundOrAlreadyProcessed` if the appointment is missing or not pending.
    pub async fn approve(&self, id: &str) -> AppointmentResult<Appointment> {
        let id = parse_appointment_id(id)?;
        let capacity = self.cfg.slot_capacity();

        match self
            .store
            .approve_within_capacity(id, capacity, Utc::now())
            .await?
        {
            ApproveOutcome::Approved(appointment) => {
                tracing::info!(
                    "appointment {} approved with serial {:?}",
                    appointment.id,
                    appointment.serial_number
                );
                Ok(appointment)
            }
            ApproveOutcome::QueueFull { slot, approved } => {
                tracing::info!("approval of {} refused: {} is full ({})", id, slot, approved);
                Err(AppointmentError::QueueFull {
                    slot: slot.to_string(),
                    capacity,
                })
            }
            ApproveOutcome::NotPending => Err(AppointmentError::NotFoundOrAlreadyProcessed(id)),
        }
    }

    /// Rejects a pending request. A blank or missing reason is recorded as
    /// `"No reason provided"`.
    pub async fn reject(&self, id: &str, reason: Option<String>) -> AppointmentResult<Appointment> {
        let id = parse_appointment_id(id)?;
        let patch = AppointmentPatch {
            rejection_reason: Some(
                optional_text(reason).unwrap_or_else(|| NO_REASON_PROVIDED.to_string()),
            ),
            ..AppointmentPatch::default()
        };

        match self
            .store
            .transition(id, LifecycleEvent::Reject, patch, Utc::now())
            .await?
        {
            TransitionOutcome::Applied(appointment) => {
                tracing::info!("appointment {} rejected", appointment.id);
                Ok(appointment)
            }
            TransitionOutcome::NotFound | TransitionOutcome::Illegal(_) => {
                Err(AppointmentError::NotFoundOrAlreadyProcessed(id))
            }
        }
    }
}

//! Moving an appointment to another slot.

use crate::service::AppointmentService;
use crate::store::{AppointmentStore, PatientRecordStore, RescheduleCommit, RescheduleOutcome};
use crate::validation::{catalogue_slot, optional_text, parse_appointment_id, required_date};
use crate::{AppointmentError, AppointmentResult, QueueChange};
use chrono::Utc;
use clinic_types::NonEmptyText;

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Moves a pending or approved appointment to `(date, time)`, optionally updating its
    /// symptoms.
    ///
    /// The target slot's capacity is checked without counting the appointment itself. An
    /// approved appointment that changes slot joins the back of the new queue and the old
    /// slot is renumbered in the same store operation; staying in the same slot keeps its
    /// serial.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a bad date or a slot outside the catalogue.
    /// - `SlotUnavailable` if the target slot is full.
    /// - `NotFound` / `IllegalTransition` for missing or finished appointments.
    pub async fn reschedule(
        &self,
        id: &str,
        date: Option<&str>,
        time: Option<&str>,
        symptoms: Option<String>,
    ) -> AppointmentResult<QueueChange> {
        let id = parse_appointment_id(id)?;
        let date = required_date("appointmentDate", date)?;
        let time = catalogue_slot(&self.cfg, time)?;
        let symptoms = optional_text(symptoms)
            .map(NonEmptyText::new)
            .transpose()?;

        let commit = RescheduleCommit {
            id,
            date,
            time,
            symptoms,
            capacity: self.cfg.slot_capacity(),
            at: Utc::now(),
        };
        let target = format!("{} {}", commit.date, commit.time);

        match self.store.reschedule_within_capacity(commit).await? {
            RescheduleOutcome::Rescheduled {
                appointment,
                resequenced,
            } => {
                tracing::info!("appointment {} rescheduled to {}", id, appointment.slot_key());
                Ok(QueueChange {
                    appointment,
                    resequenced,
                })
            }
            RescheduleOutcome::SlotFull { occupied } => {
                tracing::info!("reschedule of {} refused: {} has {} booked", id, target, occupied);
                Err(AppointmentError::SlotUnavailable { slot: target })
            }
            RescheduleOutcome::NotFound => Err(AppointmentError::NotFound(id)),
            RescheduleOutcome::Illegal(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::status::AppointmentStatus;
    use crate::test_support::{harness, DATE};
    use crate::AppointmentError;

    #[tokio::test]
    async fn pending_request_moves_and_keeps_status() {
        let h = harness(4);
        let a = h.book("uid-0", "09:00-10:00").await;
        let change = h
            .service
            .reschedule(
                &a.id.to_string(),
                Some("2024-06-04"),
                Some("14:00-15:00"),
                Some("worse cough".into()),
            )
            .await
            .unwrap();

        let moved = change.appointment;
        assert_eq!(moved.status, AppointmentStatus::PendingRequest);
        assert_eq!(moved.appointment_date.to_string(), "2024-06-04");
        assert_eq!(moved.appointment_time, "14:00-15:00");
        assert_eq!(moved.symptoms.as_str(), "worse cough");
        assert_eq!(moved.created_at, a.created_at);
        assert!(change.resequenced.is_empty());
    }

    #[tokio::test]
    async fn approved_appointment_leaves_old_queue_and_joins_new_one() {
        let h = harness(4);
        let first = h.book_approved("uid-0", "09:00-10:00").await;
        let second = h.book_approved("uid-1", "09:00-10:00").await;
        h.book_approved("uid-2", "10:00-11:00").await;

        let change = h
            .service
            .reschedule(&first.id.to_string(), Some(DATE), Some("10:00-11:00"), None)
            .await
            .unwrap();

        assert_eq!(change.appointment.status, AppointmentStatus::Approved);
        assert_eq!(change.appointment.serial_number, Some(2));
        assert_eq!(change.resequenced.len(), 1);
        assert_eq!(change.resequenced[0].id, second.id);
        assert_eq!(change.resequenced[0].serial_number, Some(1));
    }

    #[tokio::test]
    async fn same_slot_keeps_serial_even_when_full() {
        let h = harness(2);
        h.book_approved("uid-0", "09:00-10:00").await;
        let second = h.book_approved("uid-1", "09:00-10:00").await;

        let change = h
            .service
            .reschedule(
                &second.id.to_string(),
                Some(DATE),
                Some("09:00-10:00"),
                Some("fever".into()),
            )
            .await
            .unwrap();
        assert_eq!(change.appointment.serial_number, Some(2));
        assert_eq!(change.appointment.symptoms.as_str(), "fever");
    }

    #[tokio::test]
    async fn full_target_slot_is_refused() {
        let h = harness(2);
        h.book("uid-0", "10:00-11:00").await;
        h.book_approved("uid-1", "10:00-11:00").await;
        let mover = h.book("uid-2", "09:00-10:00").await;

        let err = h
            .service
            .reschedule(&mover.id.to_string(), Some(DATE), Some("10:00-11:00"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppointmentError::SlotUnavailable { .. }));
        assert_eq!(
            h.service.require(mover.id).await.unwrap().appointment_time,
            "09:00-10:00"
        );
    }

    #[tokio::test]
    async fn finished_or_invalid_reschedules_fail() {
        let h = harness(4);
        let a = h.book("uid-0", "09:00-10:00").await;
        let id = a.id.to_string();

        assert!(matches!(
            h.service
                .reschedule(&id, Some("tomorrow"), Some("10:00-11:00"), None)
                .await,
            Err(AppointmentError::InvalidInput(_))
        ));
        assert!(matches!(
            h.service
                .reschedule(&id, Some(DATE), Some("22:00-23:00"), None)
                .await,
            Err(AppointmentError::InvalidInput(_))
        ));

        h.service.reject(&id, None).await.unwrap();
        assert!(matches!(
            h.service
                .reschedule(&id, Some(DATE), Some("10:00-11:00"), None)
                .await,
            Err(AppointmentError::IllegalTransition(_))
        ));
    }
}

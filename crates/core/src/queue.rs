//! Cancellation, resequencing and read-only queue views.

use crate::config::parse_slot_label;
use crate::model::{Appointment, PatientRecord, PatientSummary, SlotKey};
use crate::service::AppointmentService;
use crate::status::AppointmentStatus;
use crate::store::{AppointmentFilter, AppointmentStore, CancelOutcome, PatientRecordStore};
use crate::validation::{
    catalogue_slot, known_doctor, parse_appointment_id, required_date, required_email,
    required_text,
};
use crate::{AppointmentError, AppointmentResult};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

/// An appointment that left (or moved within) a queue, with the slot it left renumbered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueChange {
    pub appointment: Appointment,
    /// The remaining approved appointments of the vacated slot, in serial order.
    pub resequenced: Vec<Appointment>,
}

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Cancels a pending or approved appointment and renumbers its slot in the same store
    /// operation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if there is no such appointment.
    /// - `IllegalTransition` if it is already rejected, completed or cancelled.
    pub async fn cancel(&self, id: &str) -> AppointmentResult<QueueChange> {
        let id = parse_appointment_id(id)?;

        match self.store.cancel_and_resequence(id, Utc::now()).await? {
            CancelOutcome::Cancelled {
                appointment,
                resequenced,
            } => {
                tracing::info!(
                    "appointment {} cancelled, {} left in {}",
                    appointment.id,
                    resequenced.len(),
                    appointment.slot_key()
                );
                Ok(QueueChange {
                    appointment,
                    resequenced,
                })
            }
            CancelOutcome::NotFound => Err(AppointmentError::NotFound(id)),
            CancelOutcome::Illegal(err) => Err(err.into()),
        }
    }

    /// Renumbers a slot's approved appointments `1..N` in booking order.
    ///
    /// Safe to run at any time; running it on a consistent slot changes nothing.
    pub async fn resequence_slot(
        &self,
        doctor_email: &str,
        date: &str,
        time: &str,
    ) -> AppointmentResult<Vec<Appointment>> {
        let slot = SlotKey {
            doctor_email: known_doctor(&self.cfg, Some(doctor_email))?,
            date: required_date("appointmentDate", Some(date))?,
            time: catalogue_slot(&self.cfg, Some(time))?,
        };
        let queue = self.store.resequence_slot(&slot, Utc::now()).await?;
        tracing::info!("resequenced {} ({} approved)", slot, queue.len());
        Ok(queue)
    }

    /// Every appointment for a doctor, by date, slot and serial.
    pub async fn doctor_queue(&self, doctor_email: &str) -> AppointmentResult<Vec<Appointment>> {
        let doctor = known_doctor(&self.cfg, Some(doctor_email))?;
        let mut list = self
            .store
            .find(&AppointmentFilter::for_doctor(&doctor))
            .await?;
        list.sort_by(Appointment::queue_order);
        Ok(list)
    }

    /// A doctor's untriaged requests, oldest first.
    pub async fn pending_requests(
        &self,
        doctor_email: &str,
    ) -> AppointmentResult<Vec<Appointment>> {
        let doctor = known_doctor(&self.cfg, Some(doctor_email))?;
        let filter = AppointmentFilter::for_doctor(&doctor)
            .with_statuses(&[AppointmentStatus::PendingRequest]);
        let mut list = self.store.find(&filter).await?;
        list.sort_by(Appointment::booking_order);
        Ok(list)
    }

    pub async fn patient_appointments(
        &self,
        patient_id: &str,
    ) -> AppointmentResult<Vec<Appointment>> {
        let patient_id = required_text("patientId", Some(patient_id))?;
        let mut list = self
            .store
            .find(&AppointmentFilter::for_patient(patient_id.as_str()))
            .await?;
        list.sort_by(Appointment::queue_order);
        Ok(list)
    }

    pub async fn all_appointments(&self) -> AppointmentResult<Vec<Appointment>> {
        let mut list = self.store.find(&AppointmentFilter::default()).await?;
        list.sort_by(Appointment::queue_order);
        Ok(list)
    }

    /// Distinct patients the doctor has completed at least one visit with.
    pub async fn doctor_patients(
        &self,
        doctor_email: &str,
    ) -> AppointmentResult<Vec<PatientSummary>> {
        let doctor = known_doctor(&self.cfg, Some(doctor_email))?;
        let filter = AppointmentFilter::for_doctor(&doctor)
            .with_statuses(&[AppointmentStatus::Completed]);
        let completed = self.store.find(&filter).await?;

        let mut patients: BTreeMap<String, PatientSummary> = BTreeMap::new();
        for a in completed {
            patients
                .entry(a.patient_email.to_string())
                .and_modify(|p| {
                    p.visits += 1;
                    if a.appointment_date > p.last_visit {
                        p.last_visit = a.appointment_date;
                    }
                })
                .or_insert_with(|| PatientSummary {
                    patient_id: a.patient_id.to_string(),
                    patient_name: a.patient_name.to_string(),
                    patient_email: a.patient_email.clone(),
                    visits: 1,
                    last_visit: a.appointment_date,
                });
        }
        Ok(patients.into_values().collect())
    }

    pub async fn patient_record(&self, patient_email: &str) -> AppointmentResult<PatientRecord> {
        let email = required_email("patientEmail", Some(patient_email))?;
        self.store
            .get_record(&email)
            .await?
            .ok_or_else(|| AppointmentError::PatientRecordNotFound(email.to_string()))
    }

    /// Estimated consultation start for an approved appointment, as `HH:MM`.
    ///
    /// Slot start plus `(serial - 1)` consultations. `None` for appointments without a serial
    /// or outside the queue.
    pub fn estimated_time(&self, appointment: &Appointment) -> Option<String> {
        if !appointment.status.is_queued() {
            return None;
        }
        let serial = appointment.serial_number?;
        let (start, _) = parse_slot_label(&appointment.appointment_time)?;
        let offset = i64::from(serial.saturating_sub(1)) * i64::from(self.cfg.minutes_per_patient());
        let (time, _) = start.overflowing_add_signed(Duration::minutes(offset));
        Some(time.format("%H:%M").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, DATE, DOCTOR};

    #[tokio::test]
    async fn cancelling_serial_two_shifts_later_patients_up() {
        let h = harness(4);
        let booked = h.insert_pending_in_order("09:00-10:00", 4).await;
        for a in &booked {
            h.service.approve(&a.id.to_string()).await.unwrap();
        }

        let change = h.service.cancel(&booked[1].id.to_string()).await.unwrap();
        assert_eq!(change.appointment.status, AppointmentStatus::Cancelled);
        assert!(change.appointment.cancelled_at.is_some());

        let serials: Vec<_> = change
            .resequenced
            .iter()
            .map(|a| (a.id, a.serial_number))
            .collect();
        assert_eq!(
            serials,
            vec![
                (booked[0].id, Some(1)),
                (booked[2].id, Some(2)),
                (booked[3].id, Some(3)),
            ]
        );
        // Cancelled appointment keeps its old serial for history.
        assert_eq!(change.appointment.serial_number, Some(2));
    }

    #[tokio::test]
    async fn cancelling_a_pending_request_leaves_numbering_alone() {
        let h = harness(4);
        let approved = h.book_approved("uid-0", "09:00-10:00").await;
        let pending = h.book("uid-1", "09:00-10:00").await;

        let change = h.service.cancel(&pending.id.to_string()).await.unwrap();
        assert_eq!(change.resequenced.len(), 1);
        assert_eq!(change.resequenced[0].id, approved.id);
        assert_eq!(change.resequenced[0].serial_number, Some(1));
    }

    #[tokio::test]
    async fn cancel_errors() {
        let h = harness(4);
        let a = h.book("uid-0", "09:00-10:00").await;
        h.service.cancel(&a.id.to_string()).await.unwrap();
        assert!(matches!(
            h.service.cancel(&a.id.to_string()).await,
            Err(AppointmentError::IllegalTransition(_))
        ));
        assert!(matches!(
            h.service
                .cancel(&clinic_types::AppointmentId::generate().to_string())
                .await,
            Err(AppointmentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn capacity_holds_under_mixed_approvals_and_cancellations() {
        let h = harness(4);
        let booked = h.insert_pending_in_order("09:00-10:00", 8).await;
        let ids: Vec<String> = booked.iter().map(|a| a.id.to_string()).collect();

        for id in &ids[..4] {
            h.service.approve(id).await.unwrap();
        }
        assert!(h.service.approve(&ids[4]).await.is_err());
        h.service.cancel(&ids[0]).await.unwrap();
        h.service.cancel(&ids[2]).await.unwrap();
        h.service.approve(&ids[4]).await.unwrap();
        h.service.approve(&ids[5]).await.unwrap();
        assert!(h.service.approve(&ids[6]).await.is_err());
        h.service.cancel(&ids[3]).await.unwrap();
        h.service.approve(&ids[7]).await.unwrap();

        let queue: Vec<_> = h
            .service
            .doctor_queue(DOCTOR)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.status == AppointmentStatus::Approved)
            .collect();
        assert!(queue.len() <= 4);
        let serials: Vec<_> = queue.iter().filter_map(|a| a.serial_number).collect();
        assert_eq!(serials, (1..=queue.len() as u32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn standalone_resequence_repairs_gaps_and_is_idempotent() {
        let h = harness(4);
        let booked = h.insert_pending_in_order("09:00-10:00", 2).await;
        for a in &booked {
            h.service.approve(&a.id.to_string()).await.unwrap();
        }
        let first = h
            .service
            .resequence_slot(DOCTOR, DATE, "09:00-10:00")
            .await
            .unwrap();
        let second = h
            .service
            .resequence_slot(DOCTOR, DATE, "09:00-10:00")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].serial_number, Some(1));
        assert_eq!(first[1].serial_number, Some(2));
    }

    #[tokio::test]
    async fn views_filter_and_sort() {
        let h = harness(4);
        let later = h.book_approved("uid-0", "11:00-12:00").await;
        let earlier = h.book_approved("uid-1", "09:00-10:00").await;
        let pending = h.book("uid-2", "09:00-10:00").await;

        let queue = h.service.doctor_queue(DOCTOR).await.unwrap();
        let order: Vec<_> = queue.iter().map(|a| a.id).collect();
        assert_eq!(order, vec![earlier.id, pending.id, later.id]);

        let requests = h.service.pending_requests(DOCTOR).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, pending.id);

        let mine = h.service.patient_appointments("uid-0").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(h.service.all_appointments().await.unwrap().len(), 3);

        assert!(matches!(
            h.service.doctor_queue("dr.house@clinic.org").await,
            Err(AppointmentError::UnknownDoctor(_))
        ));
    }

    #[tokio::test]
    async fn estimated_time_follows_serial() {
        let h = harness(4);
        let first = h.book_approved("uid-0", "09:00-10:00").await;
        let second = h.book_approved("uid-1", "09:00-10:00").await;
        let third = h.book_approved("uid-2", "09:00-10:00").await;
        let pending = h.book("uid-3", "09:00-10:00").await;

        assert_eq!(h.service.estimated_time(&first).as_deref(), Some("09:00"));
        assert_eq!(h.service.estimated_time(&second).as_deref(), Some("09:15"));
        assert_eq!(h.service.estimated_time(&third).as_deref(), Some("09:30"));
        assert_eq!(h.service.estimated_time(&pending), None);
    }

    #[tokio::test]
    async fn doctor_patients_lists_completed_visits_once_per_patient() {
        let h = harness(4);
        let a = h.book_approved("uid-0", "09:00-10:00").await;
        let b = h.book_approved("uid-0", "10:00-11:00").await;
        h.book_approved("uid-1", "09:00-10:00").await;
        h.service.complete(&a.id.to_string()).await.unwrap();
        h.service.complete(&b.id.to_string()).await.unwrap();

        let patients = h.service.doctor_patients(DOCTOR).await.unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].patient_id, "uid-0");
        assert_eq!(patients[0].visits, 2);
    }

    #[tokio::test]
    async fn missing_patient_record_is_not_found() {
        let h = harness(4);
        assert!(matches!(
            h.service.patient_record("nobody@example.com").await,
            Err(AppointmentError::PatientRecordNotFound(_))
        ));
    }
}

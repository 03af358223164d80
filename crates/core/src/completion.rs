//! Completion and the patient-record projection.
//!
//! Completing an appointment is two writes: the status change, then folding the visit into
//! the patient's record. The status write is committed first and is never undone. If the
//! projection then fails, the caller gets a successful outcome carrying the failure, and
//! [`AppointmentService::repair_projection`] can re-run it later. The projection itself is
//! idempotent per appointment id, so retries and repairs never double-count a visit.

use crate::model::{Appointment, CompletionProjection, PatientRecord, PrescriptionEntry, VisitSummary};
use crate::service::AppointmentService;
use crate::status::{AppointmentStatus, LifecycleEvent};
use crate::store::{
    AppointmentPatch, AppointmentStore, PatientRecordStore, ProjectionOutcome, TransitionOutcome,
};
use crate::validation::parse_appointment_id;
use crate::{AppointmentError, AppointmentResult};
use chrono::Utc;
use clinic_types::AppointmentId;

/// What happened to the patient record when an appointment was completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectionStatus {
    Applied,
    /// The visit was already in the record.
    AlreadyApplied,
    /// The status write succeeded but the record could not be updated.
    Failed(String),
}

impl ProjectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionStatus::Applied => "applied",
            ProjectionStatus::AlreadyApplied => "already_applied",
            ProjectionStatus::Failed(_) => "failed",
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            ProjectionStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompletionOutcome {
    pub appointment: Appointment,
    pub projection: ProjectionStatus,
    /// The patient record after projection; `None` when the projection failed.
    pub record: Option<PatientRecord>,
}

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Marks an approved appointment completed and projects it into the patient record.
    ///
    /// Completing an already completed appointment skips the status write and re-runs the
    /// projection, so a retried request is harmless.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the appointment does not exist.
    /// - `IllegalTransition` if it is not approved (or already completed).
    /// - `Store` if the status write fails. Projection failures are reported in the outcome.
    pub async fn complete(&self, id: &str) -> AppointmentResult<CompletionOutcome> {
        let id = parse_appointment_id(id)?;
        let current = self.require(id).await?;

        let appointment = if current.status == AppointmentStatus::Completed {
            tracing::info!("appointment {} already completed, re-running projection", id);
            current
        } else {
            self.commit_completion(id).await?
        };

        match self.project(&appointment).await {
            Ok(outcome) => Ok(completion_outcome(appointment, outcome)),
            Err(err) => {
                tracing::warn!(
                    "appointment {} completed but patient record update failed: {}",
                    id,
                    err
                );
                Ok(CompletionOutcome {
                    appointment,
                    projection: ProjectionStatus::Failed(err.to_string()),
                    record: None,
                })
            }
        }
    }

    /// Re-runs the patient-record projection for a completed appointment.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` for appointments in any other status, and the store error if the
    /// projection fails again.
    pub async fn repair_projection(&self, id: &str) -> AppointmentResult<CompletionOutcome> {
        let id = parse_appointment_id(id)?;
        let appointment = self.require(id).await?;
        if appointment.status != AppointmentStatus::Completed {
            return Err(AppointmentError::NotCompleted(id));
        }

        let outcome = self.project(&appointment).await?;
        tracing::info!("projection repair for {}: {:?}", id, projection_status(&outcome));
        Ok(completion_outcome(appointment, outcome))
    }

    async fn commit_completion(&self, id: AppointmentId) -> AppointmentResult<Appointment> {
        let outcome = self
            .store
            .transition(
                id,
                LifecycleEvent::Complete,
                AppointmentPatch::default(),
                Utc::now(),
            )
            .await?;

        match outcome {
            TransitionOutcome::Applied(appointment) => {
                tracing::info!("appointment {} completed", id);
                Ok(appointment)
            }
            // Lost a race with another completion of the same appointment.
            TransitionOutcome::Illegal(err) if err.from == AppointmentStatus::Completed => {
                self.require(id).await
            }
            TransitionOutcome::Illegal(err) => Err(err.into()),
            TransitionOutcome::NotFound => Err(AppointmentError::NotFound(id)),
        }
    }

    async fn project(&self, appointment: &Appointment) -> AppointmentResult<ProjectionOutcome> {
        let doctor_name = self.doctor_display_name(&appointment.doctor_email).await;

        let prescription = appointment.prescription.as_ref().map(|p| PrescriptionEntry {
            appointment_id: appointment.id,
            appointment_date: appointment.appointment_date,
            diagnosis: p.diagnosis.to_string(),
            medications: p.medications.to_string(),
            dosage: p.dosage.to_string(),
            instructions: p.instructions.to_string(),
            follow_up: p.follow_up.clone(),
            notes: p.notes.clone(),
            doctor_email: appointment.doctor_email.clone(),
            doctor_name: doctor_name.clone(),
            prescribed_at: p.prescribed_at,
        });

        let projection = CompletionProjection {
            patient_email: appointment.patient_email.clone(),
            patient_id: appointment.patient_id.to_string(),
            patient_name: appointment.patient_name.to_string(),
            visit: VisitSummary {
                appointment_id: appointment.id,
                date: appointment.appointment_date,
                time: appointment.appointment_time.clone(),
                symptoms: appointment.symptoms.to_string(),
                status: appointment.status,
                serial_number: appointment.serial_number,
                doctor_email: appointment.doctor_email.clone(),
                doctor_name,
            },
            prescription,
            at: Utc::now(),
        };

        Ok(self.store.apply_completion(projection).await?)
    }
}

fn projection_status(outcome: &ProjectionOutcome) -> ProjectionStatus {
    match outcome {
        ProjectionOutcome::Applied(_) => ProjectionStatus::Applied,
        ProjectionOutcome::AlreadyApplied(_) => ProjectionStatus::AlreadyApplied,
    }
}

fn completion_outcome(appointment: Appointment, outcome: ProjectionOutcome) -> CompletionOutcome {
    let projection = projection_status(&outcome);
    let record = match outcome {
        ProjectionOutcome::Applied(record) | ProjectionOutcome::AlreadyApplied(record) => record,
    };
    CompletionOutcome {
        appointment,
        projection,
        record: Some(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SlotKey;
    use crate::prescription::PrescriptionInput;
    use crate::store::{
        AppointmentFilter, ApproveOutcome, CancelOutcome, DocumentStore, InsertOutcome,
        RescheduleCommit, RescheduleOutcome, StoreError, StoreResult,
    };
    use crate::test_support::{harness, harness_with_store};
    use async_trait::async_trait;
    use chrono::DateTime;
    use clinic_types::EmailAddress;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn prescription() -> PrescriptionInput {
        PrescriptionInput {
            diagnosis: Some("Bronchitis".into()),
            medications: Some("Amoxicillin".into()),
            dosage: Some("500mg".into()),
            instructions: Some("Three times daily".into()),
            follow_up: Some("2 weeks".into()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn full_lifecycle_builds_the_patient_record() {
        let h = harness(4);
        let a = h.book("uid-0", "09:00-10:00").await;
        let id = a.id.to_string();

        let approved = h.service.approve(&id).await.unwrap();
        assert_eq!(approved.serial_number, Some(1));
        h.service
            .attach_prescription(&id, prescription())
            .await
            .unwrap();

        let outcome = h.service.complete(&id).await.unwrap();
        assert_eq!(outcome.projection, ProjectionStatus::Applied);
        assert_eq!(outcome.appointment.status, AppointmentStatus::Completed);
        assert_eq!(outcome.appointment.serial_number, Some(1));
        assert!(outcome.appointment.completed_at.is_some());

        let record = h
            .service
            .patient_record(a.patient_email.as_str())
            .await
            .unwrap();
        assert_eq!(record.visits, 1);
        assert_eq!(record.last_visit, Some(a.appointment_date));
        assert_eq!(record.appointments.len(), 1);
        assert_eq!(record.prescriptions.len(), 1);
        assert_eq!(record.prescriptions[0].doctor_name, "Dr Meredith Grey");
        assert_eq!(record.prescriptions[0].diagnosis, "Bronchitis");
    }

    #[tokio::test]
    async fn completing_twice_records_one_visit() {
        let h = harness(4);
        let a = h.book_approved("uid-0", "09:00-10:00").await;
        let id = a.id.to_string();
        h.service
            .attach_prescription(&id, prescription())
            .await
            .unwrap();

        h.service.complete(&id).await.unwrap();
        let again = h.service.complete(&id).await.unwrap();
        assert_eq!(again.projection, ProjectionStatus::AlreadyApplied);

        let record = again.record.unwrap();
        assert_eq!(record.visits, 1);
        assert_eq!(record.appointments.len(), 1);
        assert_eq!(record.prescriptions.len(), 1);
    }

    #[tokio::test]
    async fn only_approved_appointments_complete() {
        let h = harness(4);
        let pending = h.book("uid-0", "09:00-10:00").await;
        assert!(matches!(
            h.service.complete(&pending.id.to_string()).await,
            Err(AppointmentError::IllegalTransition(_))
        ));
        assert!(matches!(
            h.service.complete(&AppointmentId::generate().to_string()).await,
            Err(AppointmentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn completion_does_not_renumber_the_slot() {
        let h = harness(4);
        let first = h.book_approved("uid-0", "09:00-10:00").await;
        let second = h.book_approved("uid-1", "09:00-10:00").await;
        h.service.complete(&first.id.to_string()).await.unwrap();
        assert_eq!(
            h.service.require(second.id).await.unwrap().serial_number,
            Some(2)
        );
    }

    #[tokio::test]
    async fn repair_requires_a_completed_appointment() {
        let h = harness(4);
        let a = h.book_approved("uid-0", "09:00-10:00").await;
        assert!(matches!(
            h.service.repair_projection(&a.id.to_string()).await,
            Err(AppointmentError::NotCompleted(_))
        ));
    }

    /// Document store whose patient-record side can be switched off.
    struct FlakyRecords {
        inner: DocumentStore,
        records_down: AtomicBool,
    }

    #[async_trait]
    impl AppointmentStore for FlakyRecords {
        async fn insert_unless_duplicate(&self, a: Appointment) -> StoreResult<InsertOutcome> {
            self.inner.insert_unless_duplicate(a).await
        }
        async fn get(&self, id: AppointmentId) -> StoreResult<Option<Appointment>> {
            self.inner.get(id).await
        }
        async fn find(&self, filter: &AppointmentFilter) -> StoreResult<Vec<Appointment>> {
            self.inner.find(filter).await
        }
        async fn approve_within_capacity(
            &self,
            id: AppointmentId,
            capacity: u32,
            at: DateTime<Utc>,
        ) -> StoreResult<ApproveOutcome> {
            self.inner.approve_within_capacity(id, capacity, at).await
        }
        async fn transition(
            &self,
            id: AppointmentId,
            event: LifecycleEvent,
            patch: AppointmentPatch,
            at: DateTime<Utc>,
        ) -> StoreResult<TransitionOutcome> {
            self.inner.transition(id, event, patch, at).await
        }
        async fn cancel_and_resequence(
            &self,
            id: AppointmentId,
            at: DateTime<Utc>,
        ) -> StoreResult<CancelOutcome> {
            self.inner.cancel_and_resequence(id, at).await
        }
        async fn resequence_slot(
            &self,
            slot: &SlotKey,
            at: DateTime<Utc>,
        ) -> StoreResult<Vec<Appointment>> {
            self.inner.resequence_slot(slot, at).await
        }
        async fn reschedule_within_capacity(
            &self,
            commit: RescheduleCommit,
        ) -> StoreResult<RescheduleOutcome> {
            self.inner.reschedule_within_capacity(commit).await
        }
    }

    #[async_trait]
    impl PatientRecordStore for FlakyRecords {
        async fn get_record(&self, email: &EmailAddress) -> StoreResult<Option<PatientRecord>> {
            self.inner.get_record(email).await
        }
        async fn apply_completion(
            &self,
            projection: CompletionProjection,
        ) -> StoreResult<ProjectionOutcome> {
            if self.records_down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("patient records offline".into()));
            }
            self.inner.apply_completion(projection).await
        }
    }

    #[tokio::test]
    async fn projection_failure_keeps_completion_and_repair_fixes_it() {
        let store = Arc::new(FlakyRecords {
            inner: DocumentStore::in_memory(),
            records_down: AtomicBool::new(true),
        });
        let h = harness_with_store(4, Arc::clone(&store));
        let a = h.book_approved("uid-0", "09:00-10:00").await;
        let id = a.id.to_string();

        let outcome = h.service.complete(&id).await.unwrap();
        assert!(matches!(outcome.projection, ProjectionStatus::Failed(_)));
        assert!(outcome.projection.warning().is_some());
        assert_eq!(outcome.appointment.status, AppointmentStatus::Completed);
        assert!(h
            .service
            .patient_record(a.patient_email.as_str())
            .await
            .is_err());

        assert!(h.service.repair_projection(&id).await.is_err());

        store.records_down.store(false, Ordering::SeqCst);
        let repaired = h.service.repair_projection(&id).await.unwrap();
        assert_eq!(repaired.projection, ProjectionStatus::Applied);
        let again = h.service.repair_projection(&id).await.unwrap();
        assert_eq!(again.projection, ProjectionStatus::AlreadyApplied);
        assert_eq!(again.record.unwrap().visits, 1);
    }
}

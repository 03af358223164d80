use super::file::{load_state, save_state};
use super::state::StoreState;
use super::{
    AppointmentFilter, AppointmentPatch, AppointmentStore, ApproveOutcome, CancelOutcome,
    InsertOutcome, PatientRecordStore, ProjectionOutcome, RescheduleCommit, RescheduleOutcome,
    StoreResult, TransitionOutcome,
};
use crate::model::{Appointment, CompletionProjection, PatientRecord, SlotKey};
use crate::status::LifecycleEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_types::{AppointmentId, EmailAddress};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Document store holding appointments and patient records behind a single async mutex.
///
/// Every primitive takes the lock for its whole duration, which makes each one linearisable
/// with respect to all others. When opened on a directory, the full state is written to disk
/// before the lock is released; if that write fails the in-memory state is rolled back and
/// the caller sees the error.
#[derive(Debug)]
pub struct DocumentStore {
    state: Mutex<StoreState>,
    data_dir: Option<PathBuf>,
}

impl DocumentStore {
    /// Creates an empty store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            data_dir: None,
        }
    }

    /// Opens (or creates) a store persisted under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the directory cannot be created or an existing collection file
    /// cannot be read or parsed.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = data_dir.as_ref().to_path_buf();
        let state = load_state(&dir)?;
        tracing::info!(
            "opened document store at {} ({} appointments, {} patient records)",
            dir.display(),
            state.appointments.len(),
            state.patients.len()
        );
        Ok(Self {
            state: Mutex::new(state),
            data_dir: Some(dir),
        })
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    async fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    async fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> StoreResult<R> {
        let mut state = self.state.lock().await;

        let Some(dir) = self.data_dir.as_deref() else {
            return Ok(f(&mut state));
        };

        let snapshot = state.clone();
        let result = f(&mut state);
        if let Err(err) = save_state(dir, &snapshot, &state).await {
            tracing::error!("store write failed, rolling back: {}", err);
            *state = snapshot;
            return Err(err);
        }
        Ok(result)
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl AppointmentStore for DocumentStore {
    async fn insert_unless_duplicate(
        &self,
        appointment: Appointment,
    ) -> StoreResult<InsertOutcome> {
        self.write(|s| s.insert_unless_duplicate(appointment)).await
    }

    async fn get(&self, id: AppointmentId) -> StoreResult<Option<Appointment>> {
        Ok(self.read(|s| s.get(id)).await)
    }

    async fn find(&self, filter: &AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        Ok(self.read(|s| s.find(filter)).await)
    }

    async fn approve_within_capacity(
        &self,
        id: AppointmentId,
        capacity: u32,
        at: DateTime<Utc>,
    ) -> StoreResult<ApproveOutcome> {
        self.write(|s| s.approve_within_capacity(id, capacity, at))
            .await
    }

    async fn transition(
        &self,
        id: AppointmentId,
        event: LifecycleEvent,
        patch: AppointmentPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome> {
        self.write(|s| s.transition(id, event, patch, at)).await
    }

    async fn cancel_and_resequence(
        &self,
        id: AppointmentId,
        at: DateTime<Utc>,
    ) -> StoreResult<CancelOutcome> {
        self.write(|s| s.cancel_and_resequence(id, at)).await
    }

    async fn resequence_slot(
        &self,
        slot: &SlotKey,
        at: DateTime<Utc>,
    ) -> StoreResult<Vec<Appointment>> {
        self.write(|s| s.resequence_slot(slot, at)).await
    }

    async fn reschedule_within_capacity(
        &self,
        commit: RescheduleCommit,
    ) -> StoreResult<RescheduleOutcome> {
        self.write(|s| s.reschedule_within_capacity(commit)).await
    }
}

#[async_trait]
impl PatientRecordStore for DocumentStore {
    async fn get_record(&self, email: &EmailAddress) -> StoreResult<Option<PatientRecord>> {
        Ok(self.read(|s| s.get_record(email)).await)
    }

    async fn apply_completion(
        &self,
        projection: CompletionProjection,
    ) -> StoreResult<ProjectionOutcome> {
        self.write(|s| s.apply_completion(projection)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VisitSummary;
    use crate::status::AppointmentStatus;
    use crate::test_support::{appointment_at, slot};
    use tempfile::TempDir;

    #[tokio::test]
    async fn approve_assigns_next_serial_until_capacity() {
        let store = DocumentStore::in_memory();
        let mut ids = Vec::new();
        for minute in 0..5 {
            let a = appointment_at(&format!("p{minute}"), "09:00-10:00", minute);
            ids.push(a.id);
            store.insert_unless_duplicate(a).await.unwrap();
        }

        let now = Utc::now();
        for (i, id) in ids.iter().take(4).enumerate() {
            match store.approve_within_capacity(*id, 4, now).await.unwrap() {
                ApproveOutcome::Approved(a) => assert_eq!(a.serial_number, Some(i as u32 + 1)),
                other => panic!("expected approval, got {other:?}"),
            }
        }
        assert_eq!(
            store.approve_within_capacity(ids[4], 4, now).await.unwrap(),
            ApproveOutcome::QueueFull {
                slot: slot("09:00-10:00"),
                approved: 4
            }
        );
        let fifth = store.get(ids[4]).await.unwrap().unwrap();
        assert_eq!(fifth.status, AppointmentStatus::PendingRequest);
        assert_eq!(fifth.serial_number, None);
    }

    #[tokio::test]
    async fn second_approval_is_refused() {
        let store = DocumentStore::in_memory();
        let a = appointment_at("p1", "09:00-10:00", 0);
        store.insert_unless_duplicate(a.clone()).await.unwrap();
        let now = Utc::now();
        assert!(matches!(
            store.approve_within_capacity(a.id, 4, now).await.unwrap(),
            ApproveOutcome::Approved(_)
        ));
        assert_eq!(
            store.approve_within_capacity(a.id, 4, now).await.unwrap(),
            ApproveOutcome::NotPending
        );
        assert_eq!(
            store.get(a.id).await.unwrap().unwrap().serial_number,
            Some(1)
        );
    }

    #[tokio::test]
    async fn duplicate_only_blocks_while_occupying() {
        let store = DocumentStore::in_memory();
        let first = appointment_at("p1", "09:00-10:00", 0);
        store.insert_unless_duplicate(first.clone()).await.unwrap();

        let again = appointment_at("p1", "09:00-10:00", 1);
        assert_eq!(
            store.insert_unless_duplicate(again.clone()).await.unwrap(),
            InsertOutcome::Duplicate(first.id)
        );

        store.cancel_and_resequence(first.id, Utc::now()).await.unwrap();
        assert!(matches!(
            store.insert_unless_duplicate(again).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
    }

    #[tokio::test]
    async fn cancel_resequences_by_booking_order() {
        let store = DocumentStore::in_memory();
        let booked: Vec<_> = (0..4)
            .map(|m| appointment_at(&format!("p{m}"), "09:00-10:00", m))
            .collect();
        for a in &booked {
            store.insert_unless_duplicate(a.clone()).await.unwrap();
        }
        // Approve out of booking order: t4, t3, t2, t1.
        for a in booked.iter().rev() {
            store
                .approve_within_capacity(a.id, 4, Utc::now())
                .await
                .unwrap();
        }

        let outcome = store
            .cancel_and_resequence(booked[3].id, Utc::now())
            .await
            .unwrap();
        let CancelOutcome::Cancelled { resequenced, .. } = outcome else {
            panic!("expected cancellation");
        };
        let order: Vec<_> = resequenced
            .iter()
            .map(|a| (a.id, a.serial_number))
            .collect();
        assert_eq!(
            order,
            vec![
                (booked[0].id, Some(1)),
                (booked[1].id, Some(2)),
                (booked[2].id, Some(3)),
            ]
        );
    }

    #[tokio::test]
    async fn resequence_is_idempotent() {
        let store = DocumentStore::in_memory();
        for m in 0..3 {
            let a = appointment_at(&format!("p{m}"), "09:00-10:00", m);
            store.insert_unless_duplicate(a.clone()).await.unwrap();
            store
                .approve_within_capacity(a.id, 4, Utc::now())
                .await
                .unwrap();
        }
        let key = slot("09:00-10:00");
        let first = store.resequence_slot(&key, Utc::now()).await.unwrap();
        let second = store.resequence_slot(&key, Utc::now()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn completion_projection_is_applied_once() {
        let store = DocumentStore::in_memory();
        let a = appointment_at("p1", "09:00-10:00", 0);
        let projection = CompletionProjection {
            patient_email: a.patient_email.clone(),
            patient_id: a.patient_id.to_string(),
            patient_name: a.patient_name.to_string(),
            visit: VisitSummary {
                appointment_id: a.id,
                date: a.appointment_date,
                time: a.appointment_time.clone(),
                symptoms: a.symptoms.to_string(),
                status: AppointmentStatus::Completed,
                serial_number: Some(1),
                doctor_email: a.doctor_email.clone(),
                doctor_name: "Dr Who".into(),
            },
            prescription: None,
            at: Utc::now(),
        };

        let ProjectionOutcome::Applied(first) =
            store.apply_completion(projection.clone()).await.unwrap()
        else {
            panic!("expected first projection to apply");
        };
        assert_eq!(first.visits, 1);

        let ProjectionOutcome::AlreadyApplied(second) =
            store.apply_completion(projection).await.unwrap()
        else {
            panic!("expected second projection to be a no-op");
        };
        assert_eq!(second.visits, 1);
        assert_eq!(second.appointments.len(), 1);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let a = appointment_at("p1", "09:00-10:00", 0);
        {
            let store = DocumentStore::open(dir.path()).unwrap();
            store.insert_unless_duplicate(a.clone()).await.unwrap();
            store
                .approve_within_capacity(a.id, 4, Utc::now())
                .await
                .unwrap();
        }

        let reopened = DocumentStore::open(dir.path()).unwrap();
        let loaded = reopened.get(a.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Approved);
        assert_eq!(loaded.serial_number, Some(1));
        assert!(dir.path().join("appointments.json").is_file());
    }

    #[tokio::test]
    async fn open_rejects_corrupt_collection() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("appointments.json"), "{not json").unwrap();
        assert!(DocumentStore::open(dir.path()).is_err());
    }

    fn completed_visit(a: &Appointment) -> CompletionProjection {
        CompletionProjection {
            patient_email: a.patient_email.clone(),
            patient_id: a.patient_id.to_string(),
            patient_name: a.patient_name.to_string(),
            visit: VisitSummary {
                appointment_id: a.id,
                date: a.appointment_date,
                time: a.appointment_time.clone(),
                symptoms: a.symptoms.to_string(),
                status: AppointmentStatus::Completed,
                serial_number: Some(1),
                doctor_email: a.doctor_email.clone(),
                doctor_name: "Dr Who".into(),
            },
            prescription: None,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn failed_rename_restores_collections_already_written() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let a = appointment_at("p1", "09:00-10:00", 0);
        store.insert_unless_duplicate(a.clone()).await.unwrap();

        let appointments_path = dir.path().join("appointments.json");
        let before = std::fs::read_to_string(&appointments_path).unwrap();
        // Renaming a file onto a directory fails after appointments.json is already replaced.
        std::fs::create_dir(dir.path().join("patients.json")).unwrap();

        let b = appointment_at("p2", "09:00-10:00", 1);
        let result = store
            .write(|s| {
                s.insert_unless_duplicate(b.clone());
                s.apply_completion(completed_visit(&a))
            })
            .await;
        assert!(result.is_err());

        assert_eq!(std::fs::read_to_string(&appointments_path).unwrap(), before);
        assert!(!dir.path().join("appointments.json.tmp").exists());
        assert!(!dir.path().join("patients.json.tmp").exists());
        assert_eq!(store.get(b.id).await.unwrap(), None);
        assert_eq!(store.get_record(&a.patient_email).await.unwrap(), None);

        std::fs::remove_dir(dir.path().join("patients.json")).unwrap();
        let reopened = DocumentStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(b.id).await.unwrap(), None);
        assert!(reopened.get(a.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_staging_writes_nothing_and_unchanged_collections_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let a = appointment_at("p1", "09:00-10:00", 0);
        store.insert_unless_duplicate(a.clone()).await.unwrap();
        let appointments_path = dir.path().join("appointments.json");
        let before = std::fs::read_to_string(&appointments_path).unwrap();

        // A directory in the way of the patients temp file makes staging fail.
        std::fs::create_dir(dir.path().join("patients.json.tmp")).unwrap();

        let b = appointment_at("p2", "09:00-10:00", 1);
        let result = store
            .write(|s| {
                s.insert_unless_duplicate(b.clone());
                s.apply_completion(completed_visit(&a))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&appointments_path).unwrap(), before);
        assert!(!dir.path().join("appointments.json.tmp").exists());
        assert_eq!(store.get(b.id).await.unwrap(), None);

        let reopened = DocumentStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(b.id).await.unwrap(), None);

        // Patient records are untouched by an insert, so their blocked temp file is irrelevant.
        let c = appointment_at("p3", "10:00-11:00", 2);
        store.insert_unless_duplicate(c.clone()).await.unwrap();
        let reopened = DocumentStore::open(dir.path()).unwrap();
        assert!(reopened.get(c.id).await.unwrap().is_some());
    }
}

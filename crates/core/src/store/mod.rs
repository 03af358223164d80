//! Appointment and patient-record storage.
//!
//! The service layer never does read-then-write against the store for anything that touches
//! queue capacity or serial numbers. Each trait method below is a single atomic operation:
//! implementations must make its checks and writes indivisible with respect to every other
//! method on the same store.
//!
//! [`DocumentStore`] is the implementation shipped with the crate. It keeps both collections
//! behind one async mutex and can optionally persist them as JSON files.

mod document;
mod file;
mod state;

pub use document::DocumentStore;

use crate::model::{Appointment, CompletionProjection, PatientRecord, SlotKey};
use crate::status::{AppointmentStatus, LifecycleEvent, TransitionError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_types::{AppointmentId, EmailAddress, NonEmptyText, SlotDate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to create store directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to serialize store: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize store: {0}")]
    Deserialization(serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// QUERY AND UPDATE SHAPES
// ============================================================================

/// Conjunctive filter over appointments. `None` fields match everything.
#[derive(Clone, Debug, Default)]
pub struct AppointmentFilter {
    pub doctor_email: Option<EmailAddress>,
    pub patient_id: Option<String>,
    pub date: Option<SlotDate>,
    pub time: Option<String>,
    pub statuses: Option<Vec<AppointmentStatus>>,
}

impl AppointmentFilter {
    pub fn for_doctor(email: &EmailAddress) -> Self {
        Self {
            doctor_email: Some(email.clone()),
            ..Self::default()
        }
    }

    pub fn for_patient(patient_id: &str) -> Self {
        Self {
            patient_id: Some(patient_id.to_owned()),
            ..Self::default()
        }
    }

    pub fn for_doctor_day(email: &EmailAddress, date: SlotDate) -> Self {
        Self {
            doctor_email: Some(email.clone()),
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[AppointmentStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.doctor_email
            .as_ref()
            .map_or(true, |e| *e == appointment.doctor_email)
            && self
                .patient_id
                .as_deref()
                .map_or(true, |p| p == appointment.patient_id.as_str())
            && self.date.map_or(true, |d| d == appointment.appointment_date)
            && self
                .time
                .as_deref()
                .map_or(true, |t| t == appointment.appointment_time)
            && self
                .statuses
                .as_ref()
                .map_or(true, |s| s.contains(&appointment.status))
    }
}

/// Fields written alongside a lifecycle event. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct AppointmentPatch {
    pub rejection_reason: Option<String>,
    pub prescription: Option<crate::model::Prescription>,
}

/// Inputs for an atomic reschedule.
#[derive(Clone, Debug)]
pub struct RescheduleCommit {
    pub id: AppointmentId,
    pub date: SlotDate,
    pub time: String,
    pub symptoms: Option<NonEmptyText>,
    pub capacity: u32,
    pub at: DateTime<Utc>,
}

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Appointment),
    /// An appointment for the same patient and slot is already pending or approved.
    Duplicate(AppointmentId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApproveOutcome {
    Approved(Appointment),
    QueueFull { slot: SlotKey, approved: u32 },
    NotPending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied(Appointment),
    NotFound,
    Illegal(TransitionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// `resequenced` lists the slot's remaining approved appointments after renumbering.
    Cancelled {
        appointment: Appointment,
        resequenced: Vec<Appointment>,
    },
    NotFound,
    Illegal(TransitionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RescheduleOutcome {
    /// `resequenced` is the old slot's queue after the appointment left it (empty when the
    /// appointment was not queued or stayed in the same slot).
    Rescheduled {
        appointment: Appointment,
        resequenced: Vec<Appointment>,
    },
    SlotFull { occupied: u32 },
    NotFound,
    Illegal(TransitionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectionOutcome {
    Applied(PatientRecord),
    /// The appointment was already in the record; nothing changed.
    AlreadyApplied(PatientRecord),
}

// ============================================================================
// TRAITS
// ============================================================================

/// Durable appointment collection with atomic conditional primitives.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Inserts `appointment` unless the same patient already holds a pending or approved
    /// appointment in the same slot.
    async fn insert_unless_duplicate(&self, appointment: Appointment)
        -> StoreResult<InsertOutcome>;

    async fn get(&self, id: AppointmentId) -> StoreResult<Option<Appointment>>;

    async fn find(&self, filter: &AppointmentFilter) -> StoreResult<Vec<Appointment>>;

    /// Moves a pending request into the queue if the slot has fewer than `capacity` approved
    /// appointments, assigning the next serial number.
    async fn approve_within_capacity(
        &self,
        id: AppointmentId,
        capacity: u32,
        at: DateTime<Utc>,
    ) -> StoreResult<ApproveOutcome>;

    /// Applies `event` through the state machine and writes `patch` if it is legal.
    ///
    /// Not for `Approve`, `Cancel` or `Reschedule`, which have dedicated primitives because
    /// they change queue numbering.
    async fn transition(
        &self,
        id: AppointmentId,
        event: LifecycleEvent,
        patch: AppointmentPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome>;

    /// Cancels the appointment and renumbers its slot in one batch.
    async fn cancel_and_resequence(
        &self,
        id: AppointmentId,
        at: DateTime<Utc>,
    ) -> StoreResult<CancelOutcome>;

    /// Renumbers the slot's approved appointments `1..N` in booking order.
    async fn resequence_slot(
        &self,
        slot: &SlotKey,
        at: DateTime<Utc>,
    ) -> StoreResult<Vec<Appointment>>;

    /// Moves the appointment to a new slot if that slot has spare capacity, ignoring the
    /// appointment's own current booking.
    async fn reschedule_within_capacity(
        &self,
        commit: RescheduleCommit,
    ) -> StoreResult<RescheduleOutcome>;
}

/// Patient record projection. Only the completion projector writes here.
#[async_trait]
pub trait PatientRecordStore: Send + Sync {
    async fn get_record(&self, email: &EmailAddress) -> StoreResult<Option<PatientRecord>>;

    /// Folds one completed appointment into the patient's record, creating it on first use.
    ///
    /// Idempotent per appointment id.
    async fn apply_completion(
        &self,
        projection: CompletionProjection,
    ) -> StoreResult<ProjectionOutcome>;
}

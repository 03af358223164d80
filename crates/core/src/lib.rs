//! # Clinic Core
//!
//! Core business logic for the clinic appointment service.
//!
//! This crate owns the appointment lifecycle:
//! - The status state machine ([`AppointmentStatus::apply`])
//! - Per-slot capacity-limited queues with contiguous serial numbers
//! - Request intake, approval/rejection, cancellation with resequencing, rescheduling
//! - Completion and the patient-record projection
//! - Storage traits with an in-memory / JSON-file implementation
//!
//! **No API concerns**: HTTP servers, DTOs and request parsing belong in `api-rest` and
//! `api-shared`.

pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod model;
pub mod status;
pub mod store;
pub mod validation;

mod approval;
mod completion;
mod intake;
mod prescription;
mod queue;
mod reschedule;
mod service;
mod slots;

#[cfg(test)]
mod test_support;

pub use config::CoreConfig;
pub use directory::{
    DirectoryError, DoctorDirectory, IdentityProvider, ResolvedIdentity, StaticDirectory,
    UserRole,
};
pub use error::{AppointmentError, AppointmentResult, ErrorKind};
pub use model::{
    Appointment, PatientRecord, PatientSummary, Prescription, PrescriptionEntry, SlotKey,
    VisitSummary,
};
pub use status::{AppointmentStatus, LifecycleEvent, TransitionError};
pub use store::{AppointmentStore, DocumentStore, PatientRecordStore, StoreError};

pub use completion::{CompletionOutcome, ProjectionStatus};
pub use intake::NewAppointmentRequest;
pub use prescription::PrescriptionInput;
pub use queue::QueueChange;
pub use service::{AppointmentService, StatusChange};
pub use slots::{free_slots, SlotAvailability};

//! The appointment service.
//!
//! [`AppointmentService`] is the single entry point for every appointment operation. Its
//! methods are spread over one module per concern (`intake`, `approval`, `queue`,
//! `completion`, `reschedule`, `prescription`, `slots`), each adding an `impl` block here.

use crate::config::CoreConfig;
use crate::directory::{DoctorDirectory, IdentityProvider};
use crate::model::Appointment;
use crate::status::AppointmentStatus;
use crate::store::{AppointmentStore, PatientRecordStore};
use crate::{AppointmentError, AppointmentResult, CompletionOutcome, QueueChange};
use clinic_types::{AppointmentId, EmailAddress};
use std::sync::Arc;

/// Appointment lifecycle service over a store `S`.
pub struct AppointmentService<S> {
    pub(crate) cfg: Arc<CoreConfig>,
    pub(crate) store: Arc<S>,
    pub(crate) directory: Arc<dyn DoctorDirectory>,
    pub(crate) identities: Arc<dyn IdentityProvider>,
}

impl<S> Clone for AppointmentService<S> {
    fn clone(&self) -> Self {
        Self {
            cfg: Arc::clone(&self.cfg),
            store: Arc::clone(&self.store),
            directory: Arc::clone(&self.directory),
            identities: Arc::clone(&self.identities),
        }
    }
}

/// Result of a generic status update, one variant per reachable target status.
#[derive(Clone, Debug)]
pub enum StatusChange {
    Approved(Appointment),
    Rejected(Appointment),
    Completed(CompletionOutcome),
    Cancelled(QueueChange),
}

impl StatusChange {
    pub fn appointment(&self) -> &Appointment {
        match self {
            StatusChange::Approved(a) | StatusChange::Rejected(a) => a,
            StatusChange::Completed(outcome) => &outcome.appointment,
            StatusChange::Cancelled(change) => &change.appointment,
        }
    }
}

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Creates a new `AppointmentService`.
    ///
    /// # Arguments
    ///
    /// * `cfg` - Capacity, slot catalogue and doctor allow-list.
    /// * `store` - Appointment and patient-record storage.
    /// * `directory` - Doctor display names.
    /// * `identities` - Resolves the caller of intake requests.
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<S>,
        directory: Arc<dyn DoctorDirectory>,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            cfg,
            store,
            directory,
            identities,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies a status update by dispatching to the operation that owns that transition.
    ///
    /// `pending_request` cannot be set directly; it is only ever the initial status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown or unreachable status, otherwise whatever the
    /// dispatched operation returns.
    pub async fn apply_status(&self, id: &str, status: &str) -> AppointmentResult<StatusChange> {
        let target: AppointmentStatus = status.parse()?;
        match target {
            AppointmentStatus::Approved => self.approve(id).await.map(StatusChange::Approved),
            AppointmentStatus::Rejected => {
                self.reject(id, None).await.map(StatusChange::Rejected)
            }
            AppointmentStatus::Completed => self.complete(id).await.map(StatusChange::Completed),
            AppointmentStatus::Cancelled => self.cancel(id).await.map(StatusChange::Cancelled),
            AppointmentStatus::PendingRequest => Err(AppointmentError::InvalidInput(
                "status cannot be set back to pending_request".into(),
            )),
        }
    }

    /// Best-effort doctor display name; falls back to the email on any directory failure.
    pub(crate) async fn doctor_display_name(&self, email: &EmailAddress) -> String {
        match self.directory.display_name(email).await {
            Ok(Some(name)) => name,
            Ok(None) => email.to_string(),
            Err(err) => {
                tracing::warn!("doctor directory lookup failed for {}: {}", email, err);
                email.to_string()
            }
        }
    }

    pub(crate) async fn require(&self, id: AppointmentId) -> AppointmentResult<Appointment> {
        self.store
            .get(id)
            .await?
            .ok_or(AppointmentError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{booking, harness};
    use crate::{AppointmentError, AppointmentStatus, StatusChange};

    #[tokio::test]
    async fn status_update_dispatches_by_target() {
        let h = harness(4);
        let a = h.book("uid-0", "09:00-10:00").await;
        let id = a.id.to_string();

        let approved = h.service.apply_status(&id, "confirmed").await.unwrap();
        assert!(matches!(approved, StatusChange::Approved(_)));
        assert_eq!(approved.appointment().serial_number, Some(1));

        let completed = h.service.apply_status(&id, "completed").await.unwrap();
        assert_eq!(completed.appointment().status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn status_update_rejects_unknown_and_initial_status() {
        let h = harness(4);
        let a = h
            .service
            .request_appointment("uid-1", booking("uid-1", "10:00-11:00"))
            .await
            .unwrap();
        let id = a.id.to_string();

        assert!(matches!(
            h.service.apply_status(&id, "teleported").await,
            Err(AppointmentError::InvalidInput(_))
        ));
        assert!(matches!(
            h.service.apply_status(&id, "pending").await,
            Err(AppointmentError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn status_update_to_cancelled_resequences() {
        let h = harness(4);
        let first = h.book_approved("uid-0", "09:00-10:00").await;
        let second = h.book_approved("uid-1", "09:00-10:00").await;

        let change = h
            .service
            .apply_status(&first.id.to_string(), "cancelled")
            .await
            .unwrap();
        let StatusChange::Cancelled(change) = change else {
            panic!("expected cancellation");
        };
        assert_eq!(change.resequenced.len(), 1);
        assert_eq!(change.resequenced[0].id, second.id);
        assert_eq!(change.resequenced[0].serial_number, Some(1));
    }
}

//! In-lock store logic.
//!
//! `StoreState` holds both collections and implements every store primitive as a plain
//! synchronous method. The caller owns the lock, so each method runs to completion without
//! interleaving with any other.

use super::{
    AppointmentFilter, AppointmentPatch, ApproveOutcome, CancelOutcome, InsertOutcome,
    ProjectionOutcome, RescheduleCommit, RescheduleOutcome, TransitionOutcome,
};
use crate::model::{Appointment, CompletionProjection, PatientRecord, SlotKey};
use crate::status::{AppointmentStatus, LifecycleEvent, TransitionError};
use chrono::{DateTime, Utc};
use clinic_types::{AppointmentId, EmailAddress};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) appointments: BTreeMap<AppointmentId, Appointment>,
    pub(crate) patients: BTreeMap<EmailAddress, PatientRecord>,
}

impl StoreState {
    pub(crate) fn from_documents(
        appointments: Vec<Appointment>,
        patients: Vec<PatientRecord>,
    ) -> Self {
        Self {
            appointments: appointments.into_iter().map(|a| (a.id, a)).collect(),
            patients: patients
                .into_iter()
                .map(|p| (p.patient_email.clone(), p))
                .collect(),
        }
    }

    fn count_in_slot(
        &self,
        slot: &SlotKey,
        exclude: Option<AppointmentId>,
        pred: impl Fn(AppointmentStatus) -> bool,
    ) -> u32 {
        let count = self
            .appointments
            .values()
            .filter(|a| Some(a.id) != exclude && a.is_in_slot(slot) && pred(a.status))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    // ------------------------------------------------------------------------
    // Appointments
    // ------------------------------------------------------------------------

    pub(crate) fn insert_unless_duplicate(&mut self, appointment: Appointment) -> InsertOutcome {
        let duplicate = self.appointments.values().find(|existing| {
            existing.patient_id == appointment.patient_id
                && existing.is_in_slot(&appointment.slot_key())
                && existing.status.occupies_capacity()
        });
        if let Some(existing) = duplicate {
            return InsertOutcome::Duplicate(existing.id);
        }

        self.appointments.insert(appointment.id, appointment.clone());
        InsertOutcome::Inserted(appointment)
    }

    pub(crate) fn get(&self, id: AppointmentId) -> Option<Appointment> {
        self.appointments.get(&id).cloned()
    }

    pub(crate) fn find(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        self.appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect()
    }

    pub(crate) fn approve_within_capacity(
        &mut self,
        id: AppointmentId,
        capacity: u32,
        at: DateTime<Utc>,
    ) -> ApproveOutcome {
        let Some(current) = self.appointments.get(&id) else {
            return ApproveOutcome::NotPending;
        };
        let Ok(next) = current.status.apply(LifecycleEvent::Approve) else {
            return ApproveOutcome::NotPending;
        };

        let slot = current.slot_key();
        let approved = self.count_in_slot(&slot, Some(id), |s| s.is_queued());
        if approved >= capacity {
            return ApproveOutcome::QueueFull { slot, approved };
        }

        let Some(appointment) = self.appointments.get_mut(&id) else {
            return ApproveOutcome::NotPending;
        };
        appointment.status = next;
        appointment.serial_number = Some(approved + 1);
        appointment.approved_at = Some(at);
        appointment.updated_at = at;
        ApproveOutcome::Approved(appointment.clone())
    }

    pub(crate) fn transition(
        &mut self,
        id: AppointmentId,
        event: LifecycleEvent,
        patch: AppointmentPatch,
        at: DateTime<Utc>,
    ) -> TransitionOutcome {
        let Some(appointment) = self.appointments.get_mut(&id) else {
            return TransitionOutcome::NotFound;
        };

        // Queue-changing events must go through their own primitives.
        if matches!(
            event,
            LifecycleEvent::Approve | LifecycleEvent::Cancel | LifecycleEvent::Reschedule
        ) {
            return TransitionOutcome::Illegal(TransitionError {
                from: appointment.status,
                event,
            });
        }

        let next = match appointment.status.apply(event) {
            Ok(next) => next,
            Err(err) => return TransitionOutcome::Illegal(err),
        };

        appointment.status = next;
        match event {
            LifecycleEvent::Reject => {
                appointment.rejection_reason = patch.rejection_reason;
                appointment.rejected_at = Some(at);
            }
            LifecycleEvent::Complete => appointment.completed_at = Some(at),
            LifecycleEvent::AttachPrescription => {
                if let Some(prescription) = patch.prescription {
                    appointment.prescription = Some(prescription);
                }
            }
            _ => {}
        }
        appointment.updated_at = at;
        TransitionOutcome::Applied(appointment.clone())
    }

    pub(crate) fn cancel_and_resequence(
        &mut self,
        id: AppointmentId,
        at: DateTime<Utc>,
    ) -> CancelOutcome {
        let Some(appointment) = self.appointments.get_mut(&id) else {
            return CancelOutcome::NotFound;
        };
        let next = match appointment.status.apply(LifecycleEvent::Cancel) {
            Ok(next) => next,
            Err(err) => return CancelOutcome::Illegal(err),
        };

        appointment.status = next;
        appointment.cancelled_at = Some(at);
        appointment.updated_at = at;
        let cancelled = appointment.clone();

        let resequenced = self.resequence_slot(&cancelled.slot_key(), at);
        CancelOutcome::Cancelled {
            appointment: cancelled,
            resequenced,
        }
    }

    /// Renumbers approved appointments in `slot` to `1..N` by booking order.
    ///
    /// Only documents whose serial actually changes get a new `updated_at`, so running this
    /// twice leaves the store byte-for-byte identical.
    pub(crate) fn resequence_slot(&mut self, slot: &SlotKey, at: DateTime<Utc>) -> Vec<Appointment> {
        let mut queued: Vec<&Appointment> = self
            .appointments
            .values()
            .filter(|a| a.is_in_slot(slot) && a.status.is_queued())
            .collect();
        queued.sort_by(|a, b| Appointment::booking_order(a, b));
        let order: Vec<AppointmentId> = queued.into_iter().map(|a| a.id).collect();

        let mut result = Vec::with_capacity(order.len());
        for (index, id) in order.into_iter().enumerate() {
            let serial = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if let Some(appointment) = self.appointments.get_mut(&id) {
                if appointment.serial_number != Some(serial) {
                    appointment.serial_number = Some(serial);
                    appointment.updated_at = at;
                }
                result.push(appointment.clone());
            }
        }
        result
    }

    pub(crate) fn reschedule_within_capacity(
        &mut self,
        commit: RescheduleCommit,
    ) -> RescheduleOutcome {
        let Some(current) = self.appointments.get(&commit.id) else {
            return RescheduleOutcome::NotFound;
        };
        let next = match current.status.apply(LifecycleEvent::Reschedule) {
            Ok(next) => next,
            Err(err) => return RescheduleOutcome::Illegal(err),
        };

        let old_slot = current.slot_key();
        let new_slot = SlotKey {
            doctor_email: current.doctor_email.clone(),
            date: commit.date,
            time: commit.time.clone(),
        };
        let moving = old_slot != new_slot;

        if moving {
            let occupied =
                self.count_in_slot(&new_slot, Some(commit.id), |s| s.occupies_capacity());
            if occupied >= commit.capacity {
                return RescheduleOutcome::SlotFull { occupied };
            }
        }

        let new_serial = (moving && next.is_queued())
            .then(|| self.count_in_slot(&new_slot, Some(commit.id), |s| s.is_queued()) + 1);

        let Some(appointment) = self.appointments.get_mut(&commit.id) else {
            return RescheduleOutcome::NotFound;
        };
        appointment.status = next;
        appointment.appointment_date = commit.date;
        appointment.appointment_time = commit.time;
        if let Some(symptoms) = commit.symptoms {
            appointment.symptoms = symptoms;
        }
        if let Some(serial) = new_serial {
            appointment.serial_number = Some(serial);
        }
        appointment.updated_at = commit.at;
        let updated = appointment.clone();

        let resequenced = if new_serial.is_some() {
            self.resequence_slot(&old_slot, commit.at)
        } else {
            Vec::new()
        };

        RescheduleOutcome::Rescheduled {
            appointment: updated,
            resequenced,
        }
    }

    // ------------------------------------------------------------------------
    // Patient records
    // ------------------------------------------------------------------------

    pub(crate) fn get_record(&self, email: &EmailAddress) -> Option<PatientRecord> {
        self.patients.get(email).cloned()
    }

    pub(crate) fn apply_completion(&mut self, projection: CompletionProjection) -> ProjectionOutcome {
        let record = self
            .patients
            .entry(projection.patient_email.clone())
            .or_insert_with(|| PatientRecord {
                patient_email: projection.patient_email.clone(),
                patient_id: projection.patient_id.clone(),
                patient_name: projection.patient_name.clone(),
                visits: 0,
                last_visit: None,
                prescriptions: Vec::new(),
                appointments: Vec::new(),
                created_at: projection.at,
                updated_at: projection.at,
            });

        let id = projection.visit.appointment_id;
        if record.has_visit(id) {
            return ProjectionOutcome::AlreadyApplied(record.clone());
        }

        record.last_visit = Some(projection.visit.date);
        record.visits += 1;
        record.appointments.push(projection.visit);
        if let Some(prescription) = projection.prescription {
            if !record
                .prescriptions
                .iter()
                .any(|p| p.appointment_id == prescription.appointment_id)
            {
                record.prescriptions.push(prescription);
            }
        }
        record.updated_at = projection.at;
        ProjectionOutcome::Applied(record.clone())
    }
}

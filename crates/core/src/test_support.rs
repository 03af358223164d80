//! Fixtures shared by the unit tests.

use crate::config::CoreConfig;
use crate::directory::{StaticDirectory, UserRole};
use crate::intake::NewAppointmentRequest;
use crate::model::{Appointment, SlotKey};
use crate::service::AppointmentService;
use crate::status::AppointmentStatus;
use crate::store::{AppointmentStore, DocumentStore, InsertOutcome, PatientRecordStore};
use chrono::{Duration, TimeZone, Utc};
use clinic_types::{AppointmentId, EmailAddress, NonEmptyText, SlotDate};
use std::collections::BTreeSet;
use std::sync::Arc;

pub(crate) const DOCTOR: &str = "dr.grey@clinic.org";
pub(crate) const DATE: &str = "2024-06-03";

fn email(s: &str) -> EmailAddress {
    EmailAddress::parse(s).unwrap()
}

/// A pending appointment with `DOCTOR` on `DATE`, booked `minute` minutes after a fixed
/// base time.
pub(crate) fn appointment_at(patient_id: &str, time: &str, minute: i64) -> Appointment {
    let created = Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap() + Duration::minutes(minute);
    Appointment {
        id: AppointmentId::generate(),
        patient_id: NonEmptyText::new(patient_id).unwrap(),
        patient_name: NonEmptyText::new(format!("Patient {patient_id}")).unwrap(),
        patient_email: email(&format!("{patient_id}@example.com")),
        patient_phone: None,
        patient_age: None,
        patient_gender: None,
        doctor_email: email(DOCTOR),
        doctor_name: None,
        appointment_date: SlotDate::parse(DATE).unwrap(),
        appointment_time: time.to_string(),
        symptoms: NonEmptyText::new("cough").unwrap(),
        status: AppointmentStatus::PendingRequest,
        serial_number: None,
        prescription: None,
        rejection_reason: None,
        created_at: created,
        approved_at: None,
        completed_at: None,
        rejected_at: None,
        cancelled_at: None,
        updated_at: created,
    }
}

pub(crate) fn slot(time: &str) -> SlotKey {
    SlotKey {
        doctor_email: email(DOCTOR),
        date: SlotDate::parse(DATE).unwrap(),
        time: time.to_string(),
    }
}

pub(crate) fn booking(patient_id: &str, time: &str) -> NewAppointmentRequest {
    NewAppointmentRequest {
        patient_id: Some(patient_id.to_string()),
        patient_name: Some(format!("Patient {patient_id}")),
        patient_email: Some(format!("{patient_id}@example.com")),
        patient_phone: Some("07700 900000".into()),
        patient_age: Some(40),
        patient_gender: None,
        doctor_email: Some(DOCTOR.to_string()),
        appointment_date: Some(DATE.to_string()),
        appointment_time: Some(time.to_string()),
        symptoms: Some("cough".into()),
    }
}

fn directory() -> StaticDirectory {
    let mut directory = StaticDirectory::new();
    directory.register_doctor(email(DOCTOR), "Dr Meredith Grey");
    directory.register_user("uid-doctor", email(DOCTOR), UserRole::Doctor);
    for n in 0..10 {
        let id = format!("uid-{n}");
        directory.register_user(id.clone(), email(&format!("{id}@example.com")), UserRole::Patient);
    }
    directory
}

pub(crate) struct Harness<S = DocumentStore> {
    pub service: AppointmentService<S>,
    pub store: Arc<S>,
}

pub(crate) fn harness(capacity: u32) -> Harness {
    harness_with_store(capacity, Arc::new(DocumentStore::in_memory()))
}

pub(crate) fn harness_with_store<S>(capacity: u32, store: Arc<S>) -> Harness<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    let defaults = CoreConfig::with_doctors([email(DOCTOR)]);
    let cfg = CoreConfig::new(
        capacity,
        defaults.slot_catalogue().to_vec(),
        BTreeSet::from([email(DOCTOR)]),
        defaults.minutes_per_patient(),
    )
    .unwrap();
    let directory = Arc::new(directory());
    let service = AppointmentService::new(
        Arc::new(cfg),
        Arc::clone(&store),
        directory.clone(),
        directory,
    );
    Harness { service, store }
}

impl<S> Harness<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Books through intake as the patient `patient_id`.
    pub async fn book(&self, patient_id: &str, time: &str) -> Appointment {
        self.service
            .request_appointment(patient_id, booking(patient_id, time))
            .await
            .unwrap()
    }

    pub async fn book_approved(&self, patient_id: &str, time: &str) -> Appointment {
        let a = self.book(patient_id, time).await;
        self.service.approve(&a.id.to_string()).await.unwrap()
    }

    /// Inserts `n` pending appointments with strictly increasing booking times.
    pub async fn insert_pending_in_order(&self, time: &str, n: i64) -> Vec<Appointment> {
        let mut booked = Vec::new();
        for m in 0..n {
            let a = appointment_at(&format!("uid-{m}"), time, m);
            match self.store.insert_unless_duplicate(a).await.unwrap() {
                InsertOutcome::Inserted(a) => booked.push(a),
                InsertOutcome::Duplicate(id) => panic!("unexpected duplicate {id}"),
            }
        }
        booked
    }
}

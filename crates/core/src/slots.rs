//! Slot capacity calculator.

use crate::model::Appointment;
use crate::service::AppointmentService;
use crate::status::AppointmentStatus;
use crate::store::{AppointmentFilter, AppointmentStore, PatientRecordStore};
use crate::validation::{catalogue_slot, known_doctor, parse_appointment_id, required_date};
use crate::AppointmentResult;
use clinic_types::AppointmentId;

/// Capacity picture for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotAvailability {
    pub available: bool,
    pub occupied: u32,
    pub capacity: u32,
}

/// Number of capacity-occupying appointments in `slot`, ignoring `exclude`.
///
/// `appointments` must already be restricted to one doctor and date.
pub fn occupied_count(appointments: &[Appointment], slot: &str, exclude: Option<AppointmentId>) -> u32 {
    let count = appointments
        .iter()
        .filter(|a| {
            a.appointment_time == slot
                && a.status.occupies_capacity()
                && Some(a.id) != exclude
        })
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Catalogue slots, in catalogue order, with fewer than `capacity` occupying appointments.
pub fn free_slots(
    catalogue: &[String],
    capacity: u32,
    appointments: &[Appointment],
    exclude: Option<AppointmentId>,
) -> Vec<String> {
    catalogue
        .iter()
        .filter(|slot| occupied_count(appointments, slot, exclude) < capacity)
        .cloned()
        .collect()
}

impl<S> AppointmentService<S>
where
    S: AppointmentStore + PatientRecordStore,
{
    /// Lists the slots a doctor can still take bookings in on `date`.
    ///
    /// # Arguments
    ///
    /// * `doctor_email` - A configured doctor.
    /// * `date` - `YYYY-MM-DD`.
    /// * `exclude` - Appointment id to leave out of the counts, so an appointment being
    ///   rescheduled does not block its own slot.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input and a store error if the store cannot be read.
    pub async fn available_slots(
        &self,
        doctor_email: &str,
        date: &str,
        exclude: Option<&str>,
    ) -> AppointmentResult<Vec<String>> {
        let doctor = known_doctor(&self.cfg, Some(doctor_email))?;
        let date = required_date("date", Some(date))?;
        let exclude = exclude.map(parse_appointment_id).transpose()?;

        let filter = AppointmentFilter::for_doctor_day(&doctor, date)
            .with_statuses(&AppointmentStatus::OCCUPYING);
        let booked = self.store.find(&filter).await?;

        Ok(free_slots(
            self.cfg.slot_catalogue(),
            self.cfg.slot_capacity(),
            &booked,
            exclude,
        ))
    }

    /// Capacity check for a single slot.
    pub async fn check_slot(
        &self,
        doctor_email: &str,
        date: &str,
        time: &str,
        exclude: Option<&str>,
    ) -> AppointmentResult<SlotAvailability> {
        let doctor = known_doctor(&self.cfg, Some(doctor_email))?;
        let date = required_date("appointmentDate", Some(date))?;
        let time = catalogue_slot(&self.cfg, Some(time))?;
        let exclude = exclude.map(parse_appointment_id).transpose()?;

        let mut filter = AppointmentFilter::for_doctor_day(&doctor, date)
            .with_statuses(&AppointmentStatus::OCCUPYING);
        filter.time = Some(time.clone());
        let booked = self.store.find(&filter).await?;

        let capacity = self.cfg.slot_capacity();
        let occupied = occupied_count(&booked, &time, exclude);
        Ok(SlotAvailability {
            available: occupied < capacity,
            occupied,
            capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{appointment_at, harness, DATE, DOCTOR};
    use crate::AppointmentError;

    #[test]
    fn free_slots_counts_pending_and_approved_only() {
        let catalogue = vec!["09:00-10:00".to_string(), "10:00-11:00".to_string()];
        let mut booked: Vec<Appointment> = (0..2)
            .map(|m| appointment_at(&format!("p{m}"), "09:00-10:00", m))
            .collect();
        booked[0].status = AppointmentStatus::Approved;
        assert_eq!(free_slots(&catalogue, 2, &booked, None), vec!["10:00-11:00"]);

        booked[1].status = AppointmentStatus::Rejected;
        assert_eq!(free_slots(&catalogue, 2, &booked, None).len(), 2);

        booked[1].status = AppointmentStatus::PendingRequest;
        let exclude = Some(booked[1].id);
        assert_eq!(free_slots(&catalogue, 2, &booked, exclude).len(), 2);
    }

    #[tokio::test]
    async fn full_slot_is_hidden_until_a_place_frees_up() {
        let h = harness(4);
        let mut approved = Vec::new();
        for p in 0..3 {
            approved.push(h.book_approved(&format!("uid-{p}"), "09:00-10:00").await);
        }
        let pending = h.book("uid-3", "09:00-10:00").await;

        let slots = h.service.available_slots(DOCTOR, DATE, None).await.unwrap();
        assert!(!slots.contains(&"09:00-10:00".to_string()));
        assert_eq!(slots.len(), 9);

        let excluded = h
            .service
            .available_slots(DOCTOR, DATE, Some(&pending.id.to_string()))
            .await
            .unwrap();
        assert!(excluded.contains(&"09:00-10:00".to_string()));

        h.service.cancel(&approved[0].id.to_string()).await.unwrap();
        let slots = h.service.available_slots(DOCTOR, DATE, None).await.unwrap();
        assert_eq!(slots[1], "09:00-10:00");
    }

    #[tokio::test]
    async fn check_slot_reports_occupancy() {
        let h = harness(2);
        h.book("uid-0", "09:00-10:00").await;

        let check = h
            .service
            .check_slot(DOCTOR, DATE, "09:00-10:00", None)
            .await
            .unwrap();
        assert_eq!(
            check,
            SlotAvailability {
                available: true,
                occupied: 1,
                capacity: 2
            }
        );

        h.book("uid-1", "09:00-10:00").await;
        let check = h
            .service
            .check_slot(DOCTOR, DATE, "09:00-10:00", None)
            .await
            .unwrap();
        assert!(!check.available);
    }

    #[tokio::test]
    async fn rejects_unknown_doctor_and_slot() {
        let h = harness(4);
        assert!(matches!(
            h.service
                .available_slots("dr.house@clinic.org", DATE, None)
                .await,
            Err(AppointmentError::UnknownDoctor(_))
        ));
        assert!(matches!(
            h.service.check_slot(DOCTOR, DATE, "07:00-08:00", None).await,
            Err(AppointmentError::InvalidInput(_))
        ));
    }
}

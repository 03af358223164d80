//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Capacity, the slot catalogue and the doctor allow-list are all
//! parameters here rather than literals spread across components, so tests can shrink or
//! reshape them freely.

use crate::constants::{DEFAULT_MINUTES_PER_PATIENT, DEFAULT_SLOT_CAPACITY, DEFAULT_SLOT_CATALOGUE};
use crate::{AppointmentError, AppointmentResult};
use chrono::NaiveTime;
use clinic_types::EmailAddress;
use std::collections::BTreeSet;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    slot_capacity: u32,
    slot_catalogue: Vec<String>,
    doctor_emails: BTreeSet<EmailAddress>,
    minutes_per_patient: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`AppointmentError::InvalidInput`] if:
    /// - `slot_capacity` or `minutes_per_patient` is zero,
    /// - the catalogue is empty, contains duplicates, or has a label that is not `HH:MM-HH:MM`
    ///   with the start before the end.
    pub fn new(
        slot_capacity: u32,
        slot_catalogue: Vec<String>,
        doctor_emails: BTreeSet<EmailAddress>,
        minutes_per_patient: u32,
    ) -> AppointmentResult<Self> {
        if slot_capacity == 0 {
            return Err(AppointmentError::InvalidInput(
                "slot_capacity must be at least 1".into(),
            ));
        }
        if minutes_per_patient == 0 {
            return Err(AppointmentError::InvalidInput(
                "minutes_per_patient must be at least 1".into(),
            ));
        }
        if slot_catalogue.is_empty() {
            return Err(AppointmentError::InvalidInput(
                "slot catalogue cannot be empty".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for label in &slot_catalogue {
            if parse_slot_label(label).is_none() {
                return Err(AppointmentError::InvalidInput(format!(
                    "slot '{label}' must look like HH:MM-HH:MM with start before end"
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(AppointmentError::InvalidInput(format!(
                    "slot '{label}' appears more than once in the catalogue"
                )));
            }
        }

        Ok(Self {
            slot_capacity,
            slot_catalogue,
            doctor_emails,
            minutes_per_patient,
        })
    }

    /// Default capacity, catalogue and consultation length with the given doctors.
    pub fn with_doctors(doctor_emails: impl IntoIterator<Item = EmailAddress>) -> Self {
        Self {
            slot_capacity: DEFAULT_SLOT_CAPACITY,
            slot_catalogue: DEFAULT_SLOT_CATALOGUE.iter().map(|s| s.to_string()).collect(),
            doctor_emails: doctor_emails.into_iter().collect(),
            minutes_per_patient: DEFAULT_MINUTES_PER_PATIENT,
        }
    }

    pub fn slot_capacity(&self) -> u32 {
        self.slot_capacity
    }

    pub fn slot_catalogue(&self) -> &[String] {
        &self.slot_catalogue
    }

    pub fn doctor_emails(&self) -> &BTreeSet<EmailAddress> {
        &self.doctor_emails
    }

    pub fn minutes_per_patient(&self) -> u32 {
        self.minutes_per_patient
    }

    pub fn is_known_doctor(&self, email: &EmailAddress) -> bool {
        self.doctor_emails.contains(email)
    }

    pub fn is_catalogue_slot(&self, label: &str) -> bool {
        self.slot_catalogue.iter().any(|s| s == label)
    }
}

/// Parses a slot label of the form `HH:MM-HH:MM` into its start and end times.
///
/// Returns `None` if either side is not a valid time or the slot does not move forwards.
pub fn parse_slot_label(label: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = label.split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    (start < end).then_some((start, end))
}

/// Parse the slot capacity from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_SLOT_CAPACITY`].
pub fn slot_capacity_from_env_value(value: Option<String>) -> AppointmentResult<u32> {
    positive_u32_from_env_value("CLINIC_SLOT_CAPACITY", value, DEFAULT_SLOT_CAPACITY)
}

/// Parse the consultation length (minutes) from an optional environment value.
pub fn minutes_per_patient_from_env_value(value: Option<String>) -> AppointmentResult<u32> {
    positive_u32_from_env_value(
        "CLINIC_MINUTES_PER_PATIENT",
        value,
        DEFAULT_MINUTES_PER_PATIENT,
    )
}

/// Parse a comma-separated doctor allow-list.
///
/// Blank entries are skipped; every other entry must be a valid email address.
pub fn doctor_emails_from_env_value(
    value: Option<String>,
) -> AppointmentResult<BTreeSet<EmailAddress>> {
    let Some(value) = value else {
        return Ok(BTreeSet::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| EmailAddress::parse(entry).map_err(AppointmentError::from))
        .collect()
}

fn positive_u32_from_env_value(
    name: &str,
    value: Option<String>,
    default: u32,
) -> AppointmentResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(default),
        Some(v) => match v.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(AppointmentError::InvalidInput(format!(
                "{name} must be a positive integer, got '{v}'"
            ))),
        },
    }
}

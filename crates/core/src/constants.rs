//! Constants used throughout the clinic core crate.
//!
//! These are defaults only. Services read the effective values from
//! [`CoreConfig`](crate::CoreConfig), which may override them at startup.

/// Default number of appointments a single slot can hold.
pub const DEFAULT_SLOT_CAPACITY: u32 = 4;

/// Default daily slot catalogue: ten one-hour slots from 08:00 to 18:00.
pub const DEFAULT_SLOT_CATALOGUE: [&str; 10] = [
    "08:00-09:00",
    "09:00-10:00",
    "10:00-11:00",
    "11:00-12:00",
    "12:00-13:00",
    "13:00-14:00",
    "14:00-15:00",
    "15:00-16:00",
    "16:00-17:00",
    "17:00-18:00",
];

/// Default consultation length used for queue time estimates.
pub const DEFAULT_MINUTES_PER_PATIENT: u32 = 15;

/// Rejection reason recorded when the doctor does not give one.
pub const NO_REASON_PROVIDED: &str = "No reason provided";

/// Default directory for the JSON document store.
pub const DEFAULT_DATA_DIR: &str = "clinic_data";

/// Filename for the appointments collection.
pub const APPOINTMENTS_FILENAME: &str = "appointments.json";

/// Filename for the patient records collection.
pub const PATIENTS_FILENAME: &str = "patients.json";

//! Builds [`AppState`] from the process environment.
//!
//! # Environment Variables
//! - `CLINIC_DATA_DIR`: JSON document store directory (default: [`DEFAULT_DATA_DIR`])
//! - `CLINIC_DIRECTORY_FILE`: optional YAML file of doctors and users
//! - `CLINIC_DOCTORS`: comma-separated doctor emails, added to those in the directory file
//! - `CLINIC_SLOT_CAPACITY`: appointments per slot (default: 4)
//! - `CLINIC_MINUTES_PER_PATIENT`: consultation length for time estimates (default: 15)

use std::path::PathBuf;
use std::sync::Arc;

use clinic_core::{
    config::{
        doctor_emails_from_env_value, minutes_per_patient_from_env_value,
        slot_capacity_from_env_value,
    },
    constants::{DEFAULT_DATA_DIR, DEFAULT_SLOT_CATALOGUE},
    AppointmentService, CoreConfig, DocumentStore, StaticDirectory,
};

use crate::AppState;

/// Reads configuration from the environment, loads the directory and opens the store.
///
/// # Errors
///
/// Returns an error if:
/// - a numeric setting or doctor email is malformed,
/// - the directory file cannot be read or parsed,
/// - the resulting configuration is invalid, or
/// - the document store cannot be opened.
pub fn load_state_from_env() -> anyhow::Result<AppState> {
    let directory = match std::env::var("CLINIC_DIRECTORY_FILE").ok() {
        Some(path) if !path.trim().is_empty() => {
            let path = PathBuf::from(path);
            tracing::info!("loading directory from {}", path.display());
            StaticDirectory::load(&path)?
        }
        _ => StaticDirectory::new(),
    };

    let mut doctors = doctor_emails_from_env_value(std::env::var("CLINIC_DOCTORS").ok())?;
    doctors.extend(directory.doctor_emails());
    if doctors.is_empty() {
        tracing::warn!("no doctors configured; every booking will be rejected");
    }

    let cfg = CoreConfig::new(
        slot_capacity_from_env_value(std::env::var("CLINIC_SLOT_CAPACITY").ok())?,
        DEFAULT_SLOT_CATALOGUE.iter().map(|s| s.to_string()).collect(),
        doctors,
        minutes_per_patient_from_env_value(std::env::var("CLINIC_MINUTES_PER_PATIENT").ok())?,
    )?;
    tracing::info!(
        "{} doctors, {} slots per day, capacity {} per slot",
        cfg.doctor_emails().len(),
        cfg.slot_catalogue().len(),
        cfg.slot_capacity()
    );

    let data_dir = std::env::var("CLINIC_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let store = DocumentStore::open(&data_dir)?;

    let directory = Arc::new(directory);
    let service = AppointmentService::new(
        Arc::new(cfg),
        Arc::new(store),
        directory.clone(),
        directory,
    );
    Ok(AppState::new(service))
}

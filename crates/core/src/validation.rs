//! Input validation utilities.
//!
//! Raw strings arriving from HTTP or the CLI are turned into validated types here, so every
//! failure surfaces as an [`AppointmentError::InvalidInput`] naming the offending field.

use crate::config::CoreConfig;
use crate::{AppointmentError, AppointmentResult};
use clinic_types::{AppointmentId, EmailAddress, NonEmptyText, SlotDate};

/// Parses an appointment id as produced by the store.
///
/// # Errors
///
/// Returns `AppointmentError::InvalidInput` if `raw` is not a canonical 32-character hex id.
pub fn parse_appointment_id(raw: &str) -> AppointmentResult<AppointmentId> {
    AppointmentId::parse(raw.trim())
        .map_err(|e| AppointmentError::InvalidInput(format!("appointment id: {e}")))
}

/// Requires a field to be present and non-blank.
///
/// # Arguments
///
/// * `field` - Wire name of the field, used in the error message.
/// * `value` - The raw value, if supplied.
pub fn required_text(field: &str, value: Option<&str>) -> AppointmentResult<NonEmptyText> {
    value
        .and_then(|v| NonEmptyText::new(v).ok())
        .ok_or_else(|| AppointmentError::InvalidInput(format!("{field} is required")))
}

/// Trims an optional field, treating blank input as absent.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn required_email(field: &str, value: Option<&str>) -> AppointmentResult<EmailAddress> {
    let text = required_text(field, value)?;
    EmailAddress::parse(text.as_str())
        .map_err(|e| AppointmentError::InvalidInput(format!("{field}: {e}")))
}

pub fn required_date(field: &str, value: Option<&str>) -> AppointmentResult<SlotDate> {
    let text = required_text(field, value)?;
    SlotDate::parse(text.as_str())
        .map_err(|e| AppointmentError::InvalidInput(format!("{field}: {e}")))
}

/// Parses a doctor email and checks it against the configured allow-list.
///
/// # Errors
///
/// Returns `InvalidInput` when the email is missing or malformed and `UnknownDoctor` when it
/// is well formed but not a configured doctor.
pub fn known_doctor(cfg: &CoreConfig, value: Option<&str>) -> AppointmentResult<EmailAddress> {
    let email = required_email("doctorEmail", value)?;
    if !cfg.is_known_doctor(&email) {
        return Err(AppointmentError::UnknownDoctor(email.to_string()));
    }
    Ok(email)
}

/// Requires `value` to be one of the configured slot labels.
pub fn catalogue_slot(cfg: &CoreConfig, value: Option<&str>) -> AppointmentResult<String> {
    let text = required_text("appointmentTime", value)?;
    let label = text.into_inner();
    if !cfg.is_catalogue_slot(&label) {
        return Err(AppointmentError::InvalidInput(format!(
            "appointmentTime '{label}' is not an available slot"
        )));
    }
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CoreConfig {
        CoreConfig::with_doctors([EmailAddress::parse("dr.grey@clinic.org").unwrap()])
    }

    #[test]
    fn required_text_names_the_missing_field() {
        let err = required_text("symptoms", Some("   ")).unwrap_err();
        assert_eq!(err.to_string(), "invalid input: symptoms is required");
        assert!(required_text("symptoms", None).is_err());
        assert_eq!(required_text("symptoms", Some(" cough ")).unwrap().as_str(), "cough");
    }

    #[test]
    fn optional_text_drops_blank_values() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" f ".into())).as_deref(), Some("f"));
    }

    #[test]
    fn doctor_must_be_on_allow_list() {
        let cfg = cfg();
        assert!(known_doctor(&cfg, Some("DR.GREY@clinic.org")).is_ok());
        assert!(matches!(
            known_doctor(&cfg, Some("dr.house@clinic.org")),
            Err(AppointmentError::UnknownDoctor(_))
        ));
        assert!(matches!(
            known_doctor(&cfg, Some("house")),
            Err(AppointmentError::InvalidInput(_))
        ));
    }

    #[test]
    fn slot_must_be_in_catalogue() {
        let cfg = cfg();
        assert_eq!(catalogue_slot(&cfg, Some("09:00-10:00")).unwrap(), "09:00-10:00");
        assert!(catalogue_slot(&cfg, Some("07:00-08:00")).is_err());
        assert!(catalogue_slot(&cfg, None).is_err());
    }

    #[test]
    fn dates_and_ids_are_strict() {
        assert!(required_date("appointmentDate", Some("2024-06-03")).is_ok());
        assert!(required_date("appointmentDate", Some("03/06/2024")).is_err());
        assert!(parse_appointment_id("not-an-id").is_err());
        let id = AppointmentId::generate();
        assert_eq!(parse_appointment_id(&id.to_string()).unwrap(), id);
    }
}

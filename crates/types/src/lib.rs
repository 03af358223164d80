//! Validated primitive types shared across the clinic crates.
//!
//! Each type checks its invariant once at construction, so code holding one can rely on it
//! without re-validating:
//! - [`NonEmptyText`]: trimmed, never empty
//! - [`EmailAddress`]: trimmed, lower-cased, contains a single `@`
//! - [`AppointmentId`]: canonical 32 lowercase hex UUID
//! - [`SlotDate`]: calendar date in `YYYY-MM-DD` form

use chrono::NaiveDate;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors that can occur when parsing an email address.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email is not valid: '{0}'")]
    Malformed(String),
}

/// Errors that can occur when parsing identifiers and dates.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    #[error("appointment id must be 32 lowercase hex characters without hyphens, got: '{0}'")]
    NotCanonical(String),
    #[error("date must be YYYY-MM-DD, got: '{0}'")]
    InvalidDate(String),
}

// ============================================================================
// NonEmptyText
// ============================================================================

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// EmailAddress
// ============================================================================

/// A normalised email address.
///
/// Doctor and patient emails are compared case-insensitively throughout the system, so the
/// value is lower-cased once here and the rest of the code compares plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses and normalises an email address.
    ///
    /// The check is deliberately shallow: exactly one `@` with text on both sides. Deliverability
    /// is the identity provider's concern.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Empty`] for blank input and [`EmailError::Malformed`] otherwise.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, EmailError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }

        let mut parts = trimmed.split('@');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
        );
        if !well_formed || trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Malformed(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for EmailAddress {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for EmailAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EmailAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// AppointmentId
// ============================================================================

/// Canonical appointment identifier (32 lowercase hex characters, no hyphens).
///
/// Identifiers are generated by the store on insert. Externally supplied identifiers (URL path
/// segments, CLI arguments) must already be canonical; other UUID spellings are rejected rather
/// than normalised so that one appointment only ever has one textual id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppointmentId(Uuid);

impl AppointmentId {
    /// Generates a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::NotCanonical`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        if !Self::is_canonical(input) {
            return Err(IdError::NotCanonical(input.to_owned()));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| IdError::NotCanonical(input.to_owned()))
    }

    /// Returns true if `input` is in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for AppointmentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentId::parse(s)
    }
}

impl serde::Serialize for AppointmentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for AppointmentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AppointmentId::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SlotDate
// ============================================================================

/// A calendar date serialised as `YYYY-MM-DD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotDate(NaiveDate);

impl SlotDate {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    /// # Errors
    ///
    /// Returns [`IdError::InvalidDate`] unless `input` is a real date in `YYYY-MM-DD` form.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let trimmed = input.trim();
        // chrono accepts single-digit months/days; the wire format does not.
        if trimmed.len() != 10 {
            return Err(IdError::InvalidDate(trimmed.to_owned()));
        }
        NaiveDate::parse_from_str(trimmed, Self::FORMAT)
            .map(Self)
            .map_err(|_| IdError::InvalidDate(trimmed.to_owned()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for SlotDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for SlotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for SlotDate {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotDate::parse(s)
    }
}

impl serde::Serialize for SlotDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for SlotDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SlotDate::parse(&s).map_err(serde::de::Error::custom)
    }
}

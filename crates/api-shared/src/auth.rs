//! Caller identification for booking requests.
//!
//! The identity provider behind the core resolves the id; this module only extracts it from
//! the transport.

/// Header carrying the opaque id of the calling user.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing x-user-id header")]
    MissingUserId,
}

/// Returns the trimmed caller id from a raw header value.
///
/// # Errors
///
/// Returns `AuthError::MissingUserId` if the header is absent or blank.
pub fn requester_id(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AuthError::MissingUserId)
}

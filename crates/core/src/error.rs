use crate::directory::DirectoryError;
use crate::status::{TransitionError, UnknownStatus};
use crate::store::StoreError;
use clinic_types::{AppointmentId, EmailError, IdError, TextError};

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown doctor: {0}")]
    UnknownDoctor(String),
    #[error("patient not found: {0}")]
    PatientNotFound(String),
    #[error("not permitted: {0}")]
    UnauthorisedRole(String),
    #[error("an active request already exists for this patient, doctor and slot")]
    DuplicateRequest,

    #[error("appointment not found or already processed: {0}")]
    NotFoundOrAlreadyProcessed(AppointmentId),
    #[error("appointment not found: {0}")]
    NotFound(AppointmentId),
    #[error("appointment is not active: {0}")]
    NotActive(AppointmentId),
    #[error("appointment is not completed: {0}")]
    NotCompleted(AppointmentId),
    #[error("patient record not found: {0}")]
    PatientRecordNotFound(String),

    #[error("queue is full for {slot} ({capacity} approved)")]
    QueueFull { slot: String, capacity: u32 },
    #[error("slot {slot} is unavailable")]
    SlotUnavailable { slot: String },
    #[error("illegal transition: {0}")]
    IllegalTransition(#[from] TransitionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
}

pub type AppointmentResult<T> = std::result::Result<T, AppointmentError>;

/// Stable, transport-independent classification of an [`AppointmentError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Forbidden,
    NotFound,
    Conflict,
    Store,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Store => "store",
        }
    }
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        use AppointmentError::*;

        match self {
            InvalidInput(_) | UnknownDoctor(_) => ErrorKind::Validation,
            UnauthorisedRole(_) => ErrorKind::Forbidden,
            PatientNotFound(_)
            | NotFoundOrAlreadyProcessed(_)
            | NotFound(_)
            | NotActive(_)
            | PatientRecordNotFound(_) => ErrorKind::NotFound,
            DuplicateRequest
            | QueueFull { .. }
            | SlotUnavailable { .. }
            | IllegalTransition(_)
            | NotCompleted(_) => ErrorKind::Conflict,
            Store(_) | Directory(_) => ErrorKind::Store,
        }
    }
}

impl From<TextError> for AppointmentError {
    fn from(err: TextError) -> Self {
        AppointmentError::InvalidInput(err.to_string())
    }
}

impl From<EmailError> for AppointmentError {
    fn from(err: EmailError) -> Self {
        AppointmentError::InvalidInput(err.to_string())
    }
}

impl From<IdError> for AppointmentError {
    fn from(err: IdError) -> Self {
        AppointmentError::InvalidInput(err.to_string())
    }
}

impl From<UnknownStatus> for AppointmentError {
    fn from(err: UnknownStatus) -> Self {
        AppointmentError::InvalidInput(err.to_string())
    }
}

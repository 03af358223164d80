//! Read-only collaborators: the doctor directory and the identity provider.
//!
//! The core never manages users or doctors itself. It asks a [`DoctorDirectory`] for display
//! names and an [`IdentityProvider`] to resolve the caller of an operation. [`StaticDirectory`]
//! implements both from a YAML file of the form:
//!
//! ```yaml
//! doctors:
//!   - email: dr.grey@clinic.org
//!     name: Dr Meredith Grey
//! users:
//!   - id: uid-ada
//!     email: ada@example.com
//!     role: patient
//! ```

use async_trait::async_trait;
use clinic_types::EmailAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read directory file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to parse directory YAML: {0}")]
    Parse(serde_yaml::Error),
    #[error("directory entry is invalid: {0}")]
    InvalidEntry(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Role attached to a resolved identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Doctor,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Doctor => "doctor",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of an operation, as resolved by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: String,
    pub email: EmailAddress,
    pub role: UserRole,
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Display name for a doctor, if the directory knows one.
    async fn display_name(&self, email: &EmailAddress) -> DirectoryResult<Option<String>>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves an opaque user id. `Ok(None)` means the user does not exist.
    async fn resolve(&self, user_id: &str) -> DirectoryResult<Option<ResolvedIdentity>>;
}

// ============================================================================
// STATIC DIRECTORY
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    doctors: Vec<DoctorEntry>,
    #[serde(default)]
    users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize)]
struct DoctorEntry {
    email: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    id: String,
    email: String,
    role: UserRole,
}

/// In-process directory and identity provider.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    doctors: BTreeMap<EmailAddress, String>,
    users: BTreeMap<String, ResolvedIdentity>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Parse` for malformed YAML and `DirectoryError::InvalidEntry`
    /// for entries with a bad email or an empty user id.
    pub fn from_yaml(yaml: &str) -> DirectoryResult<Self> {
        let file: DirectoryFile = if yaml.trim().is_empty() {
            DirectoryFile::default()
        } else {
            serde_yaml::from_str(yaml).map_err(DirectoryError::Parse)?
        };

        let mut directory = Self::new();
        for doctor in file.doctors {
            let email = parse_entry_email(&doctor.email)?;
            directory.register_doctor(email, doctor.name);
        }
        for user in file.users {
            let email = parse_entry_email(&user.email)?;
            if user.id.trim().is_empty() {
                return Err(DirectoryError::InvalidEntry(format!(
                    "user {email} has an empty id"
                )));
            }
            directory.register_user(user.id.trim(), email, user.role);
        }
        Ok(directory)
    }

    /// Loads a directory YAML file from disk.
    pub fn load(path: &Path) -> DirectoryResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(DirectoryError::FileRead)?;
        let directory = Self::from_yaml(&yaml)?;
        tracing::info!(
            "loaded directory from {} ({} doctors, {} users)",
            path.display(),
            directory.doctors.len(),
            directory.users.len()
        );
        Ok(directory)
    }

    pub fn register_doctor(&mut self, email: EmailAddress, name: impl Into<String>) {
        self.doctors.insert(email, name.into());
    }

    pub fn register_user(&mut self, user_id: impl Into<String>, email: EmailAddress, role: UserRole) {
        let user_id = user_id.into();
        self.users.insert(
            user_id.clone(),
            ResolvedIdentity {
                user_id,
                email,
                role,
            },
        );
    }

    /// Emails of every doctor in the directory; used to seed the allow-list.
    pub fn doctor_emails(&self) -> impl Iterator<Item = EmailAddress> + '_ {
        self.doctors.keys().cloned()
    }
}

fn parse_entry_email(raw: &str) -> DirectoryResult<EmailAddress> {
    EmailAddress::parse(raw).map_err(|e| DirectoryError::InvalidEntry(e.to_string()))
}

#[async_trait]
impl DoctorDirectory for StaticDirectory {
    async fn display_name(&self, email: &EmailAddress) -> DirectoryResult<Option<String>> {
        Ok(self.doctors.get(email).cloned())
    }
}

#[async_trait]
impl IdentityProvider for StaticDirectory {
    async fn resolve(&self, user_id: &str) -> DirectoryResult<Option<ResolvedIdentity>> {
        Ok(self.users.get(user_id.trim()).cloned())
    }
}

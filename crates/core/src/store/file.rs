//! JSON file persistence for [`DocumentStore`](super::DocumentStore).
//!
//! Layout under the data directory:
//! - `appointments.json`: array of appointment documents
//! - `patients.json`: array of patient records
//!
//! Writes go to a sibling temp file first and are then renamed over the target, so a crash
//! mid-write leaves the previous version intact. Unchanged collections are not rewritten.

use super::state::StoreState;
use super::{StoreError, StoreResult};
use crate::constants::{APPOINTMENTS_FILENAME, PATIENTS_FILENAME};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub(crate) fn load_state(dir: &Path) -> StoreResult<StoreState> {
    fs::create_dir_all(dir).map_err(StoreError::DirCreation)?;

    let appointments = read_collection(&dir.join(APPOINTMENTS_FILENAME))?;
    let patients = read_collection(&dir.join(PATIENTS_FILENAME))?;
    Ok(StoreState::from_documents(appointments, patients))
}

/// Persists `after`, writing only the collections that differ from `before`.
///
/// Every changed collection is staged to its temp file before any rename happens. If a
/// rename fails, collections already renamed are restored to their `before` contents, so a
/// failed save leaves the directory as it was.
pub(crate) async fn save_state(
    dir: &Path,
    before: &StoreState,
    after: &StoreState,
) -> StoreResult<()> {
    let mut staged = Vec::new();
    for (name, previous, next) in [
        (
            APPOINTMENTS_FILENAME,
            encode(before.appointments.values())?,
            encode(after.appointments.values())?,
        ),
        (
            PATIENTS_FILENAME,
            encode(before.patients.values())?,
            encode(after.patients.values())?,
        ),
    ] {
        if previous != next {
            staged.push(StagedWrite::new(dir.join(name), previous, next));
        }
    }

    for (i, write) in staged.iter().enumerate() {
        if let Err(err) = tokio::fs::write(&write.tmp, &write.next).await {
            discard(&staged[..=i]).await;
            return Err(StoreError::FileWrite(err));
        }
    }

    for (i, write) in staged.iter().enumerate() {
        if let Err(err) = tokio::fs::rename(&write.tmp, &write.path).await {
            restore(&staged[..i]).await;
            discard(&staged[i..]).await;
            return Err(StoreError::FileWrite(err));
        }
    }
    Ok(())
}

struct StagedWrite {
    path: PathBuf,
    tmp: PathBuf,
    previous: String,
    next: String,
}

impl StagedWrite {
    fn new(path: PathBuf, previous: String, next: String) -> Self {
        let tmp = path.with_extension("json.tmp");
        Self {
            path,
            tmp,
            previous,
            next,
        }
    }
}

fn encode<'a, T: Serialize + 'a>(items: impl Iterator<Item = &'a T>) -> StoreResult<String> {
    let items: Vec<&T> = items.collect();
    serde_json::to_string_pretty(&items).map_err(StoreError::Serialization)
}

async fn discard(writes: &[StagedWrite]) {
    for write in writes {
        let _ = tokio::fs::remove_file(&write.tmp).await;
    }
}

async fn restore(writes: &[StagedWrite]) {
    for write in writes {
        if let Err(err) = tokio::fs::write(&write.path, &write.previous).await {
            tracing::error!(
                "failed to restore {} after aborted save: {}",
                write.path.display(),
                err
            );
        }
    }
}

fn read_collection<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
        Ok(contents) => serde_json::from_str(&contents).map_err(StoreError::Deserialization),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(StoreError::FileRead(err)),
    }
}

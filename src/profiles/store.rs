use anyhow::Context;
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::ScoringProfile;

/// Storage abstraction for named scoring profiles.
///
/// Each call is an independent, whole read or write of the store; callers
/// never hold a lock across calls.
pub trait ProfileStore: Send + Sync {
    fn list(&self) -> Result<Vec<ScoringProfile>, StoreError>;
    fn get(&self, id: &str) -> Result<Option<ScoringProfile>, StoreError>;
    fn create(&self, profile: ScoringProfile) -> Result<(), StoreError>;
    fn update(&self, profile: ScoringProfile) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile already exists: {0}")]
    Conflict(String),
    #[error("profile not found: {0}")]
    NotFound(String),
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(value: anyhow::Error) -> Self {
        StoreError::Unavailable(format!("{:#}", value))
    }
}

fn insert_new(profiles: &mut Vec<ScoringProfile>, profile: ScoringProfile) -> Result<(), StoreError> {
    if profiles.iter().any(|existing| existing.id == profile.id) {
        return Err(StoreError::Conflict(profile.id));
    }
    profiles.push(profile);
    Ok(())
}

fn replace_existing(
    profiles: &mut [ScoringProfile],
    profile: ScoringProfile,
) -> Result<(), StoreError> {
    match profiles.iter_mut().find(|existing| existing.id == profile.id) {
        Some(slot) => {
            *slot = profile;
            Ok(())
        }
        None => Err(StoreError::NotFound(profile.id)),
    }
}

/// In-process store, mainly for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<Vec<ScoringProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<ScoringProfile>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ScoringProfile>>, StoreError> {
        self.profiles
            .lock()
            .map_err(|_| StoreError::Unavailable("profile store lock poisoned".to_string()))
    }
}

impl ProfileStore for MemoryProfileStore {
    fn list(&self) -> Result<Vec<ScoringProfile>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn get(&self, id: &str) -> Result<Option<ScoringProfile>, StoreError> {
        Ok(self.lock()?.iter().find(|p| p.id == id).cloned())
    }

    fn create(&self, profile: ScoringProfile) -> Result<(), StoreError> {
        insert_new(&mut *self.lock()?, profile)
    }

    fn update(&self, profile: ScoringProfile) -> Result<(), StoreError> {
        replace_existing(&mut self.lock()?, profile)
    }
}

const PROFILE_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ProfileFile {
    version: u32,
    #[serde(default)]
    profiles: Vec<ScoringProfile>,
}

/// Profiles persisted as one versioned JSON document.
///
/// Reads always go back to disk and writes replace the file atomically, so a
/// read racing a write sees either the old or the new document in full.
/// Writes take no lock: two concurrent saves both re-read then replace the
/// file, and the last writer wins.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is an empty store.
    fn read(&self) -> anyhow::Result<Vec<ScoringProfile>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open profile file at {}", self.path.display()))?;
        let document: ProfileFile =
            serde_json::from_reader(file).context("Failed to parse profile file")?;

        if document.version != PROFILE_FILE_VERSION {
            anyhow::bail!("Unsupported profile file version: {}", document.version);
        }

        Ok(document.profiles)
    }

    fn write(&self, profiles: Vec<ScoringProfile>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create profile directory at {}", parent.display())
            })?;
        }

        let mut file = AtomicWriteFile::open(&self.path).with_context(|| {
            format!("Failed to open atomic write file at {}", self.path.display())
        })?;

        let document = ProfileFile {
            version: PROFILE_FILE_VERSION,
            profiles,
        };
        serde_json::to_writer_pretty(&mut file, &document)
            .context("Failed to serialize profiles")?;

        file.commit().context("Failed to save profiles")?;

        Ok(())
    }
}

impl ProfileStore for JsonProfileStore {
    fn list(&self) -> Result<Vec<ScoringProfile>, StoreError> {
        Ok(self.read()?)
    }

    fn get(&self, id: &str) -> Result<Option<ScoringProfile>, StoreError> {
        Ok(self.read()?.into_iter().find(|p| p.id == id))
    }

    fn create(&self, profile: ScoringProfile) -> Result<(), StoreError> {
        let mut profiles = self.read()?;
        insert_new(&mut profiles, profile)?;
        Ok(self.write(profiles)?)
    }

    fn update(&self, profile: ScoringProfile) -> Result<(), StoreError> {
        let mut profiles = self.read()?;
        replace_existing(&mut profiles, profile)?;
        Ok(self.write(profiles)?)
    }
}

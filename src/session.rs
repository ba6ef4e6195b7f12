use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ScoringError;
use crate::profiles::{ConfigurationManager, ProfileStore};
use crate::scoring::LoanType;

/// The CLI's remembered selection between invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub version: u32,
    pub loan_type: LoanType,
    #[serde(default)]
    pub active_profile: Option<String>,
}

impl SessionState {
    /// Create a new session state with version 1
    pub fn new(loan_type: LoanType) -> Self {
        Self {
            version: 1,
            loan_type,
            active_profile: None,
        }
    }

    /// Capture what a manager currently has selected.
    pub fn capture<S: ProfileStore>(manager: &ConfigurationManager<S>) -> Self {
        Self {
            version: 1,
            loan_type: manager.loan_type(),
            active_profile: manager.selection().profile_id().map(str::to_string),
        }
    }

    /// Rebuild a manager's selection from this state.
    ///
    /// A remembered profile that no longer exists is dropped with a warning;
    /// the manager then stays on the loan type preset.
    pub fn restore<S: ProfileStore>(&self, manager: &mut ConfigurationManager<S>) -> Result<()> {
        manager.set_loan_type(self.loan_type);

        if let Some(id) = &self.active_profile {
            match manager.load_profile(id) {
                Ok(_) => {}
                Err(ScoringError::ProfileNotFound(_)) => {
                    warn!(profile = %id, "remembered profile no longer exists");
                }
                Err(err) => return Err(err).context("Failed to restore active profile"),
            }
        }
        Ok(())
    }
}

/// Get the default session file path (~/.config/loan-score/session.json)
pub fn get_session_path() -> PathBuf {
    crate::config::get_config_dir().join("session.json")
}

/// Load session state from a JSON file
///
/// If the file doesn't exist, returns a new state on `loan_type`.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_session(path: &Path, loan_type: LoanType) -> Result<SessionState> {
    if !path.exists() {
        return Ok(SessionState::new(loan_type));
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open session file at {}", path.display()))?;

    let state: SessionState = serde_json::from_reader(file).context("Failed to load session")?;

    if state.version != 1 {
        anyhow::bail!("Unsupported session version: {}", state.version);
    }

    Ok(state)
}

/// Save session state to a JSON file atomically
pub fn save_session(path: &Path, state: &SessionState) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory at {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, state).context("Failed to serialize session")?;

    file.commit().context("Failed to save session")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{MemoryProfileStore, ProfileDraft};
    use crate::scoring::{preset, ActiveSelection};
    use std::env;

    #[test]
    fn test_load_missing_file_returns_new() {
        let temp_path = env::temp_dir().join("loan_score_test_session_missing.json");
        let _ = std::fs::remove_file(&temp_path);

        let state = load_session(&temp_path, LoanType::Equipment).unwrap();
        assert_eq!(state, SessionState::new(LoanType::Equipment));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_path = env::temp_dir().join("loan_score_test_session_roundtrip.json");
        let _ = std::fs::remove_file(&temp_path);

        let state = SessionState {
            version: 1,
            loan_type: LoanType::RealEstate,
            active_profile: Some("house-policy".to_string()),
        };
        save_session(&temp_path, &state).unwrap();

        let loaded = load_session(&temp_path, LoanType::General).unwrap();
        assert_eq!(loaded, state);

        let _ = std::fs::remove_file(&temp_path);
    }

    #[test]
    fn test_capture_and_restore() {
        let store = MemoryProfileStore::new();
        let mut first = ConfigurationManager::new(store, LoanType::General);
        first
            .save_profile(ProfileDraft::new("Policy", preset(LoanType::RealEstate)))
            .unwrap();
        first.set_loan_type(LoanType::Equipment);

        let state = SessionState::capture(&first);
        assert_eq!(state.active_profile.as_deref(), Some("policy"));
        assert_eq!(state.loan_type, LoanType::Equipment);

        let profiles = first.list_profiles().unwrap();
        let mut second =
            ConfigurationManager::new(MemoryProfileStore::with_profiles(profiles), LoanType::General);
        state.restore(&mut second).unwrap();
        assert_eq!(second.selection().profile_id(), Some("policy"));
        assert_eq!(second.loan_type(), LoanType::Equipment);
    }

    #[test]
    fn test_restore_with_vanished_profile_falls_back() {
        let state = SessionState {
            version: 1,
            loan_type: LoanType::Equipment,
            active_profile: Some("deleted".to_string()),
        };
        let mut manager = ConfigurationManager::new(MemoryProfileStore::new(), LoanType::General);
        state.restore(&mut manager).unwrap();

        assert_eq!(
            manager.selection(),
            &ActiveSelection::NoProfile {
                loan_type: LoanType::Equipment
            }
        );
    }
}

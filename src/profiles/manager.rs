use chrono::Utc;
use tracing::{info, warn};

use super::store::ProfileStore;
use super::types::{unique_id, ProfileDraft, ScoringProfile};
use crate::error::{Result, ScoringError};
use crate::scoring::{
    resolve_weights, validate_profile, ActiveConfig, ActiveSelection, ConfigSource, LoanType,
    ThresholdCatalog,
};

/// Owns the user-facing "active configuration" and hands out immutable
/// [`ActiveConfig`] snapshots for scoring.
///
/// One manager per session; scoring itself never reads from here.
pub struct ConfigurationManager<S: ProfileStore> {
    store: S,
    loan_type: LoanType,
    selection: ActiveSelection,
    preset_thresholds: ThresholdCatalog,
}

impl<S: ProfileStore> ConfigurationManager<S> {
    pub fn new(store: S, loan_type: LoanType) -> Self {
        Self {
            store,
            loan_type,
            selection: ActiveSelection::NoProfile { loan_type },
            preset_thresholds: ThresholdCatalog::builtin(),
        }
    }

    /// Threshold catalog used while no profile is loaded.
    pub fn with_preset_thresholds(mut self, thresholds: ThresholdCatalog) -> Self {
        self.preset_thresholds = thresholds;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn selection(&self) -> &ActiveSelection {
        &self.selection
    }

    /// The loan type last selected, whether or not it currently drives weights.
    pub fn loan_type(&self) -> LoanType {
        self.loan_type
    }

    pub fn active_profile(&self) -> Option<&ScoringProfile> {
        match &self.selection {
            ActiveSelection::NoProfile { .. } => None,
            ActiveSelection::ProfileLoaded { profile } => Some(profile),
        }
    }

    pub fn active_config(&self) -> ActiveConfig {
        let weights = resolve_weights(&self.selection);
        match &self.selection {
            ActiveSelection::NoProfile { loan_type } => ActiveConfig {
                source: ConfigSource::Preset {
                    loan_type: *loan_type,
                },
                weights,
                thresholds: self.preset_thresholds.clone(),
            },
            ActiveSelection::ProfileLoaded { profile } => ActiveConfig {
                source: ConfigSource::Profile {
                    id: profile.id.clone(),
                    name: profile.name.clone(),
                },
                weights,
                thresholds: profile.thresholds.clone(),
            },
        }
    }

    /// Select a loan type. Only changes the weights while no profile is loaded.
    pub fn set_loan_type(&mut self, loan_type: LoanType) {
        self.loan_type = loan_type;
        if let ActiveSelection::NoProfile { .. } = self.selection {
            self.selection = ActiveSelection::NoProfile { loan_type };
        }
    }

    pub fn list_profiles(&self) -> Result<Vec<ScoringProfile>> {
        Ok(self.store.list()?)
    }

    /// Validate, persist and activate a new profile.
    pub fn save_profile(&mut self, draft: ProfileDraft) -> Result<ScoringProfile> {
        validate_profile(&draft.name, &draft.weights, &draft.thresholds)
            .map_err(ScoringError::InvalidProfile)?;

        let existing = self.store.list()?;
        let id = unique_id(&draft.name, existing.iter().map(|p| p.id.as_str()));
        let now = Utc::now();

        let profile = ScoringProfile {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            weights: draft.weights,
            thresholds: draft.thresholds,
            created_at: now,
            updated_at: now,
            is_default: draft.is_default,
        };

        self.store.create(profile.clone())?;
        if profile.is_default {
            self.clear_other_defaults(&existing, &profile.id)?;
        }
        info!(profile = %profile.id, default = profile.is_default, "saved scoring profile");

        self.selection = ActiveSelection::ProfileLoaded {
            profile: Box::new(profile.clone()),
        };
        Ok(profile)
    }

    /// Activate a stored profile. An unknown id leaves the selection untouched.
    pub fn load_profile(&mut self, id: &str) -> Result<&ScoringProfile> {
        let profile = self
            .store
            .get(id)?
            .ok_or_else(|| ScoringError::ProfileNotFound(id.to_string()))?;
        info!(profile = %profile.id, "loaded scoring profile");

        self.selection = ActiveSelection::ProfileLoaded {
            profile: Box::new(profile),
        };
        self.active_profile()
            .ok_or_else(|| ScoringError::ProfileNotFound(id.to_string()))
    }

    /// Replace a stored profile's contents, keeping its id and creation time.
    pub fn update_profile(&mut self, id: &str, draft: ProfileDraft) -> Result<ScoringProfile> {
        let current = self
            .store
            .get(id)?
            .ok_or_else(|| ScoringError::ProfileNotFound(id.to_string()))?;
        validate_profile(&draft.name, &draft.weights, &draft.thresholds)
            .map_err(ScoringError::InvalidProfile)?;

        let profile = ScoringProfile {
            id: current.id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            weights: draft.weights,
            thresholds: draft.thresholds,
            created_at: current.created_at,
            updated_at: Utc::now(),
            is_default: draft.is_default,
        };

        self.store.update(profile.clone())?;
        if profile.is_default {
            let existing = self.store.list()?;
            self.clear_other_defaults(&existing, &profile.id)?;
        }
        info!(profile = %profile.id, "updated scoring profile");

        if self.selection.profile_id() == Some(profile.id.as_str()) {
            self.selection = ActiveSelection::ProfileLoaded {
                profile: Box::new(profile.clone()),
            };
        }
        Ok(profile)
    }

    /// Load the default profile, or fall back to the current loan type preset.
    pub fn reset_to_defaults(&mut self) -> Result<&ActiveSelection> {
        let mut defaults: Vec<ScoringProfile> = self
            .store
            .list()?
            .into_iter()
            .filter(|p| p.is_default)
            .collect();

        if defaults.len() > 1 {
            warn!(
                count = defaults.len(),
                "several profiles flagged default; using the most recently updated"
            );
        }
        defaults.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        self.selection = match defaults.into_iter().next() {
            Some(profile) => {
                info!(profile = %profile.id, "reset to default profile");
                ActiveSelection::ProfileLoaded {
                    profile: Box::new(profile),
                }
            }
            None => {
                info!(loan_type = %self.loan_type, "reset to loan type preset");
                ActiveSelection::NoProfile {
                    loan_type: self.loan_type,
                }
            }
        };
        Ok(&self.selection)
    }

    fn clear_other_defaults(&self, existing: &[ScoringProfile], keep: &str) -> Result<()> {
        for other in existing.iter().filter(|p| p.is_default && p.id != keep) {
            let mut demoted = other.clone();
            demoted.is_default = false;
            demoted.updated_at = Utc::now();
            self.store.update(demoted)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::borrower::{BorrowerData, CategoryInput};
    use crate::profiles::{MemoryProfileStore, StoreError};
    use crate::scoring::{calculate_scores, preset, CategoryId, RangeBand, ThresholdRule, Weights};

    fn manager() -> ConfigurationManager<MemoryProfileStore> {
        ConfigurationManager::new(MemoryProfileStore::new(), LoanType::General)
    }

    fn custom_weights() -> Weights {
        Weights::new()
            .with(CategoryId::Creditworthiness, 50.0)
            .with(CategoryId::Cashflow, 30.0)
    }

    #[test]
    fn test_starts_on_loan_type_preset() {
        let mgr = manager();
        assert_eq!(
            mgr.selection(),
            &ActiveSelection::NoProfile {
                loan_type: LoanType::General
            }
        );
        assert_eq!(mgr.active_config().weights, preset(LoanType::General));
    }

    #[test]
    fn test_scenario_c_equipment_preset() {
        let mut mgr = manager();
        mgr.set_loan_type(LoanType::Equipment);

        let config = mgr.active_config();
        let expected = Weights::new()
            .with(CategoryId::Creditworthiness, 30.0)
            .with(CategoryId::Financial, 20.0)
            .with(CategoryId::Cashflow, 15.0)
            .with(CategoryId::Legal, 15.0)
            .with(CategoryId::Equipment, 20.0)
            .with(CategoryId::Property, 0.0);
        assert_eq!(config.weights, expected);
        assert_eq!(config.weights.total(), 100.0);
        assert_eq!(
            config.source,
            ConfigSource::Preset {
                loan_type: LoanType::Equipment
            }
        );
    }

    #[test]
    fn test_loan_type_ignored_while_profile_loaded() {
        let mut mgr = manager();
        mgr.save_profile(ProfileDraft::new("Custom", custom_weights()))
            .unwrap();

        mgr.set_loan_type(LoanType::RealEstate);
        assert_eq!(mgr.active_config().weights, custom_weights());
        assert_eq!(mgr.selection().profile_id(), Some("custom"));
        assert_eq!(mgr.loan_type(), LoanType::RealEstate);
    }

    #[test]
    fn test_save_assigns_id_and_activates() {
        let mut mgr = manager();
        let saved = mgr
            .save_profile(ProfileDraft::new("Cash Heavy", custom_weights()).description("test"))
            .unwrap();

        assert_eq!(saved.id, "cash-heavy");
        assert_eq!(saved.created_at, saved.updated_at);
        assert_eq!(saved.description.as_deref(), Some("test"));
        assert_eq!(mgr.selection().profile_id(), Some("cash-heavy"));

        let again = mgr
            .save_profile(ProfileDraft::new("Cash Heavy", custom_weights()))
            .unwrap();
        assert_eq!(again.id, "cash-heavy-2");
        assert_eq!(mgr.list_profiles().unwrap().len(), 2);
    }

    #[test]
    fn test_save_rejects_invalid_weights() {
        let mut mgr = manager();
        let draft = ProfileDraft::new("Broken", Weights::new().with(CategoryId::Legal, -10.0));

        let err = mgr.save_profile(draft).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidProfile(ref errors) if errors.len() == 1));
        assert!(mgr.list_profiles().unwrap().is_empty());
        assert!(mgr.active_profile().is_none());
    }

    #[test]
    fn test_load_unknown_keeps_current_selection() {
        let mut mgr = manager();
        mgr.save_profile(ProfileDraft::new("Custom", custom_weights()))
            .unwrap();
        let before = mgr.active_config();

        let err = mgr.load_profile("nope").unwrap_err();
        assert!(matches!(err, ScoringError::ProfileNotFound(ref id) if id == "nope"));
        assert_eq!(mgr.active_config(), before);
    }

    #[test]
    fn test_load_switches_weights_and_thresholds() {
        let mut thresholds = ThresholdCatalog::builtin();
        let mut stricter = thresholds.get("credit_score").cloned().unwrap();
        if let ThresholdRule::Range(ref mut rule) = stricter.rule {
            rule.good = Some(RangeBand::at_least(760.0));
        }
        thresholds.insert("credit_score", stricter);

        let mut mgr = manager();
        let saved = mgr
            .save_profile(ProfileDraft::new("Strict", custom_weights()).thresholds(thresholds.clone()))
            .unwrap();
        mgr.set_loan_type(LoanType::Equipment);
        mgr.reset_to_defaults().unwrap();
        assert!(mgr.active_profile().is_none());

        mgr.load_profile(&saved.id).unwrap();
        let config = mgr.active_config();
        assert_eq!(config.weights, custom_weights());
        assert_eq!(config.thresholds, thresholds);
    }

    #[test]
    fn test_reset_restores_default_profile() {
        let mut mgr = manager();
        let default = mgr
            .save_profile(ProfileDraft::new("House Policy", preset(LoanType::RealEstate)).as_default())
            .unwrap();
        let other = mgr
            .save_profile(ProfileDraft::new("Experimental", custom_weights()))
            .unwrap();

        mgr.load_profile(&other.id).unwrap();
        let selection = mgr.reset_to_defaults().unwrap();
        assert_eq!(selection.profile_id(), Some(default.id.as_str()));

        let config = mgr.active_config();
        assert_eq!(config.weights, default.weights);
        assert_eq!(config.thresholds, default.thresholds);
    }

    #[test]
    fn test_reset_without_default_uses_current_loan_type() {
        let mut mgr = manager();
        mgr.save_profile(ProfileDraft::new("Custom", custom_weights()))
            .unwrap();
        mgr.set_loan_type(LoanType::Equipment);

        let selection = mgr.reset_to_defaults().unwrap();
        assert_eq!(
            selection,
            &ActiveSelection::NoProfile {
                loan_type: LoanType::Equipment
            }
        );
        assert_eq!(mgr.active_config().weights, preset(LoanType::Equipment));
    }

    #[test]
    fn test_single_default_enforced_on_save() {
        let mut mgr = manager();
        mgr.save_profile(ProfileDraft::new("First", custom_weights()).as_default())
            .unwrap();
        mgr.save_profile(ProfileDraft::new("Second", custom_weights()).as_default())
            .unwrap();

        let defaults: Vec<_> = mgr
            .list_profiles()
            .unwrap()
            .into_iter()
            .filter(|p| p.is_default)
            .map(|p| p.id)
            .collect();
        assert_eq!(defaults, vec!["second".to_string()]);
    }

    #[test]
    fn test_update_restamps_and_enforces_single_default() {
        let mut mgr = manager();
        let first = mgr
            .save_profile(ProfileDraft::new("First", custom_weights()).as_default())
            .unwrap();
        let second = mgr
            .save_profile(ProfileDraft::new("Second", custom_weights()))
            .unwrap();

        let updated = mgr
            .update_profile(
                &second.id,
                ProfileDraft::new("Second", preset(LoanType::General)).as_default(),
            )
            .unwrap();
        assert_eq!(updated.id, second.id);
        assert_eq!(updated.created_at, second.created_at);
        assert!(updated.updated_at >= second.updated_at);

        let stored_first = mgr.store().get(&first.id).unwrap().unwrap();
        assert!(!stored_first.is_default);

        // the updated profile was active, so its new weights are live
        assert_eq!(mgr.active_config().weights, preset(LoanType::General));
    }

    #[test]
    fn test_update_unknown_profile() {
        let mut mgr = manager();
        let err = mgr
            .update_profile("ghost", ProfileDraft::new("Ghost", custom_weights()))
            .unwrap_err();
        assert!(matches!(err, ScoringError::ProfileNotFound(_)));
    }

    #[test]
    fn test_store_errors_surface() {
        struct Offline;
        impl ProfileStore for Offline {
            fn list(&self) -> std::result::Result<Vec<ScoringProfile>, StoreError> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn get(&self, _: &str) -> std::result::Result<Option<ScoringProfile>, StoreError> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn create(&self, _: ScoringProfile) -> std::result::Result<(), StoreError> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
            fn update(&self, _: ScoringProfile) -> std::result::Result<(), StoreError> {
                Err(StoreError::Unavailable("offline".to_string()))
            }
        }

        let mut mgr = ConfigurationManager::new(Offline, LoanType::General);
        assert!(matches!(
            mgr.load_profile("any"),
            Err(ScoringError::Store(StoreError::Unavailable(_)))
        ));
        assert!(mgr.active_profile().is_none());
    }

    /// Memory store whose writes of new or changed profiles can be refused.
    struct RefusingStore {
        inner: MemoryProfileStore,
        refuse_create: bool,
        refuse_update: bool,
    }

    impl ProfileStore for RefusingStore {
        fn list(&self) -> std::result::Result<Vec<ScoringProfile>, StoreError> {
            self.inner.list()
        }
        fn get(&self, id: &str) -> std::result::Result<Option<ScoringProfile>, StoreError> {
            self.inner.get(id)
        }
        fn create(&self, profile: ScoringProfile) -> std::result::Result<(), StoreError> {
            if self.refuse_create {
                return Err(StoreError::Conflict(profile.id));
            }
            self.inner.create(profile)
        }
        fn update(&self, profile: ScoringProfile) -> std::result::Result<(), StoreError> {
            if self.refuse_update {
                return Err(StoreError::Unavailable("read-only".to_string()));
            }
            self.inner.update(profile)
        }
    }

    fn house_default() -> ScoringProfile {
        ScoringProfile {
            id: "house".to_string(),
            name: "House".to_string(),
            description: None,
            weights: preset(LoanType::General),
            thresholds: ThresholdCatalog::builtin(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_default: true,
        }
    }

    #[test]
    fn test_failed_create_keeps_existing_default() {
        let store = RefusingStore {
            inner: MemoryProfileStore::with_profiles(vec![house_default()]),
            refuse_create: true,
            refuse_update: false,
        };
        let mut mgr = ConfigurationManager::new(store, LoanType::General);

        let err = mgr
            .save_profile(ProfileDraft::new("New", custom_weights()).as_default())
            .unwrap_err();
        assert!(matches!(err, ScoringError::Store(StoreError::Conflict(_))));
        assert!(mgr.store().get("house").unwrap().unwrap().is_default);
        assert!(mgr.active_profile().is_none());

        let selection = mgr.reset_to_defaults().unwrap();
        assert_eq!(selection.profile_id(), Some("house"));
    }

    #[test]
    fn test_failed_update_keeps_existing_default() {
        let mut other = house_default();
        other.id = "other".to_string();
        other.name = "Other".to_string();
        other.is_default = false;

        let store = RefusingStore {
            inner: MemoryProfileStore::with_profiles(vec![house_default(), other]),
            refuse_create: false,
            refuse_update: true,
        };
        let mut mgr = ConfigurationManager::new(store, LoanType::General);

        let err = mgr
            .update_profile("other", ProfileDraft::new("Other", custom_weights()).as_default())
            .unwrap_err();
        assert!(matches!(err, ScoringError::Store(StoreError::Unavailable(_))));
        assert!(mgr.store().get("house").unwrap().unwrap().is_default);
        assert!(!mgr.store().get("other").unwrap().unwrap().is_default);
    }

    #[test]
    fn test_scenario_d_profile_weights_summing_to_80() {
        let mut mgr = manager();
        mgr.save_profile(ProfileDraft::new("Two Pillars", custom_weights()))
            .unwrap();

        let borrower = BorrowerData {
            id: "b-9".to_string(),
            name: "Two Pillars Co".to_string(),
            loan_type: LoanType::General,
            loan_amount: None,
            categories: [
                (
                    CategoryId::Creditworthiness,
                    CategoryInput::default()
                        .with("credit_score", 720.0)
                        .with("payment_history", 0.0)
                        .with("credit_utilization", 20.0)
                        .with("bankruptcies", 0.0)
                        .with("personal_guarantee", "provided"),
                ),
                (
                    CategoryId::Cashflow,
                    CategoryInput::default()
                        .with("dscr", 1.1)
                        .with("operating_cash_flow_trend", "stable")
                        .with("days_receivable", 45.0)
                        .with("cash_reserve_months", 4.0),
                ),
            ]
            .into_iter()
            .collect(),
        };

        let report = calculate_scores(&borrower, &mgr.active_config());
        assert_eq!(report.category(CategoryId::Creditworthiness).unwrap().score, Some(100));
        assert_eq!(report.category(CategoryId::Cashflow).unwrap().score, Some(50));
        // (1.0 * 50 + 0.5 * 30) / 80 = 81.25 -> 81
        assert_eq!(report.overall, Some(81));
    }
}

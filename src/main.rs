use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use loan_score::borrower::BorrowerData;
use loan_score::profiles::{ConfigurationManager, JsonProfileStore, ProfileDraft, ProfileStore};
use loan_score::scoring::{
    calculate_scores, preset, ActiveSelection, LoanType, Recommendation, ScoreMap, ScoreReport,
    ThresholdCatalog, Weights,
};
use loan_score::session::{self, SessionState};
use loan_score::ScoringError;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_INPUT: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_PROFILE: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a borrower file (YAML or JSON)
    Score {
        /// Path to the borrower data file
        file: PathBuf,

        /// Print the score report as JSON
        #[arg(long, conflicts_with = "tsv")]
        json: bool,

        /// Print category scores as tab-separated values
        #[arg(long)]
        tsv: bool,

        /// Score as this loan type instead of the one in the file
        #[arg(long)]
        loan_type: Option<String>,
    },
    /// Select the loan type for this session (general, equipment, realestate)
    LoanType {
        loan_type: String,
    },
    /// Manage saved scoring profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Print the built-in weight presets
    Presets,
    /// Print the active threshold catalog as YAML
    Catalog,
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// List saved profiles
    List,
    /// Show the active weights and where they come from
    Show,
    /// Save a new profile and make it active
    Save {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Weights (and optional thresholds) file; defaults to the active configuration
        #[arg(long)]
        from: Option<PathBuf>,
        /// Mark as the default profile
        #[arg(long)]
        default: bool,
    },
    /// Load a saved profile by id
    Load { id: String },
    /// Update a saved profile in place
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        from: Option<PathBuf>,
        /// Mark as the default profile
        #[arg(long, conflicts_with = "no_default")]
        default: bool,
        /// Clear the default flag
        #[arg(long)]
        no_default: bool,
    },
    /// Return to the default profile, or the loan type preset if there is none
    Reset,
}

#[derive(Parser, Debug)]
#[command(name = "loan-score")]
#[command(about = "Weighted loan risk scoring CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/loan-score/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Weights and thresholds read from `--from` files.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileSource {
    weights: Weights,
    #[serde(default)]
    thresholds: Option<ThresholdCatalog>,
}

#[derive(Serialize)]
struct ScoreOutput<'a> {
    scores: ScoreMap,
    recommendation: Recommendation,
    report: &'a ScoreReport,
}

/// Read a YAML or JSON document, picking the parser by file extension.
fn read_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON in {}", path.display()))
    } else {
        serde_saphyr::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in {}", path.display()))
    }
}

fn parse_loan_type(value: &str) -> LoanType {
    match LoanType::from_str(value) {
        Ok(loan_type) => loan_type,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_INPUT);
        }
    }
}

fn profile_exit(e: ScoringError) -> ! {
    match e {
        ScoringError::InvalidProfile(errors) => {
            eprintln!("Invalid profile:");
            for error in errors {
                eprintln!("  - {}", error);
            }
        }
        other => eprintln!("Profile error: {}", other),
    }
    std::process::exit(EXIT_PROFILE);
}

/// `--default` sets the flag, `--no-default` clears it, neither keeps it.
fn resolve_default_flag(default: bool, no_default: bool, current: bool) -> bool {
    match (default, no_default) {
        (true, _) => true,
        (false, true) => false,
        (false, false) => current,
    }
}

fn read_profile_source(path: &Path) -> ProfileSource {
    match read_document(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(EXIT_INPUT);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match loan_score::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = loan_score::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let log_level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    if let Err(e) = loan_score::telemetry::init(log_level) {
        eprintln!("Config error: {}", e);
        std::process::exit(EXIT_CONFIG);
    }

    let preset_thresholds = match config.threshold_catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let store = JsonProfileStore::new(config.profiles_path());
    let mut manager = ConfigurationManager::new(store, config.default_loan_type)
        .with_preset_thresholds(preset_thresholds);

    let session_path = session::get_session_path();
    let state = match session::load_session(&session_path, config.default_loan_type) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable session file");
            SessionState::new(config.default_loan_type)
        }
    };
    if let Err(e) = state.restore(&mut manager) {
        eprintln!("Profile error: {:#}", e);
        std::process::exit(EXIT_PROFILE);
    }

    let use_colors = loan_score::output::should_use_colors();
    let mut session_changed = false;

    match cli.command {
        Commands::Score {
            file,
            json,
            tsv,
            loan_type,
        } => {
            let borrower: BorrowerData = match read_document(&file) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("{:#}", e);
                    std::process::exit(EXIT_INPUT);
                }
            };

            // The borrower's loan type picks the preset unless overridden; a loaded profile wins either way
            let loan_type = loan_type
                .as_deref()
                .map(parse_loan_type)
                .unwrap_or(borrower.loan_type);
            manager.set_loan_type(loan_type);

            let report = calculate_scores(&borrower, &manager.active_config());

            if json {
                let output = ScoreOutput {
                    scores: report.score_map(),
                    recommendation: report.recommendation(&config.recommendation),
                    report: &report,
                };
                match serde_json::to_string_pretty(&output) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Failed to serialize report: {}", e);
                        std::process::exit(EXIT_INPUT);
                    }
                }
            } else if tsv {
                println!("{}", loan_score::output::format_tsv(&report));
            } else {
                println!(
                    "{}",
                    loan_score::output::format_report(&report, &config.recommendation, use_colors)
                );
            }
        }
        Commands::LoanType { loan_type } => {
            let loan_type = parse_loan_type(&loan_type);
            manager.set_loan_type(loan_type);
            session_changed = true;

            match manager.selection() {
                ActiveSelection::NoProfile { .. } => {
                    println!("Loan type set to {}.", loan_type);
                }
                ActiveSelection::ProfileLoaded { profile } => {
                    println!(
                        "Loan type set to {}; weights still come from profile '{}'.",
                        loan_type, profile.name
                    );
                }
            }
        }
        Commands::Profile { action } => match action {
            ProfileAction::List => {
                let profiles = manager.list_profiles().unwrap_or_else(|e| profile_exit(e));
                println!(
                    "{}",
                    loan_score::output::format_profile_list(
                        &profiles,
                        manager.selection().profile_id(),
                        use_colors
                    )
                );
            }
            ProfileAction::Show => {
                let active = manager.active_config();
                println!(
                    "Active: {}",
                    loan_score::output::format_source(&active.source)
                );
                println!("{}", loan_score::output::format_weights(&active.weights));
            }
            ProfileAction::Save {
                name,
                description,
                from,
                default,
            } => {
                let draft = match from {
                    Some(path) => {
                        let source = read_profile_source(&path);
                        let draft = ProfileDraft::new(&name, source.weights);
                        match source.thresholds {
                            Some(thresholds) => draft.thresholds(thresholds),
                            None => draft,
                        }
                    }
                    None => {
                        let active = manager.active_config();
                        ProfileDraft::new(&name, active.weights).thresholds(active.thresholds)
                    }
                };
                let draft = ProfileDraft {
                    description,
                    is_default: default,
                    ..draft
                };

                let profile = manager.save_profile(draft).unwrap_or_else(|e| profile_exit(e));
                session_changed = true;
                println!("Saved profile '{}' as {}.", profile.name, profile.id);
            }
            ProfileAction::Load { id } => {
                let profile = manager.load_profile(&id).unwrap_or_else(|e| profile_exit(e));
                println!("Loaded profile '{}'.", profile.name);
                session_changed = true;
            }
            ProfileAction::Update {
                id,
                name,
                description,
                from,
                default,
                no_default,
            } => {
                let existing = match manager.store().get(&id) {
                    Ok(Some(profile)) => profile,
                    Ok(None) => profile_exit(ScoringError::ProfileNotFound(id.clone())),
                    Err(e) => profile_exit(e.into()),
                };

                let mut draft = ProfileDraft {
                    name: name.unwrap_or(existing.name),
                    description: description.or(existing.description),
                    weights: existing.weights,
                    thresholds: existing.thresholds,
                    is_default: resolve_default_flag(default, no_default, existing.is_default),
                };
                if let Some(path) = from {
                    let source = read_profile_source(&path);
                    draft.weights = source.weights;
                    if let Some(thresholds) = source.thresholds {
                        draft.thresholds = thresholds;
                    }
                }

                let profile = manager
                    .update_profile(&id, draft)
                    .unwrap_or_else(|e| profile_exit(e));
                session_changed = true;
                println!("Updated profile '{}'.", profile.name);
            }
            ProfileAction::Reset => {
                let selection = manager
                    .reset_to_defaults()
                    .unwrap_or_else(|e| profile_exit(e));
                match selection {
                    ActiveSelection::NoProfile { loan_type } => {
                        println!("No default profile; using the {} preset.", loan_type);
                    }
                    ActiveSelection::ProfileLoaded { profile } => {
                        println!("Loaded default profile '{}'.", profile.name);
                    }
                }
                session_changed = true;
            }
        },
        Commands::Presets => {
            for loan_type in LoanType::ALL {
                println!("{}:", loan_type);
                println!("{}", loan_score::output::format_weights(&preset(loan_type)));
            }
        }
        Commands::Catalog => {
            let active = manager.active_config();
            match serde_saphyr::to_string(&active.thresholds) {
                Ok(yaml) => print!("{}", yaml),
                Err(e) => {
                    eprintln!("Failed to serialize threshold catalog: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
    }

    if session_changed {
        if let Err(e) = session::save_session(&session_path, &SessionState::capture(&manager)) {
            eprintln!("Failed to save session: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_default_flag() {
        assert!(resolve_default_flag(true, false, false));
        assert!(!resolve_default_flag(false, true, true));
        assert!(resolve_default_flag(false, false, true));
        assert!(!resolve_default_flag(false, false, false));
    }

    #[test]
    fn test_update_accepts_no_default() {
        let cli = Cli::try_parse_from(["loan-score", "profile", "update", "house", "--no-default"])
            .unwrap();
        match cli.command {
            Commands::Profile {
                action:
                    ProfileAction::Update {
                        default,
                        no_default,
                        ..
                    },
            } => {
                assert!(!default);
                assert!(no_default);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_update_rejects_both_default_flags() {
        let parsed = Cli::try_parse_from([
            "loan-score",
            "profile",
            "update",
            "house",
            "--default",
            "--no-default",
        ]);
        assert!(parsed.is_err());
    }
}

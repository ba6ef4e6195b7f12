pub mod borrower;
pub mod config;
pub mod error;
pub mod output;
pub mod profiles;
pub mod scoring;
pub mod session;
pub mod telemetry;

pub use error::{Result, ScoringError};

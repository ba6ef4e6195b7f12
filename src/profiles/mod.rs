pub mod manager;
pub mod store;
pub mod types;

pub use manager::ConfigurationManager;
pub use store::{JsonProfileStore, MemoryProfileStore, ProfileStore, StoreError};
pub use types::{slugify, ProfileDraft, ScoringProfile};

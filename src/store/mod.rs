//! Persistence layer
//!
//! - [`traits`]: collaborator traits the scanner depends on
//! - [`sqlite`]: SQLite implementation of all of them

pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStore;
pub use traits::{ComponentSource, RuleStore, ViolationFilter, ViolationStore};

//! Version comparison used by rule evaluation
//!
//! - [`operator`]: comparison operators (`=`, `>`, `>=`, `<`, `<=`, `~`, `^`)
//! - [`comparator`]: dotted-numeric version parsing and compliance checks

pub mod comparator;
pub mod operator;

pub use comparator::{compare_versions, is_valid_version, is_version_compliant};
pub use operator::VersionOperator;

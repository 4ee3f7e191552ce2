//! Domain types
//! - component.rs: component snapshots (language, runtime, dependencies)
//! - rule.rs: evergreen rules and their targets
//! - violation.rs: violation records, statuses and actors

pub mod component;
pub mod rule;
pub mod violation;

pub use component::{
    ComponentRef, ComponentSnapshot, Dependency, ProgramLanguage, RuntimeInfo, RuntimeType,
};
pub use rule::{
    Compliance, DependencyTarget, Rule, RuleStatus, RuleTarget, RuntimeTarget, Severity,
};
pub use violation::{Actor, DependencyViolation, Violation, ViolationStatus};
